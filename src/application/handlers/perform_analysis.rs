//! PerformAnalysisHandler - one-shot batch analysis.
//!
//! Runs the full pipeline synchronously: correlation, extraction,
//! optional factor-count guidance, rotation, derived outputs, and an
//! optional bootstrap. No session state is involved.

use std::sync::atomic::AtomicBool;

use crate::domain::bootstrap::{run_bootstrap, BootstrapOptions, BootstrapResult};
use crate::domain::extraction::{advise_factor_count, extract, FactorCountGuidance, FactorSolution};
use crate::domain::foundation::DomainError;
use crate::domain::qsort::{CorrelationMatrix, QSortMatrix};
use crate::domain::rotation::{rotate, unrotated, RotatedSolution, RotationMethod};
use crate::domain::scoring::{generate_outputs, StatisticalOutputs};
use crate::domain::session::SessionSettings;

/// Request for parallel-analysis guidance alongside the result.
#[derive(Debug, Clone, Copy)]
pub struct GuidanceRequest {
    pub permutations: usize,
    pub seed: Option<u64>,
}

/// Command for a one-shot analysis.
#[derive(Debug, Clone)]
pub struct PerformAnalysisCommand {
    pub matrix: QSortMatrix,
    pub settings: SessionSettings,
    /// Automatic rotation to apply; `None` leaves loadings unrotated.
    pub rotation: Option<RotationMethod>,
    pub guidance: Option<GuidanceRequest>,
    pub bootstrap: Option<BootstrapOptions>,
}

/// Everything the batch pipeline produces.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub correlation: CorrelationMatrix,
    pub solution: FactorSolution,
    pub guidance: Option<FactorCountGuidance>,
    pub rotated: RotatedSolution,
    pub outputs: StatisticalOutputs,
    pub bootstrap: Option<BootstrapResult>,
}

/// Handler for one-shot analyses. Stateless; pure domain composition.
pub struct PerformAnalysisHandler;

impl PerformAnalysisHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, cmd: PerformAnalysisCommand) -> Result<AnalysisResult, DomainError> {
        let correlation = CorrelationMatrix::from_qsorts(&cmd.matrix)?;
        let solution = extract(
            &correlation,
            cmd.settings.extraction_method,
            &cmd.settings.extraction_options,
        )?;

        let guidance = match cmd.guidance {
            Some(request) => Some(advise_factor_count(
                &cmd.matrix,
                &correlation,
                request.permutations,
                request.seed,
            )?),
            None => None,
        };

        let rotated = match cmd.rotation {
            Some(method) => rotate(&solution, method, &cmd.settings.rotation_options)?,
            None => unrotated(&solution),
        };
        let outputs = generate_outputs(&cmd.matrix, &rotated, cmd.settings.thresholds)?;

        let bootstrap = match cmd.bootstrap {
            Some(options) => Some(run_bootstrap(
                &cmd.matrix,
                &rotated,
                cmd.settings.extraction_method,
                &cmd.settings.extraction_options,
                cmd.rotation,
                &cmd.settings.rotation_options,
                &options,
                &AtomicBool::new(false),
            )?),
            None => None,
        };

        Ok(AnalysisResult {
            correlation,
            solution,
            guidance,
            rotated,
            outputs,
            bootstrap,
        })
    }
}

impl Default for PerformAnalysisHandler {
    fn default() -> Self {
        Self::new()
    }
}
