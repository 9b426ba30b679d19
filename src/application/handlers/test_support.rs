//! Shared fixtures for handler tests.

use crate::domain::extraction::{ExtractionMethod, ExtractionOptions};
use crate::domain::qsort::{DistributionGrid, GridColumn, QSortMatrix};
use crate::domain::rotation::{RotationMode, RotationOptions};
use crate::domain::scoring::SignificanceThresholds;
use crate::domain::session::SessionSettings;

/// Six sorters, two opposing viewpoints, nine statements.
pub(crate) fn test_matrix() -> QSortMatrix {
    let grid = DistributionGrid::new(vec![
        GridColumn::new(-2, 1),
        GridColumn::new(-1, 2),
        GridColumn::new(0, 3),
        GridColumn::new(1, 2),
        GridColumn::new(2, 1),
    ])
    .unwrap();
    QSortMatrix::new(
        grid,
        vec![
            vec![-2, -1, -1, 0, 0, 0, 1, 1, 2],
            vec![-2, -1, -1, 0, 0, 1, 0, 1, 2],
            vec![-1, -2, -1, 0, 0, 0, 1, 2, 1],
            vec![2, 1, 1, 0, 0, 0, -1, -1, -2],
            vec![1, 2, 1, 0, 0, -1, 0, -2, -1],
            vec![2, 1, 0, 1, 0, -1, 0, -1, -2],
        ],
    )
    .unwrap()
}

pub(crate) fn test_settings() -> SessionSettings {
    SessionSettings {
        extraction_method: ExtractionMethod::PrincipalComponents,
        extraction_options: ExtractionOptions {
            factor_count: 2,
            centroid_max_iterations: 100,
            residual_variance_floor: 1e-9,
        },
        rotation_options: RotationOptions {
            tolerance: 1e-5,
            max_iterations: 50,
            promax_kappa: 4.0,
            oblimin_gamma: 0.0,
        },
        rotation_mode: RotationMode::Orthogonal,
        manual_tolerance: 1e-6,
        thresholds: SignificanceThresholds::default(),
    }
}
