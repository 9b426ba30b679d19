//! Fixed-width import of raw Q sorts.
//!
//! One line per participant: an 8-column label followed by one 3-column
//! right-justified rank per statement. Errors name the line and field
//! that failed so operators can fix the file, not guess.

use crate::domain::foundation::DomainError;
use crate::domain::qsort::{DistributionGrid, QSortMatrix};

const LABEL_WIDTH: usize = 8;
const RANK_WIDTH: usize = 3;

/// A parsed sort file: participant labels in file order plus the
/// validated matrix.
#[derive(Debug, Clone)]
pub struct SortImport {
    labels: Vec<String>,
    matrix: QSortMatrix,
}

impl SortImport {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn matrix(&self) -> &QSortMatrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> QSortMatrix {
        self.matrix
    }
}

/// Parses fixed-width sort lines against a known grid.
///
/// # Errors
///
/// - `ImportFormat` for short lines or unparseable rank fields, naming
///   the one-based line and field
/// - `DistributionMismatch` when a parsed sort violates the grid
pub fn import_sorts(input: &str, grid: DistributionGrid) -> Result<SortImport, DomainError> {
    let statement_count = grid.statement_count();
    let expected_len = LABEL_WIDTH + RANK_WIDTH * statement_count;

    let mut labels = Vec::new();
    let mut rows = Vec::new();

    for (index, raw_line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim_end_matches(['\r']);
        if line.trim().is_empty() {
            continue;
        }
        if line.len() < expected_len {
            return Err(DomainError::import_format(
                line_number,
                "line",
                format!(
                    "expected at least {} characters for {} statements, found {}",
                    expected_len,
                    statement_count,
                    line.len()
                ),
            ));
        }
        if !line.is_char_boundary(LABEL_WIDTH) {
            return Err(DomainError::import_format(
                line_number,
                "label",
                "label field is not 8 single-byte characters",
            ));
        }

        let label = line[..LABEL_WIDTH].trim().to_string();
        if label.is_empty() {
            return Err(DomainError::import_format(
                line_number,
                "label",
                "participant label is blank",
            ));
        }

        let mut ranks = Vec::with_capacity(statement_count);
        for s in 0..statement_count {
            let start = LABEL_WIDTH + s * RANK_WIDTH;
            let field = line.get(start..start + RANK_WIDTH).ok_or_else(|| {
                DomainError::import_format(
                    line_number,
                    format!("rank {}", s + 1),
                    "field extends past end of line",
                )
            })?;
            let rank: i32 = field.trim().parse().map_err(|_| {
                DomainError::import_format(
                    line_number,
                    format!("rank {}", s + 1),
                    format!("'{}' is not an integer rank", field.trim()),
                )
            })?;
            ranks.push(rank);
        }

        labels.push(label);
        rows.push(ranks);
    }

    let matrix = QSortMatrix::new(grid, rows)?;
    Ok(SortImport { labels, matrix })
}

/// Renders a matrix back into the fixed-width sort layout.
pub fn export_sorts(labels: &[String], matrix: &QSortMatrix) -> String {
    let mut out = String::new();
    for p in 0..matrix.participant_count() {
        let label = labels
            .get(p)
            .map(String::as_str)
            .unwrap_or("");
        out.push_str(&format!("{:<width$}", label, width = LABEL_WIDTH));
        for s in 0..matrix.statement_count() {
            out.push_str(&format!("{:>width$}", matrix.rank(p, s), width = RANK_WIDTH));
        }
        out.push('\n');
    }
    out
}
