//! Fixed-width factor array export and its matching importer.
//!
//! One line per statement: a 4-column right-justified statement number,
//! then one (8-column signed 3-decimal z-score, 4-column rank) pair per
//! factor. Three decimals bound the round-trip error at 0.0005, inside
//! the 0.001 fidelity target.

use crate::domain::foundation::DomainError;
use crate::domain::scoring::FactorArray;

const ID_WIDTH: usize = 4;
const Z_WIDTH: usize = 8;
const RANK_WIDTH: usize = 4;
const PAIR_WIDTH: usize = Z_WIDTH + RANK_WIDTH;

/// Renders factor arrays in the fixed-width layout.
pub fn export_factor_arrays(arrays: &[FactorArray]) -> String {
    let statement_count = arrays.first().map_or(0, FactorArray::statement_count);
    let mut out = String::new();

    for s in 0..statement_count {
        out.push_str(&format!("{:>width$}", s + 1, width = ID_WIDTH));
        for array in arrays {
            let statement = crate::domain::foundation::StatementId::new(s);
            out.push_str(&format!(
                "{:>z_width$.3}",
                array.z_score(statement),
                z_width = Z_WIDTH
            ));
            out.push_str(&format!(
                "{:>rank_width$}",
                array.rank(statement),
                rank_width = RANK_WIDTH
            ));
        }
        out.push('\n');
    }
    out
}

/// Parses the layout written by [`export_factor_arrays`].
///
/// # Errors
///
/// - `ImportFormat` for malformed lines, out-of-order statement numbers,
///   or ragged factor counts, naming the one-based line and field
pub fn import_factor_arrays(input: &str) -> Result<Vec<FactorArray>, DomainError> {
    let mut z_columns: Vec<Vec<f64>> = Vec::new();
    let mut rank_columns: Vec<Vec<i32>> = Vec::new();
    let mut expected_statement = 1usize;

    for (index, raw_line) in input.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim_end_matches(['\r']);
        if line.trim().is_empty() {
            continue;
        }
        if line.len() < ID_WIDTH + PAIR_WIDTH || (line.len() - ID_WIDTH) % PAIR_WIDTH != 0 {
            return Err(DomainError::import_format(
                line_number,
                "line",
                format!(
                    "expected {} id columns plus {}-column factor pairs, found {} characters",
                    ID_WIDTH,
                    PAIR_WIDTH,
                    line.len()
                ),
            ));
        }

        let factor_count = (line.len() - ID_WIDTH) / PAIR_WIDTH;
        if z_columns.is_empty() {
            z_columns = vec![Vec::new(); factor_count];
            rank_columns = vec![Vec::new(); factor_count];
        } else if factor_count != z_columns.len() {
            return Err(DomainError::import_format(
                line_number,
                "line",
                format!(
                    "line has {} factors, previous lines had {}",
                    factor_count,
                    z_columns.len()
                ),
            ));
        }

        let id: usize = line[..ID_WIDTH].trim().parse().map_err(|_| {
            DomainError::import_format(
                line_number,
                "statement",
                format!("'{}' is not a statement number", line[..ID_WIDTH].trim()),
            )
        })?;
        if id != expected_statement {
            return Err(DomainError::import_format(
                line_number,
                "statement",
                format!("expected statement {}, found {}", expected_statement, id),
            ));
        }
        expected_statement += 1;

        for f in 0..factor_count {
            let start = ID_WIDTH + f * PAIR_WIDTH;
            let z_field = &line[start..start + Z_WIDTH];
            let rank_field = &line[start + Z_WIDTH..start + PAIR_WIDTH];

            let z: f64 = z_field.trim().parse().map_err(|_| {
                DomainError::import_format(
                    line_number,
                    format!("z {}", f + 1),
                    format!("'{}' is not a z-score", z_field.trim()),
                )
            })?;
            let rank: i32 = rank_field.trim().parse().map_err(|_| {
                DomainError::import_format(
                    line_number,
                    format!("rank {}", f + 1),
                    format!("'{}' is not an integer rank", rank_field.trim()),
                )
            })?;

            z_columns[f].push(z);
            rank_columns[f].push(rank);
        }
    }

    Ok(z_columns
        .into_iter()
        .zip(rank_columns)
        .enumerate()
        .map(|(f, (z, ranks))| FactorArray::from_scores(f, z, ranks))
        .collect())
}
