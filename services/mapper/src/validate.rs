//! Final structural check before anything is serialized.

use tracing::error;

use crate::assemble::OutputMatrix;
use crate::dictionary::{DATE_LABEL, TEMPLATE_ENTRIES, WINDOW_MONTHS};
use crate::error::{MapError, Result, Shape};
use crate::template::ColumnTemplate;

/// Shape every standard run must produce: 2 header rows + 60 months, Date + 143 series.
pub const STANDARD_SHAPE: Shape = Shape {
    rows: 2 + WINDOW_MONTHS,
    cols: 1 + TEMPLATE_ENTRIES,
};

/// Check `matrix` against `expected` and the template's header rows.
///
/// The first diverging column is 1-based and counts the Date column.
pub fn validate(matrix: &OutputMatrix, template: &ColumnTemplate, expected: Shape) -> Result<()> {
    let actual = matrix.shape();

    let expected_codes: Vec<&str> = std::iter::once(DATE_LABEL).chain(template.codes()).collect();
    let expected_descriptions: Vec<&str> = std::iter::once(DATE_LABEL)
        .chain(template.entries().iter().map(|e| e.description.as_str()))
        .collect();

    let header_divergence = first_divergence(&matrix.codes, &expected_codes)
        .into_iter()
        .chain(first_divergence(&matrix.descriptions, &expected_descriptions))
        .min();
    let ragged_row = matrix
        .rows
        .iter()
        .map(|r| r.cells.len() + 1)
        .find(|&len| len != actual.cols);

    let consistent = actual == expected
        && expected_codes.len() == expected.cols
        && header_divergence.is_none()
        && ragged_row.is_none();
    if consistent {
        return Ok(());
    }

    let first_diverging_column = header_divergence.or_else(|| {
        (actual.cols != expected.cols).then(|| actual.cols.min(expected.cols) + 1)
    });
    error!(
        expected = %expected,
        actual = %actual,
        template_columns = expected_codes.len(),
        ?first_diverging_column,
        ?ragged_row,
        "output matrix does not match template"
    );
    Err(MapError::TemplateMismatch {
        expected,
        actual,
        first_diverging_column,
    })
}

/// 1-based position of the first differing label, or one past the shorter list.
fn first_divergence(actual: &[String], expected: &[&str]) -> Option<usize> {
    let mismatch = actual
        .iter()
        .zip(expected)
        .position(|(a, e)| a != e)
        .map(|i| i + 1);
    mismatch.or_else(|| (actual.len() != expected.len()).then(|| actual.len().min(expected.len()) + 1))
}
