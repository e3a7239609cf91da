//! Row alignment: per-dataset records keyed by period, projected onto the
//! output window.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dictionary::SENTINEL;
use crate::grid::{Cell, Grid};
use crate::header::ResolvedHeader;
use crate::period::{MonthWindow, Period};
use crate::synth::SeriesId;

/// State of one data cell in the output matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    Present(f64),
    /// Series exists, but this period was not supplied or not numeric.
    Absent,
    /// No dataset produced this series at all.
    NotApplicable,
}

impl CellValue {
    pub fn is_present(&self) -> bool {
        matches!(self, CellValue::Present(_))
    }

    /// Serialized form; both missing states collapse to the sentinel.
    pub fn render(&self) -> String {
        match self {
            CellValue::Present(v) => format_number(*v),
            CellValue::Absent | CellValue::NotApplicable => SENTINEL.to_string(),
        }
    }
}

/// Shortest round-trippable text; integral values lose the trailing `.0`.
fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Parse a raw value cell: numbers pass through, text tolerates thousands separators.
pub fn parse_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(v) if v.is_finite() => Some(*v),
        Cell::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            if cleaned.is_empty() || cleaned == "-" {
                return None;
            }
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// A series keyed by period, before it is cut to the window.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSeries {
    pub id: SeriesId,
    /// Identity of the dataset the series came from.
    pub source: String,
    pub column: usize,
    pub values: BTreeMap<Period, CellValue>,
}

/// Collect `(period -> value)` for one column. Rows without a period are skipped.
/// Duplicate periods keep the first occurrence.
pub fn collect_series(
    grid: &Grid,
    header: &ResolvedHeader,
    column: usize,
    id: SeriesId,
    source: &str,
) -> CanonicalSeries {
    let mut values = BTreeMap::new();
    let mut duplicates = 0usize;

    for row in grid.rows.iter().skip(header.data_start) {
        let Some(period) = row.get(header.date_column).and_then(Period::from_cell) else {
            continue;
        };
        let value = row
            .get(column)
            .and_then(parse_value)
            .map_or(CellValue::Absent, CellValue::Present);
        if values.contains_key(&period) {
            duplicates += 1;
            continue;
        }
        values.insert(period, value);
    }

    if duplicates > 0 {
        warn!(dataset = source, code = %id.code, duplicates, "duplicate periods ignored");
    }

    CanonicalSeries {
        id,
        source: source.to_string(),
        column,
        values,
    }
}

impl CanonicalSeries {
    pub fn latest_period(&self) -> Option<Period> {
        self.values.keys().next_back().copied()
    }

    /// Project onto `window`: one cell per window month, oldest first.
    pub fn align(&self, window: &MonthWindow) -> Vec<CellValue> {
        let mut cells = vec![CellValue::Absent; window.len()];
        let mut outside = 0usize;
        for (period, value) in &self.values {
            match window.index_of(*period) {
                Some(i) => cells[i] = *value,
                None => outside += 1,
            }
        }
        if outside > 0 {
            debug!(code = %self.id.code, outside, "periods outside window dropped");
        }
        cells
    }
}
