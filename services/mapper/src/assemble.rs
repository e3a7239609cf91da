//! Template assembly: merge every canonical series into the output matrix.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::align::{CanonicalSeries, CellValue};
use crate::dictionary::DATE_LABEL;
use crate::error::Shape;
use crate::period::{MonthWindow, Period};
use crate::template::ColumnTemplate;

/// One data row: the period and one cell per template column.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRow {
    pub period: Period,
    pub cells: Vec<CellValue>,
}

/// Final table. Row 1 codes, row 2 descriptions, then one row per month.
/// Column 1 is the date; the rest follow the template.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMatrix {
    pub codes: Vec<String>,
    pub descriptions: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

impl OutputMatrix {
    /// Shape including both header rows and the Date column.
    pub fn shape(&self) -> Shape {
        Shape {
            rows: 2 + self.rows.len(),
            cols: self.codes.len(),
        }
    }

    /// Zero-based index of a data column by code (Date column included at 0).
    pub fn column_of(&self, code: &str) -> Option<usize> {
        self.codes.iter().position(|c| c == code)
    }

    /// All cells of one data column, oldest month first.
    pub fn column(&self, code: &str) -> Option<Vec<CellValue>> {
        let idx = self.column_of(code)?.checked_sub(1)?;
        Some(self.rows.iter().map(|r| r.cells[idx]).collect())
    }

    /// Serialized rows, sentinel applied.
    pub fn render_rows(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(self.rows.len() + 2);
        out.push(self.codes.clone());
        out.push(self.descriptions.clone());
        for row in &self.rows {
            let mut line = Vec::with_capacity(row.cells.len() + 1);
            line.push(row.period.to_string());
            line.extend(row.cells.iter().map(CellValue::render));
            out.push(line);
        }
        out
    }
}

/// Index of series by code. Insertion is order-independent: on a code clash
/// the series from the lexicographically smaller source wins.
#[derive(Debug, Default)]
pub struct SeriesIndex {
    by_code: BTreeMap<String, CanonicalSeries>,
}

impl SeriesIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: CanonicalSeries) {
        match self.by_code.get(&series.id.code) {
            Some(existing) if (&existing.source, existing.column) <= (&series.source, series.column) => {
                warn!(
                    code = %series.id.code,
                    kept = %existing.source,
                    dropped = %series.source,
                    "series code claimed twice"
                );
            }
            Some(existing) => {
                warn!(
                    code = %series.id.code,
                    kept = %series.source,
                    dropped = %existing.source,
                    "series code claimed twice"
                );
                self.by_code.insert(series.id.code.clone(), series);
            }
            None => {
                self.by_code.insert(series.id.code.clone(), series);
            }
        }
    }

    pub fn get(&self, code: &str) -> Option<&CanonicalSeries> {
        self.by_code.get(code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn latest_period(&self) -> Option<Period> {
        self.by_code.values().filter_map(CanonicalSeries::latest_period).max()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.by_code.keys().map(String::as_str)
    }
}

impl Extend<CanonicalSeries> for SeriesIndex {
    fn extend<T: IntoIterator<Item = CanonicalSeries>>(&mut self, iter: T) {
        for series in iter {
            self.insert(series);
        }
    }
}

/// Walk the template in order and build the matrix over `window`.
pub fn assemble(template: &ColumnTemplate, index: &SeriesIndex, window: &MonthWindow) -> OutputMatrix {
    let mut codes = Vec::with_capacity(template.len() + 1);
    let mut descriptions = Vec::with_capacity(template.len() + 1);
    codes.push(DATE_LABEL.to_string());
    descriptions.push(DATE_LABEL.to_string());

    let mut columns: Vec<Vec<CellValue>> = Vec::with_capacity(template.len());
    let mut filled = 0usize;
    for entry in template.entries() {
        codes.push(entry.code.clone());
        descriptions.push(entry.description.clone());
        match index.get(&entry.code) {
            Some(series) => {
                filled += 1;
                columns.push(series.align(window));
            }
            None => {
                debug!(code = %entry.code, "no series for template code, filled with N.A.");
                columns.push(vec![CellValue::NotApplicable; window.len()]);
            }
        }
    }

    let extra: Vec<&str> = index
        .codes()
        .filter(|c| !template.codes().any(|t| t == *c))
        .collect();
    if !extra.is_empty() {
        debug!(count = extra.len(), codes = ?extra, "series not in template dropped");
    }

    let rows = window
        .periods()
        .enumerate()
        .map(|(i, period)| MatrixRow {
            period,
            cells: columns.iter().map(|col| col[i]).collect(),
        })
        .collect();

    debug!(filled, missing = template.len() - filled, "matrix assembled");

    OutputMatrix {
        codes,
        descriptions,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::SeriesId;
    use crate::template::TemplateEntry;

    fn p(y: i32, m: u32) -> Period {
        Period::new(y, m).unwrap()
    }

    fn series(code: &str, source: &str, values: &[(Period, f64)]) -> CanonicalSeries {
        CanonicalSeries {
            id: SeriesId {
                code: code.into(),
                description: code.into(),
            },
            source: source.into(),
            column: 1,
            values: values.iter().map(|(p, v)| (*p, CellValue::Present(*v))).collect(),
        }
    }

    fn template(codes: &[&str]) -> ColumnTemplate {
        ColumnTemplate::new(
            codes
                .iter()
                .map(|c| TemplateEntry {
                    code: c.to_string(),
                    description: format!("desc {c}"),
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_columns_follow_template_order() {
        let mut index = SeriesIndex::new();
        index.insert(series("B", "b.xls", &[(p(2024, 2), 2.0)]));
        index.insert(series("A", "a.xls", &[(p(2024, 1), 1.0)]));

        let window = MonthWindow::ending_at(p(2024, 2), 2);
        let matrix = assemble(&template(&["B", "A"]), &index, &window);

        assert_eq!(matrix.codes, vec!["Date", "B", "A"]);
        assert_eq!(matrix.descriptions, vec!["Date", "desc B", "desc A"]);
        assert_eq!(matrix.shape(), Shape { rows: 4, cols: 3 });
        assert_eq!(
            matrix.rows[0].cells,
            vec![CellValue::Absent, CellValue::Present(1.0)]
        );
        assert_eq!(
            matrix.rows[1].cells,
            vec![CellValue::Present(2.0), CellValue::Absent]
        );
    }

    #[test]
    fn test_missing_code_is_not_applicable() {
        let index = SeriesIndex::new();
        let window = MonthWindow::ending_at(p(2024, 2), 2);
        let matrix = assemble(&template(&["A"]), &index, &window);
        assert_eq!(
            matrix.column("A").unwrap(),
            vec![CellValue::NotApplicable, CellValue::NotApplicable]
        );
    }

    #[test]
    fn test_extra_series_are_dropped() {
        let mut index = SeriesIndex::new();
        index.insert(series("A", "a", &[(p(2024, 1), 1.0)]));
        index.insert(series("Z", "a", &[(p(2024, 1), 9.0)]));
        let window = MonthWindow::ending_at(p(2024, 1), 1);
        let matrix = assemble(&template(&["A"]), &index, &window);
        assert_eq!(matrix.codes.len(), 2);
        assert_eq!(matrix.column_of("Z"), None);
    }

    #[test]
    fn test_code_clash_is_order_independent() {
        let first = series("A", "a.xls", &[(p(2024, 1), 1.0)]);
        let second = series("A", "b.xls", &[(p(2024, 1), 2.0)]);

        let mut forward = SeriesIndex::new();
        forward.extend([first.clone(), second.clone()]);
        let mut backward = SeriesIndex::new();
        backward.extend([second, first]);

        assert_eq!(forward.get("A").unwrap().source, "a.xls");
        assert_eq!(backward.get("A").unwrap().source, "a.xls");
    }

    #[test]
    fn test_render_rows_uses_sentinel() {
        let mut index = SeriesIndex::new();
        index.insert(series("A", "a", &[(p(2024, 1), 1.5)]));
        let window = MonthWindow::ending_at(p(2024, 2), 2);
        let rendered = assemble(&template(&["A", "B"]), &index, &window).render_rows();
        assert_eq!(rendered[2], vec!["2024-01", "1.5", "N.A."]);
        assert_eq!(rendered[3], vec!["2024-02", "N.A.", "N.A."]);
    }
}
