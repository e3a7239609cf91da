//! Header resolution: find the Korean label row, its optional metric
//! sub-header, and the period column, below a preamble of unknown length.

use tracing::debug;

use crate::dictionary::{lookup_field, lookup_metric, DATE_HEADER_LABELS};
use crate::error::{MapError, Result};
use crate::grid::{normalize_label, Cell, Grid};
use crate::period::Period;

/// Data rows sampled when scoring candidate date columns.
const DATE_SAMPLE_ROWS: usize = 24;

/// One non-date column under the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLabel {
    pub column: usize,
    /// Normalised field label (forward-filled across merged spans).
    pub field: String,
    /// Normalised metric label from the sub-header row, when there is one.
    pub metric: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHeader {
    pub header_row: usize,
    pub labels: Vec<HeaderLabel>,
    pub date_column: usize,
    /// First row holding data.
    pub data_start: usize,
}

fn cell_label(cell: Option<&Cell>) -> Option<String> {
    cell.and_then(Cell::as_text)
        .map(normalize_label)
        .filter(|s| !s.is_empty())
}

/// A label names a field either directly (`주식`) or with an embedded metric (`주식(비중)`).
pub fn is_field_label(label: &str) -> bool {
    lookup_field(label).is_some() || crate::synth::split_embedded_metric(label).is_some()
}

fn is_header_row(row: &[Cell]) -> bool {
    row.iter()
        .filter_map(|c| cell_label(Some(c)))
        .any(|l| is_field_label(&l))
}

fn is_metric_row(row: &[Cell]) -> bool {
    let labels: Vec<String> = row.iter().filter_map(|c| cell_label(Some(c))).collect();
    labels.iter().any(|l| lookup_metric(l).is_some()) && !labels.iter().any(|l| is_field_label(l))
}

/// Locate the header inside the first `scan_rows` rows of `grid`.
pub fn resolve_header(grid: &Grid, dataset: &str, scan_rows: usize) -> Result<ResolvedHeader> {
    let header_row = grid
        .rows
        .iter()
        .take(scan_rows)
        .position(|r| is_header_row(r))
        .ok_or_else(|| MapError::HeaderNotFound {
            dataset: dataset.to_string(),
            scanned: scan_rows.min(grid.len()),
        })?;

    let sub_header = grid
        .rows
        .get(header_row + 1)
        .filter(|r| is_metric_row(r))
        .map(|_| header_row + 1);
    let data_start = sub_header.map_or(header_row + 1, |r| r + 1);

    let width = grid.width();
    let date_column = detect_date_column(grid, header_row, data_start, width).ok_or_else(|| {
        MapError::DateColumnNotFound {
            dataset: dataset.to_string(),
            header_row,
        }
    })?;

    let mut labels = Vec::new();
    let mut carried: Option<String> = None;
    for column in 0..width {
        let top = cell_label(grid.get(header_row, column));
        let metric = sub_header.and_then(|r| cell_label(grid.get(r, column)));

        // Merged cells only keep their text in the first column of the span.
        let field = match (top, &metric) {
            (Some(label), _) => {
                carried = Some(label.clone());
                Some(label)
            }
            (None, Some(_)) => carried.clone(),
            (None, None) => {
                carried = None;
                None
            }
        };

        if column == date_column {
            continue;
        }
        if let Some(field) = field {
            labels.push(HeaderLabel {
                column,
                field,
                metric,
            });
        }
    }

    debug!(
        dataset,
        header_row,
        date_column,
        columns = labels.len(),
        sub_header = sub_header.is_some(),
        "header resolved"
    );

    Ok(ResolvedHeader {
        header_row,
        labels,
        date_column,
        data_start,
    })
}

/// Pick the column whose data cells most often read as periods; ties go to a
/// `기준일` header, then to the leftmost column.
fn detect_date_column(grid: &Grid, header_row: usize, data_start: usize, width: usize) -> Option<usize> {
    let sample = grid.rows.iter().skip(data_start).take(DATE_SAMPLE_ROWS);
    let mut hits = vec![0usize; width];
    for row in sample {
        for (column, cell) in row.iter().enumerate() {
            if Period::from_cell(cell).is_some() {
                hits[column] += 1;
            }
        }
    }

    let labelled = |column: usize| {
        cell_label(grid.get(header_row, column))
            .map(|l| DATE_HEADER_LABELS.contains(&l.as_str()))
            .unwrap_or(false)
    };

    (0..width)
        .filter(|&c| hits[c] > 0)
        .max_by(|&a, &b| {
            hits[a]
                .cmp(&hits[b])
                .then(labelled(a).cmp(&labelled(b)))
                .then(b.cmp(&a))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kofia_grid() -> Grid {
        Grid::from_text_rows(vec![
            vec!["투자자산별현황", "", "", "", "", ""],
            vec!["(단위: 백만원, %)", "", "", "", "", ""],
            vec!["기준일자", "자산총액", "주식", "", "채권", ""],
            vec!["", "", "금액", "비중", "금액", "비중"],
            vec!["2024-01", "1,000", "600", "60.0", "300", "30.0"],
            vec!["2024-02", "1,100", "650", "59.1", "320", "29.1"],
        ])
    }

    #[test]
    fn test_resolves_two_level_header_after_preamble() {
        let header = resolve_header(&kofia_grid(), "Equity", 20).unwrap();
        assert_eq!(header.header_row, 2);
        assert_eq!(header.data_start, 4);
        assert_eq!(header.date_column, 0);

        let pairs: Vec<(usize, &str, Option<&str>)> = header
            .labels
            .iter()
            .map(|l| (l.column, l.field.as_str(), l.metric.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (1, "자산총액", None),
                (2, "주식", Some("금액")),
                (3, "주식", Some("비중")),
                (4, "채권", Some("금액")),
                (5, "채권", Some("비중")),
            ]
        );
    }

    #[test]
    fn test_single_row_header_with_embedded_metrics() {
        let grid = Grid::from_text_rows(vec![
            vec!["주식 금액", "기준일", "주식 비중"],
            vec!["10", "2023/12", "5.5"],
        ]);
        let header = resolve_header(&grid, "x", 20).unwrap();
        assert_eq!(header.header_row, 0);
        assert_eq!(header.data_start, 1);
        assert_eq!(header.date_column, 1);
        assert_eq!(header.labels.len(), 2);
        assert_eq!(header.labels[0].field, "주식금액");
        assert_eq!(header.labels[0].metric, None);
    }

    #[test]
    fn test_date_column_found_by_content_not_label() {
        let grid = Grid::from_text_rows(vec![
            vec!["자산총액", "", "주식"],
            vec!["500", "2022-05", "100"],
            vec!["510", "2022-06", "110"],
        ]);
        let header = resolve_header(&grid, "x", 20).unwrap();
        assert_eq!(header.date_column, 1);
        assert_eq!(header.labels.len(), 2);
    }

    #[test]
    fn test_width_variants_are_recognised() {
        let grid = Grid::from_text_rows(vec![
            vec!["기준 일자", "자산\u{3000}총액", "ＣＰ"],
            vec!["2022-05", "1", "2"],
        ]);
        let header = resolve_header(&grid, "x", 20).unwrap();
        assert_eq!(header.labels[1].field, "CP");
    }

    #[test]
    fn test_header_outside_scan_window_fails() {
        let mut rows: Vec<Vec<&str>> = (0..25).map(|_| vec!["안내문"]).collect();
        rows.push(vec!["기준일자", "주식"]);
        rows.push(vec!["2022-05", "1"]);
        let err = resolve_header(&Grid::from_text_rows(rows), "Bond", 20).unwrap_err();
        assert!(matches!(err, MapError::HeaderNotFound { scanned: 20, .. }));
    }

    #[test]
    fn test_missing_date_column_fails() {
        let grid = Grid::from_text_rows(vec![vec!["자산총액", "주식"], vec!["1", "2"]]);
        let err = resolve_header(&grid, "Bond", 20).unwrap_err();
        assert!(matches!(err, MapError::DateColumnNotFound { header_row: 0, .. }));
    }

    #[test]
    fn test_unknown_columns_are_kept_for_the_synthesizer() {
        let grid = Grid::from_text_rows(vec![
            vec!["기준일자", "주식", "펀드수"],
            vec!["2022-05", "1", "33"],
        ]);
        let header = resolve_header(&grid, "x", 20).unwrap();
        let fields: Vec<&str> = header.labels.iter().map(|l| l.field.as_str()).collect();
        assert_eq!(fields, vec!["주식", "펀드수"]);
    }
}
