//! End-to-end run: raw sources in, validated matrix (and files) out.
//!
//! Each dataset is classified, header-resolved and synthesized on its own,
//! in parallel. Results meet again only through maps keyed by category and by
//! series code, so the order the files arrive in never reaches the output.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::align::{collect_series, CanonicalSeries};
use crate::assemble::{assemble, OutputMatrix, SeriesIndex};
use crate::classify::classify;
use crate::dictionary::{Category, HEADER_SCAN_ROWS, WINDOW_MONTHS};
use crate::error::{MapError, Result};
use crate::header::{resolve_header, HeaderLabel};
use crate::output::{self, WrittenFiles};
use crate::period::{MonthWindow, Period};
use crate::source::{discover_sources, read_source, RawSource};
use crate::synth::{synthesize, UnmappedColumn};
use crate::template::ColumnTemplate;
use crate::validate::{validate, STANDARD_SHAPE};

/// Everything one dataset contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDataset {
    pub category: Category,
    pub identity: String,
    pub series: Vec<CanonicalSeries>,
    pub unmapped: Vec<UnmappedColumn>,
}

/// A dataset that was dropped; its columns end up `N.A.`.
#[derive(Debug)]
pub struct DatasetFailure {
    pub identity: String,
    pub error: MapError,
}

#[derive(Debug)]
pub struct RunReport {
    pub matrix: OutputMatrix,
    pub window: MonthWindow,
    /// Dataset that supplied each category.
    pub datasets: BTreeMap<Category, String>,
    /// Sorted by identity.
    pub failures: Vec<DatasetFailure>,
    pub unmapped: Vec<UnmappedColumn>,
    /// `sha256:<hex>` of the DATA sheet as it would be written.
    pub fingerprint: String,
}

impl RunReport {
    pub fn missing_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| !self.datasets.contains_key(c))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    template: ColumnTemplate,
    header_scan_rows: usize,
    window_end: Option<Period>,
}

impl Pipeline {
    pub fn new(template: ColumnTemplate) -> Self {
        Self {
            template,
            header_scan_rows: HEADER_SCAN_ROWS,
            window_end: None,
        }
    }

    pub fn with_window_end(mut self, end: Option<Period>) -> Self {
        self.window_end = end;
        self
    }

    pub fn with_header_scan_rows(mut self, rows: usize) -> Self {
        self.header_scan_rows = rows;
        self
    }

    /// Classify, resolve and synthesize one dataset.
    pub fn process_dataset(&self, source: &RawSource) -> Result<ResolvedDataset> {
        let identity = source.identity.as_str();
        let category = classify(identity, &source.grid, self.header_scan_rows)?;
        let header = resolve_header(&source.grid, identity, self.header_scan_rows)?;

        let mut series = Vec::new();
        let mut unmapped = Vec::new();
        for label in &header.labels {
            match synthesize(category, label) {
                Ok(id) => series.push(collect_series(&source.grid, &header, label.column, id, identity)),
                Err(reason) => {
                    warn!(
                        dataset = identity,
                        column = label.column,
                        label = %display_label(label),
                        %reason,
                        "column not mapped"
                    );
                    unmapped.push(UnmappedColumn {
                        dataset: identity.to_string(),
                        column: label.column,
                        label: display_label(label),
                        reason,
                    });
                }
            }
        }

        info!(
            dataset = identity,
            %category,
            series = series.len(),
            unmapped = unmapped.len(),
            "dataset resolved"
        );
        Ok(ResolvedDataset {
            category,
            identity: identity.to_string(),
            series,
            unmapped,
        })
    }

    /// Map in-memory sources to a validated matrix.
    pub fn run(&self, sources: &[RawSource]) -> Result<RunReport> {
        self.run_with_failures(sources, Vec::new())
    }

    /// Read every supported file in `dir` and run. Unreadable files count as
    /// dataset failures, not run failures.
    pub fn run_directory(&self, dir: &Path) -> Result<RunReport> {
        let paths = discover_sources(dir)?;
        let (sources, failures): (Vec<_>, Vec<_>) = paths
            .par_iter()
            .map(|path| {
                read_source(path).map_err(|error| DatasetFailure {
                    identity: path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string()),
                    error,
                })
            })
            .partition_map(|r| match r {
                Ok(source) => rayon::iter::Either::Left(source),
                Err(failure) => rayon::iter::Either::Right(failure),
            });
        self.run_with_failures(&sources, failures)
    }

    /// Run over `input_dir` and, only once validation passed, write the output files.
    pub fn execute_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        today: NaiveDate,
        archive: bool,
    ) -> Result<(RunReport, WrittenFiles)> {
        let report = self.run_directory(input_dir)?;
        let written = output::write_outputs(&report.matrix, output_dir, today, archive)?;
        Ok((report, written))
    }

    fn run_with_failures(&self, sources: &[RawSource], mut failures: Vec<DatasetFailure>) -> Result<RunReport> {
        let outcomes: Vec<std::result::Result<ResolvedDataset, DatasetFailure>> = sources
            .par_iter()
            .map(|source| {
                self.process_dataset(source).map_err(|error| DatasetFailure {
                    identity: source.identity.clone(),
                    error,
                })
            })
            .collect();

        let mut by_category: BTreeMap<Category, Vec<ResolvedDataset>> = BTreeMap::new();
        for outcome in outcomes {
            match outcome {
                Ok(dataset) => by_category.entry(dataset.category).or_default().push(dataset),
                Err(failure) => failures.push(failure),
            }
        }

        let mut datasets = BTreeMap::new();
        let mut unmapped = Vec::new();
        let mut index = SeriesIndex::new();
        for (category, mut candidates) in by_category {
            candidates.sort_by(|a, b| a.identity.cmp(&b.identity));
            let mut candidates = candidates.into_iter();
            let Some(kept) = candidates.next() else {
                continue;
            };
            for dropped in candidates {
                failures.push(DatasetFailure {
                    identity: dropped.identity.clone(),
                    error: MapError::DuplicateCategory {
                        category: category.to_string(),
                        kept: kept.identity.clone(),
                        dropped: dropped.identity,
                    },
                });
            }
            datasets.insert(category, kept.identity);
            unmapped.extend(kept.unmapped);
            index.extend(kept.series);
        }

        failures.sort_by(|a, b| a.identity.cmp(&b.identity));
        for failure in &failures {
            error!(dataset = %failure.identity, error = %failure.error, "dataset dropped");
        }
        unmapped.sort_by(|a, b| (&a.dataset, a.column).cmp(&(&b.dataset, b.column)));

        let end = self
            .window_end
            .or_else(|| index.latest_period())
            .ok_or(MapError::NoPeriods)?;
        let window = MonthWindow::ending_at(end, WINDOW_MONTHS);

        let matrix = assemble(&self.template, &index, &window);
        validate(&matrix, &self.template, STANDARD_SHAPE)?;
        let fingerprint = output::fingerprint(&output::render_data_csv(&matrix)?);

        info!(
            start = %window.start(),
            end = %window.end(),
            datasets = datasets.len(),
            failures = failures.len(),
            unmapped = unmapped.len(),
            %fingerprint,
            "matrix validated"
        );
        Ok(RunReport {
            matrix,
            window,
            datasets,
            failures,
            unmapped,
            fingerprint,
        })
    }
}

fn display_label(label: &HeaderLabel) -> String {
    match &label.metric {
        Some(metric) => format!("{}/{}", label.field, metric),
        None => label.field.clone(),
    }
}
