//! Code synthesis: (category, Korean label, metric) -> canonical series id.

use serde::{Deserialize, Serialize};

use crate::dictionary::{lookup_field, lookup_metric, Category, Field, Metric, METRIC_LABELS};
use crate::header::HeaderLabel;

/// Canonical identity of one output series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId {
    pub code: String,
    pub description: String,
}

/// Why a column produced no series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmappedReason {
    UnknownLabel,
    /// A two-valued field with no amount/weight indicator.
    MissingMetric,
}

impl std::fmt::Display for UnmappedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnmappedReason::UnknownLabel => f.write_str("no mapping rule for label"),
            UnmappedReason::MissingMetric => f.write_str("label needs an amount/weight indicator"),
        }
    }
}

/// Recoverable warning: a raw column that was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedColumn {
    pub dataset: String,
    pub column: usize,
    pub label: String,
    pub reason: UnmappedReason,
}

/// `KMFK.<PREFIX>.<FIELD>[.<METRIC>].M`; the metric is dropped for single-valued fields.
pub fn series_code(category: Category, field: Field, metric: Option<Metric>) -> String {
    match metric.filter(|_| !field.is_single_valued()) {
        Some(m) => format!(
            "KMFK.{}.{}.{}.M",
            category.code_prefix(),
            field.code_segment(),
            m.code_segment()
        ),
        None => format!("KMFK.{}.{}.M", category.code_prefix(), field.code_segment()),
    }
}

pub fn series_description(category: Category, field: Field, metric: Option<Metric>) -> String {
    match metric.filter(|_| !field.is_single_valued()) {
        Some(m) => format!("{}: {}: {}", category.dataset_name(), field.english(), m.english()),
        None => format!("{}: {}", category.dataset_name(), field.english()),
    }
}

/// Split `주식금액`, `주식(비중)`, `주식_비중` into (field, metric).
pub fn split_embedded_metric(label: &str) -> Option<(Field, Metric)> {
    METRIC_LABELS.iter().find_map(|(token, metric)| {
        let stripped = label
            .strip_suffix(&format!("({token})"))
            .or_else(|| label.strip_suffix(&format!("[{token}]")))
            .or_else(|| label.strip_suffix(token))?;
        let field_label = stripped.trim_end_matches(['_', '-', ':', '/', '·']);
        lookup_field(field_label).map(|field| (field, *metric))
    })
}

/// Resolve a (field, metric) pair for one header label.
pub fn resolve_label(label: &HeaderLabel) -> Result<(Field, Option<Metric>), UnmappedReason> {
    let sub_metric = label.metric.as_deref().and_then(lookup_metric);

    if let Some(field) = lookup_field(&label.field) {
        return match (field.is_single_valued(), sub_metric) {
            (true, _) => Ok((field, None)),
            (false, Some(m)) => Ok((field, Some(m))),
            (false, None) => Err(UnmappedReason::MissingMetric),
        };
    }
    split_embedded_metric(&label.field)
        .map(|(field, metric)| (field, (!field.is_single_valued()).then_some(metric)))
        .ok_or(UnmappedReason::UnknownLabel)
}

/// Canonical id for a header label under `category`.
pub fn synthesize(category: Category, label: &HeaderLabel) -> Result<SeriesId, UnmappedReason> {
    let (field, metric) = resolve_label(label)?;
    Ok(SeriesId {
        code: series_code(category, field, metric),
        description: series_description(category, field, metric),
    })
}
