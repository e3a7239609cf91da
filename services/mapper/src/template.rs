//! Column template: the ordered list of series the output must contain.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::dictionary::{Category, Field, Metric};
use crate::error::{MapError, Result};
use crate::synth::{series_code, series_description};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub code: String,
    pub description: String,
}

/// Ordered, duplicate-free list of template entries. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTemplate {
    entries: Vec<TemplateEntry>,
}

impl ColumnTemplate {
    pub fn new(entries: Vec<TemplateEntry>) -> Result<Self> {
        if entries.is_empty() {
            return Err(MapError::InvalidTemplate("template has no entries".into()));
        }
        let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.code.trim().is_empty() {
                return Err(MapError::InvalidTemplate(format!("entry {} has an empty code", i + 1)));
            }
            if !seen.insert(entry.code.as_str()) {
                return Err(MapError::InvalidTemplate(format!(
                    "duplicate code '{}' at entry {}",
                    entry.code,
                    i + 1
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The 143-entry KMFK schema: categories in declaration order, then
    /// tracked fields, then amount before weight.
    pub fn standard() -> Self {
        let mut entries = Vec::new();
        for category in Category::ALL {
            for field in Field::TRACKED {
                let metrics: Vec<Option<Metric>> = if field.is_single_valued() {
                    vec![None]
                } else {
                    Metric::ALL.into_iter().map(Some).collect()
                };
                for metric in metrics {
                    entries.push(TemplateEntry {
                        code: series_code(category, field, metric),
                        description: series_description(category, field, metric),
                    });
                }
            }
        }
        Self { entries }
    }

    /// Load a JSON array of `{"code": .., "description": ..}` objects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<TemplateEntry> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.code.as_str())
    }
}
