//! Category classification from dataset identity.
//!
//! Classification is a pure function of the file's name (or, failing that, its
//! title preamble). Position in a directory listing never matters.

use std::path::Path;

use crate::dictionary::{Category, FundType, Region};
use crate::error::{MapError, Result};
use crate::grid::{normalize_label, Grid};

/// Prefix the downloader puts in front of its dataset config names.
const RAW_DATA_PREFIX: &str = "rawdata";

/// Lowercase, drop everything that is not alphanumeric, drop the `RawData` prefix.
fn signature(raw: &str) -> String {
    let folded: String = normalize_label(raw)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    folded
        .strip_prefix(RAW_DATA_PREFIX)
        .map(str::to_string)
        .unwrap_or(folded)
}

fn matches_category(sig: &str, category: Category) -> bool {
    sig == signature(category.dataset_name()) || sig == signature(category.code_prefix())
}

/// Classify a dataset by its identity (file name, with or without extension/directory).
pub fn classify_identity(identity: &str) -> Result<Category> {
    let stem = Path::new(identity)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(identity);
    let sig = signature(stem);

    Category::ALL
        .into_iter()
        .find(|c| matches_category(&sig, *c))
        .ok_or_else(|| MapError::UnrecognizedCategory {
            identity: identity.to_string(),
        })
}

/// Fallback: look for fund-type and region tokens in the rows above the header.
///
/// Fund-type tokens are matched longest-first so `혼합형주식` is not read as `주식형`.
pub fn classify_preamble(grid: &Grid, rows: usize) -> Option<Category> {
    let text: String = grid
        .rows
        .iter()
        .take(rows)
        .flatten()
        .filter_map(|c| c.as_text())
        .map(normalize_label)
        .collect::<Vec<_>>()
        .join("|");

    let mut fund_types = [
        FundType::Equity,
        FundType::HybridEquity,
        FundType::HybridBond,
        FundType::Bond,
        FundType::MoneyMarket,
        FundType::HybridAsset,
    ];
    fund_types.sort_by_key(|f| std::cmp::Reverse(f.korean().chars().count()));

    let fund_type = fund_types
        .into_iter()
        .find(|f| text.contains(f.korean()))?;
    let region = if text.contains(Region::Domestic.korean()) {
        Region::Domestic
    } else {
        Region::All
    };
    Category::from_parts(fund_type, region)
}

/// Identity first, preamble second; the error keeps the identity for the report.
pub fn classify(identity: &str, grid: &Grid, preamble_rows: usize) -> Result<Category> {
    match classify_identity(identity) {
        Ok(category) => Ok(category),
        Err(err) => classify_preamble(grid, preamble_rows).ok_or(err),
    }
}
