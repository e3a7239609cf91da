//! Runtime settings. Environment first (`.env` honoured), CLI flags override.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::dictionary::HEADER_SCAN_ROWS;
use crate::period::Period;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// JSON template; the built-in standard template is used when unset.
    pub template_path: Option<PathBuf>,
    /// Last month of the output window; inferred from the data when unset.
    pub window_end: Option<Period>,
    pub header_scan_rows: usize,
    pub archive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./downloads"),
            output_dir: PathBuf::from("./output"),
            template_path: None,
            window_end: None,
            header_scan_rows: HEADER_SCAN_ROWS,
            archive: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let window_end = non_empty("KMFK_WINDOW_END")
            .map(|v| v.parse::<Period>())
            .transpose()
            .context("KMFK_WINDOW_END must be YYYY-MM")?;

        let header_scan_rows = non_empty("KMFK_HEADER_SCAN_ROWS")
            .map(|v| parse_scan_rows(&v))
            .transpose()
            .context("KMFK_HEADER_SCAN_ROWS must be a positive row count")?;

        Ok(Self {
            input_dir: non_empty("KMFK_INPUT_DIR").map(PathBuf::from).unwrap_or(defaults.input_dir),
            output_dir: non_empty("KMFK_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            template_path: non_empty("KMFK_TEMPLATE").map(PathBuf::from),
            window_end,
            header_scan_rows: header_scan_rows.unwrap_or(defaults.header_scan_rows),
            archive: defaults.archive,
        })
    }
}

fn parse_scan_rows(raw: &str) -> Result<usize> {
    let rows: usize = raw.trim().parse()?;
    if rows == 0 {
        anyhow::bail!("got 0");
    }
    Ok(rows)
}
