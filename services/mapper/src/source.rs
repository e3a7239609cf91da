//! Raw input discovery and reading (xls/xlsx through calamine, CSV through csv).

use std::borrow::Cow;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto_from_rs, Reader};
use tracing::{debug, info};

use crate::error::{MapError, Result};
use crate::grid::{Cell, Grid};

const WORKBOOK_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "xlsb", "ods"];
const CSV_EXTENSIONS: &[&str] = &["csv"];

/// One raw input: where it came from and its first sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSource {
    /// File name; the classifier reads this.
    pub identity: String,
    pub grid: Grid,
}

impl RawSource {
    pub fn new(identity: impl Into<String>, grid: Grid) -> Self {
        Self {
            identity: identity.into(),
            grid,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn is_supported(path: &Path) -> bool {
    extension(path)
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.as_str()) || CSV_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

/// Spreadsheet files directly inside `dir`, sorted by name for stable logs.
/// Lock files left by spreadsheet apps (`~$...`) are skipped.
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_supported(p))
        .filter(|p| {
            !p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("~$"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    info!(dir = %dir.display(), files = paths.len(), "discovered input files");
    Ok(paths)
}

fn identity_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read the first sheet of a workbook or a CSV file into a grid.
pub fn read_source(path: &Path) -> Result<RawSource> {
    let identity = identity_of(path);
    let grid = match extension(path).as_deref() {
        Some(ext) if CSV_EXTENSIONS.contains(&ext) => read_csv_grid(&fs::read(path)?)?,
        _ => read_workbook_grid(path, &identity)?,
    };
    debug!(dataset = %identity, rows = grid.len(), cols = grid.width(), "source read");
    Ok(RawSource::new(identity, grid))
}

/// The reader is chosen from the file contents, not the extension: KOFIA
/// downloads are saved as `.xls` but usually hold OOXML.
fn read_workbook_grid(path: &Path, identity: &str) -> Result<Grid> {
    let bytes = fs::read(path)?;
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|source| MapError::Workbook {
        dataset: identity.to_string(),
        source,
    })?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| MapError::EmptyWorkbook(identity.to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|source| MapError::Workbook {
            dataset: identity.to_string(),
            source,
        })?;

    // calamine ranges start at the first used cell; pad so row/column
    // indices match what a spreadsheet app shows.
    let (top, left) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); top as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; left as usize];
        cells.extend(row.iter().map(Cell::from));
        rows.push(cells);
    }
    Ok(Grid::new(rows))
}

/// KOFIA CSV exports are often CP949; anything that is not valid UTF-8 is
/// decoded as EUC-KR (encoding_rs treats it as the CP949 superset).
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let (decoded, _, had_errors) = encoding_rs::EUC_KR.decode(bytes);
            if had_errors {
                debug!("input had bytes outside EUC-KR; replaced");
            }
            decoded
        }
    }
}

pub fn read_csv_grid(bytes: &[u8]) -> Result<Grid> {
    let text = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::text).collect());
    }
    Ok(Grid::new(rows))
}
