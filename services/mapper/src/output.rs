//! Serialization of a validated matrix: DATA workbook, METADATA workbook, ZIP bundle.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use rust_xlsxwriter::Workbook;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::align::CellValue;
use crate::assemble::OutputMatrix;
use crate::dictionary::{Metric, DATE_LABEL, SENTINEL};
use crate::error::Result;

pub const METADATA_HEADER: [&str; 5] = ["CODE", "DESCRIPTION", "FREQUENCY", "UNIT", "NEXT_RELEASE_DATE"];
const FREQUENCY: &str = "Monthly";

/// Files produced by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub data: PathBuf,
    pub metadata: PathBuf,
    pub archive: Option<PathBuf>,
    /// `sha256:<hex>` of the rendered matrix.
    pub fingerprint: String,
}

/// Matrix as CSV bytes, sentinel applied. This is the canonical rendering
/// the fingerprint is taken over; workbook bytes carry timestamps.
pub fn render_data_csv(matrix: &OutputMatrix) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in matrix.render_rows() {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()).into())
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

/// Weight series are percentages; everything else is an amount.
pub fn unit_for_code(code: &str) -> &'static str {
    let weight = format!(".{}.", Metric::Weight.code_segment());
    if code.contains(&weight) {
        Metric::Weight.unit()
    } else {
        Metric::Amount.unit()
    }
}

/// Last day of the month following `today`, noon.
pub fn next_release_date(today: NaiveDate) -> String {
    let (year, month) = if today.month() >= 11 {
        (today.year() + 1, today.month() - 10)
    } else {
        (today.year(), today.month() + 2)
    };
    // First day of the month after next, minus one day.
    let last_day = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(today);
    format!("{}T12:00:00", last_day.format("%Y-%m-%d"))
}

/// One METADATA row per series column; the Date column is skipped.
pub fn metadata_records(matrix: &OutputMatrix, today: NaiveDate) -> Vec<[String; 5]> {
    let release = next_release_date(today);
    matrix
        .codes
        .iter()
        .zip(&matrix.descriptions)
        .filter(|(code, _)| code.as_str() != DATE_LABEL)
        .map(|(code, description)| {
            [
                code.clone(),
                description.clone(),
                FREQUENCY.to_string(),
                unit_for_code(code).to_string(),
                release.clone(),
            ]
        })
        .collect()
}

/// DATA workbook: codes, descriptions, then one row per month. Values are
/// numeric cells, missing values the sentinel text.
pub fn data_workbook(matrix: &OutputMatrix) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, (code, description)) in matrix.codes.iter().zip(&matrix.descriptions).enumerate() {
        sheet.write_string(0, col as u16, code)?;
        sheet.write_string(1, col as u16, description)?;
    }
    for (i, row) in matrix.rows.iter().enumerate() {
        let r = i as u32 + 2;
        sheet.write_string(r, 0, row.period.to_string())?;
        for (c, cell) in row.cells.iter().enumerate() {
            let col = c as u16 + 1;
            match cell {
                CellValue::Present(v) => sheet.write_number(r, col, *v)?,
                CellValue::Absent | CellValue::NotApplicable => sheet.write_string(r, col, SENTINEL)?,
            };
        }
    }
    Ok(workbook.save_to_buffer()?)
}

pub fn metadata_workbook(matrix: &OutputMatrix, today: NaiveDate) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, title) in METADATA_HEADER.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }
    for (i, record) in metadata_records(matrix, today).iter().enumerate() {
        for (col, value) in record.iter().enumerate() {
            sheet.write_string(i as u32 + 1, col as u16, value)?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}

/// Write through a temp file in the same directory so readers never see a
/// half-written file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn build_archive(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        zip.start_file(*name, options)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        zip.write_all(bytes)?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Ok(cursor.into_inner())
}

/// Write DATA and METADATA (and optionally the ZIP) into `dir`, stamped with `today`.
pub fn write_outputs(
    matrix: &OutputMatrix,
    dir: &Path,
    today: NaiveDate,
    archive: bool,
) -> Result<WrittenFiles> {
    std::fs::create_dir_all(dir)?;
    let stamp = today.format("%Y%m%d").to_string();
    let data_name = format!("KMFK_DATA_{stamp}.xlsx");
    let meta_name = format!("KMFK_META_{stamp}.xlsx");

    let data = data_workbook(matrix)?;
    let metadata = metadata_workbook(matrix, today)?;
    let fingerprint = fingerprint(&render_data_csv(matrix)?);

    let data_path = dir.join(&data_name);
    let meta_path = dir.join(&meta_name);
    write_atomic(&data_path, &data)?;
    write_atomic(&meta_path, &metadata)?;
    info!(path = %data_path.display(), %fingerprint, "DATA file created");
    info!(path = %meta_path.display(), "METADATA file created");

    let archive_path = if archive {
        let zip_path = dir.join(format!("KMFK_{stamp}.ZIP"));
        let bytes = build_archive(&[(data_name.as_str(), &data), (meta_name.as_str(), &metadata)])?;
        write_atomic(&zip_path, &bytes)?;
        info!(path = %zip_path.display(), "ZIP archive created");
        Some(zip_path)
    } else {
        None
    };

    Ok(WrittenFiles {
        data: data_path,
        metadata: meta_path,
        archive: archive_path,
        fingerprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::CanonicalSeries;
    use crate::assemble::{assemble, SeriesIndex};
    use crate::period::{MonthWindow, Period};
    use crate::synth::SeriesId;
    use crate::template::ColumnTemplate;
    use calamine::{open_workbook_auto, Data, Range, Reader};
    use std::io::Read;

    fn matrix() -> OutputMatrix {
        let window = MonthWindow::ending_at(Period::new(2025, 9).unwrap(), 60);
        let mut index = SeriesIndex::new();
        index.insert(CanonicalSeries {
            id: SeriesId {
                code: "KMFK.EQUITY.STOCK.AMOUNT.M".into(),
                description: "Equity: Stock: Amount".into(),
            },
            source: "Equity.xls".into(),
            column: 2,
            values: [(Period::new(2025, 9).unwrap(), CellValue::Present(1165.5))]
                .into_iter()
                .collect(),
        });
        assemble(&ColumnTemplate::standard(), &index, &window)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn first_sheet(path: &Path) -> Range<Data> {
        let mut workbook = open_workbook_auto(path).unwrap();
        let name = workbook.sheet_names()[0].clone();
        workbook.worksheet_range(&name).unwrap()
    }

    #[test]
    fn test_next_release_date() {
        assert_eq!(next_release_date(day(2025, 10, 18)), "2025-11-30T12:00:00");
        assert_eq!(next_release_date(day(2025, 11, 2)), "2025-12-31T12:00:00");
        assert_eq!(next_release_date(day(2025, 12, 31)), "2026-01-31T12:00:00");
        assert_eq!(next_release_date(day(2024, 1, 15)), "2024-02-29T12:00:00");
    }

    #[test]
    fn test_units() {
        assert_eq!(unit_for_code("KMFK.EQUITY.STOCK.WEIGHT.M"), "Percentage");
        assert_eq!(unit_for_code("KMFK.EQUITY.STOCK.AMOUNT.M"), "KRW Million");
        assert_eq!(unit_for_code("KMFK.EQUITY.TOTALASSET.M"), "KRW Million");
    }

    #[test]
    fn test_metadata_records() {
        let records = metadata_records(&matrix(), day(2025, 10, 18));
        assert_eq!(records.len(), 143);
        assert_eq!(
            records[0],
            [
                "KMFK.EQUITY.TOTALASSET.M",
                "Equity: Total assets",
                "Monthly",
                "KRW Million",
                "2025-11-30T12:00:00"
            ]
            .map(String::from)
        );
        assert_eq!(records[2][3], "Percentage");
    }

    #[test]
    fn test_data_workbook_cells() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_outputs(&matrix(), dir.path(), day(2025, 10, 18), false).unwrap();
        assert!(written.data.ends_with("KMFK_DATA_20251018.xlsx"));

        let sheet = first_sheet(&written.data);
        assert_eq!(sheet.get_size(), (62, 144));
        assert_eq!(sheet.get_value((0, 0)), Some(&Data::String("Date".into())));
        assert_eq!(
            sheet.get_value((0, 2)),
            Some(&Data::String("KMFK.EQUITY.STOCK.AMOUNT.M".into()))
        );
        assert_eq!(sheet.get_value((2, 0)), Some(&Data::String("2020-10".into())));
        assert_eq!(sheet.get_value((61, 0)), Some(&Data::String("2025-09".into())));
        assert_eq!(sheet.get_value((61, 2)), Some(&Data::Float(1165.5)));
        assert_eq!(sheet.get_value((60, 2)), Some(&Data::String("N.A.".into())));
        assert_eq!(sheet.get_value((30, 77)), Some(&Data::String("N.A.".into())));
    }

    #[test]
    fn test_metadata_workbook_rows() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_outputs(&matrix(), dir.path(), day(2025, 10, 18), false).unwrap();
        assert!(written.metadata.ends_with("KMFK_META_20251018.xlsx"));

        let sheet = first_sheet(&written.metadata);
        assert_eq!(sheet.get_size(), (144, 5));
        assert_eq!(sheet.get_value((0, 4)), Some(&Data::String("NEXT_RELEASE_DATE".into())));
        assert_eq!(
            sheet.get_value((1, 0)),
            Some(&Data::String("KMFK.EQUITY.TOTALASSET.M".into()))
        );
        assert_eq!(sheet.get_value((3, 3)), Some(&Data::String("Percentage".into())));
    }

    #[test]
    fn test_write_outputs_creates_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_outputs(&matrix(), dir.path(), day(2025, 10, 18), true).unwrap();
        assert!(written.fingerprint.starts_with("sha256:"));

        let zip_path = written.archive.unwrap();
        assert!(zip_path.ends_with("KMFK_20251018.ZIP"));
        let mut archive = zip::ZipArchive::new(std::fs::File::open(zip_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        let mut data = Vec::new();
        archive
            .by_name("KMFK_DATA_20251018.xlsx")
            .unwrap()
            .read_to_end(&mut data)
            .unwrap();
        assert_eq!(data, std::fs::read(&written.data).unwrap());
        assert!(archive.by_name("KMFK_META_20251018.xlsx").is_ok());
    }

    #[test]
    fn test_write_outputs_without_archive() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_outputs(&matrix(), dir.path(), day(2025, 10, 18), false).unwrap();
        assert_eq!(written.archive, None);
        assert!(!dir.path().join("KMFK_20251018.ZIP").exists());
    }

    #[test]
    fn test_fingerprint_tracks_matrix_content() {
        let a = render_data_csv(&matrix()).unwrap();
        let b = render_data_csv(&matrix()).unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));

        let mut changed = matrix();
        changed.rows[0].cells[0] = CellValue::Present(1.0);
        let c = render_data_csv(&changed).unwrap();
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }
}
