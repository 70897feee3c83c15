// CSV -> formatted test-workbook generation.
//
// Reads CSV sheets whose rows mix literal values and formula text (cells
// beginning with `=`), and writes one .xlsx with a bold frozen header row.
// This utility never touches the registry or dispatcher; its formulas merely
// reference the probe functions by name so the host exercises them on open.

use std::io::Read;
use std::path::Path;

use rust_xlsxwriter::{Color, Format, Workbook};

/// One CSV file mapped to one worksheet.
#[derive(Debug, Clone)]
pub struct SheetPlan {
    pub csv_file: String,
    pub sheet_name: String,
}

impl SheetPlan {
    pub fn new(csv_file: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            csv_file: csv_file.into(),
            sheet_name: sheet_name.into(),
        }
    }
}

/// The fixed three-sheet layout of the generated test workbook.
pub fn default_layout() -> Vec<SheetPlan> {
    vec![
        SheetPlan::new("alpha_functions.csv", "Alpha Functions"),
        SheetPlan::new("beta_functions.csv", "Beta Functions"),
        SheetPlan::new("test_wrappers.csv", "Test Wrappers"),
    ]
}

/// Minimum column widths: test description, function, results, notes.
const COLUMN_WIDTHS: &[(u16, f64)] = &[(0, 25.0), (1, 20.0), (4, 30.0), (6, 25.0)];

/// A classified CSV cell, ready for typed writing.
#[derive(Debug, Clone, PartialEq)]
pub enum CellData {
    /// Formula text, argument separators normalized from `;` to `,`.
    Formula(String),
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

/// Classify a raw CSV field the way the generated workbook expects:
/// `=`-prefixed fields are formulas (with `;` separators normalized to `,`),
/// TRUE/FALSE are booleans, parseable numbers are numbers, the rest is text.
pub fn classify_cell(raw: &str) -> CellData {
    let value = raw.trim();
    if value.is_empty() {
        CellData::Empty
    } else if let Some(rest) = value.strip_prefix('=') {
        CellData::Formula(format!("={}", rest.replace(';', ",")))
    } else if value.eq_ignore_ascii_case("TRUE") {
        CellData::Bool(true)
    } else if value.eq_ignore_ascii_case("FALSE") {
        CellData::Bool(false)
    } else if let Ok(n) = value.parse::<f64>() {
        CellData::Number(n)
    } else {
        CellData::Text(value.to_string())
    }
}

/// Read file and convert to UTF-8 if needed (spreadsheet tools often export
/// CSVs as Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Build statistics for logging.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub sheets_written: usize,
    pub rows_written: usize,
    pub formulas_written: usize,
    /// CSV files from the layout that did not exist (warned, skipped).
    pub skipped: Vec<String>,
}

impl BuildReport {
    /// One-line summary, e.g.
    /// `[workbook] 3 sheet(s)  42 row(s)  18 formula(s)  skipped=0`
    pub fn log_line(&self) -> String {
        format!(
            "[workbook] {} sheet(s)  {} row(s)  {} formula(s)  skipped={}",
            self.sheets_written,
            self.rows_written,
            self.formulas_written,
            self.skipped.len()
        )
    }
}

/// Read each planned CSV from `csv_dir` and write the formatted workbook to
/// `out`. A missing CSV is recorded in the report and skipped; any write
/// failure aborts with an error.
pub fn build(csv_dir: &Path, layout: &[SheetPlan], out: &Path) -> Result<BuildReport, String> {
    let mut report = BuildReport::default();
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xD3D3D3));

    for plan in layout {
        let csv_path = csv_dir.join(&plan.csv_file);
        if !csv_path.exists() {
            report.skipped.push(plan.csv_file.clone());
            continue;
        }

        let content = read_file_as_utf8(&csv_path)?;
        let worksheet = workbook
            .add_worksheet()
            .set_name(&plan.sheet_name)
            .map_err(|e| format!("failed to create sheet '{}': {e}", plan.sheet_name))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = 0usize;
        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| format!("{}: {e}", plan.csv_file))?;
            let row = row_idx as u32;
            for (col_idx, field) in record.iter().enumerate() {
                let col = col_idx as u16;
                let write_result = match classify_cell(field) {
                    CellData::Formula(formula) => {
                        report.formulas_written += 1;
                        worksheet.write_formula(row, col, formula.as_str()).map(|_| ())
                    }
                    CellData::Number(n) => worksheet.write_number(row, col, n).map(|_| ()),
                    CellData::Bool(b) => worksheet.write_boolean(row, col, b).map(|_| ()),
                    CellData::Text(s) => worksheet.write_string(row, col, &s).map(|_| ()),
                    CellData::Empty => Ok(()),
                };
                write_result
                    .map_err(|e| format!("{} row {} col {}: {e}", plan.csv_file, row_idx, col_idx))?;
            }
            rows += 1;
        }

        // Static formatting: bold gray header, minimum widths, frozen header.
        worksheet
            .set_row_format(0, &header_format)
            .map_err(|e| e.to_string())?;
        for (col, width) in COLUMN_WIDTHS {
            worksheet
                .set_column_width(*col, *width)
                .map_err(|e| e.to_string())?;
        }
        worksheet.set_freeze_panes(1, 0).map_err(|e| e.to_string())?;

        report.sheets_written += 1;
        report.rows_written += rows;
    }

    if report.sheets_written == 0 {
        // A valid .xlsx needs at least one worksheet.
        workbook.add_worksheet();
    }

    workbook
        .save(out)
        .map_err(|e| format!("failed to save {}: {e}", out.display()))?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_formula_normalizes_separators() {
        assert_eq!(
            classify_cell("=ts_performance(5; 1000; TRUE)"),
            CellData::Formula("=ts_performance(5, 1000, TRUE)".to_string())
        );
    }

    #[test]
    fn classify_literals() {
        assert_eq!(classify_cell("TRUE"), CellData::Bool(true));
        assert_eq!(classify_cell("false"), CellData::Bool(false));
        assert_eq!(classify_cell(" 2.5 "), CellData::Number(2.5));
        assert_eq!(classify_cell("-10"), CellData::Number(-10.0));
        assert_eq!(
            classify_cell("nested call test"),
            CellData::Text("nested call test".to_string())
        );
        assert_eq!(classify_cell("   "), CellData::Empty);
        assert_eq!(classify_cell(""), CellData::Empty);
    }

    #[test]
    fn build_writes_workbook_and_skips_missing_csvs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("alpha_functions.csv"),
            "Test Description,Function,Input,Expected\n\
             direct calc,=alpha_thread_calc(5),5,TRUE\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("beta_functions.csv"),
            "Test Description,Function\nnested,=ts_nested_thread_info(TRUE)\n",
        )
        .unwrap();

        let out = dir.path().join("probe-tests.xlsx");
        let report = build(dir.path(), &default_layout(), &out).unwrap();

        assert_eq!(report.sheets_written, 2);
        assert_eq!(report.rows_written, 4);
        assert_eq!(report.formulas_written, 2);
        assert_eq!(report.skipped, vec!["test_wrappers.csv".to_string()]);
        assert_eq!(
            report.log_line(),
            "[workbook] 2 sheet(s)  4 row(s)  2 formula(s)  skipped=1"
        );

        let metadata = std::fs::metadata(&out).unwrap();
        assert!(metadata.len() > 0);
    }

    #[test]
    fn build_with_no_csvs_still_saves_empty_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.xlsx");
        let report = build(dir.path(), &default_layout(), &out).unwrap();

        assert_eq!(report.sheets_written, 0);
        assert_eq!(report.skipped.len(), 3);
        assert!(out.exists());
    }
}
