//! Fixed-layout XLS report parser
//!
//! Reports are legacy binary `.xls` workbooks. Only the first sheet is read.
//! The trade date sits in a fixed header cell and is shared by every row of
//! the document; instrument rows follow a fixed column layout with the
//! contract count in the last column.
//!
//! Rows are padded to sheet width by the reader, so header/footer lines show
//! up with empty trailing cells and fall out through the sentinel check.

use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Range, Reader, Xls};
use chrono::NaiveDate;
use tracing::{debug, warn};

use super::models::TradeRecord;
use super::{
    Result, SpimexError, DELIVERY_BASIS_NAME_COL, EXCHANGE_PRODUCT_ID_COL,
    EXCHANGE_PRODUCT_NAME_COL, MIN_ROW_CELLS, SKIP_CELL_VALUES, TOTAL_COL, TRADE_DATE_COL,
    TRADE_DATE_FORMAT, TRADE_DATE_ROW, VOLUME_COL,
};

/// Why a structurally present row carries no instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The contract-count cell matches a header/footer sentinel
    ContractCountSentinel,
    /// The product-code cell matches a header/footer sentinel
    ProductCodeSentinel,
}

/// Classification of one report row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// The row carries an instrument and must parse into a record
    Data,
    /// The row is a header/footer/total line and is skipped
    Skip(SkipReason),
}

/// Classify one row of report cells
///
/// The two sentinel checks are independent: the row is skipped when either
/// its last cell or its product-code cell matches any sentinel value, even
/// if the other cell looks like valid data.
pub fn classify_row(cells: &[Data]) -> RowKind {
    let last_idx = cells.len().saturating_sub(1);

    if let Some(text) = sentinel_text(cells, last_idx) {
        if SKIP_CELL_VALUES.contains(&text) {
            return RowKind::Skip(SkipReason::ContractCountSentinel);
        }
    }

    if let Some(text) = sentinel_text(cells, EXCHANGE_PRODUCT_ID_COL) {
        if SKIP_CELL_VALUES.contains(&text) {
            return RowKind::Skip(SkipReason::ProductCodeSentinel);
        }
    }

    RowKind::Data
}

/// Textual view of a cell for the sentinel check
///
/// Missing and empty cells read as `""`; numeric cells are never sentinels.
fn sentinel_text(cells: &[Data], idx: usize) -> Option<&str> {
    match cells.get(idx) {
        None | Some(Data::Empty) => Some(""),
        Some(Data::String(s)) => Some(s.as_str()),
        Some(_) => None,
    }
}

/// Typed accessor for a text column
fn text_cell(cells: &[Data], idx: usize) -> std::result::Result<String, String> {
    match cells.get(idx) {
        Some(Data::String(s)) => Ok(s.clone()),
        None | Some(Data::Empty) => Ok(String::new()),
        Some(other) => Err(format!("expected text in column {}, found {:?}", idx, other)),
    }
}

/// Typed accessor for a numeric column
fn numeric_cell(cells: &[Data], idx: usize) -> std::result::Result<f64, String> {
    match cells.get(idx) {
        Some(Data::Float(f)) => Ok(*f),
        Some(Data::Int(i)) => Ok(*i as f64),
        Some(Data::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("non-numeric value {:?} in column {}", s, idx)),
        Some(other) => Err(format!("non-numeric cell {:?} in column {}", other, idx)),
        None => Err(format!("missing numeric column {}", idx)),
    }
}

/// Build a record from a classified data row
fn build_record(cells: &[Data], trade_date: NaiveDate) -> std::result::Result<TradeRecord, String> {
    if cells.len() < MIN_ROW_CELLS {
        return Err(format!(
            "expected at least {} cells, got {}",
            MIN_ROW_CELLS,
            cells.len()
        ));
    }

    Ok(TradeRecord::new(
        text_cell(cells, EXCHANGE_PRODUCT_ID_COL)?,
        text_cell(cells, EXCHANGE_PRODUCT_NAME_COL)?,
        text_cell(cells, DELIVERY_BASIS_NAME_COL)?,
        numeric_cell(cells, VOLUME_COL)?,
        numeric_cell(cells, TOTAL_COL)?,
        numeric_cell(cells, cells.len() - 1)?,
        trade_date,
    ))
}

/// Parser for downloaded SPIMEX oil-products reports
#[derive(Debug, Clone, Default)]
pub struct XlsReportParser {
    skip_invalid_reports: bool,
}

impl XlsReportParser {
    /// Create a parser that fails the whole scan on the first bad report
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure whether unreadable reports are skipped instead of fatal
    pub fn skip_invalid_reports(mut self, skip: bool) -> Self {
        self.skip_invalid_reports = skip;
        self
    }

    /// Parse one report file into instrument records
    pub fn parse_file(&self, path: &Path) -> Result<Vec<TradeRecord>> {
        let item = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut workbook: Xls<_> =
            open_workbook(path).map_err(|e| SpimexError::parse(&item, e))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| SpimexError::parse(&item, "workbook has no sheets"))?
            .map_err(|e| SpimexError::parse(&item, e))?;

        self.parse_range(&range, &item)
    }

    /// Parse every report in `dir` whose extension matches, unioned in
    /// path order
    pub fn parse_dir(&self, dir: &Path, extension: &str) -> Result<Vec<TradeRecord>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
            })
            .collect();
        paths.sort();

        let mut records = Vec::new();
        for path in &paths {
            match self.parse_file(path) {
                Ok(parsed) => {
                    debug!(report = %path.display(), records = parsed.len(), "Parsed report");
                    records.extend(parsed);
                },
                Err(e) if self.skip_invalid_reports => {
                    warn!(report = %path.display(), error = %e, "Skipping unreadable report");
                },
                Err(e) => return Err(e),
            }
        }

        Ok(records)
    }

    /// Parse one sheet range; `item` names the document in errors
    pub(crate) fn parse_range(&self, range: &Range<Data>, item: &str) -> Result<Vec<TradeRecord>> {
        let trade_date = trade_date(range, item)?;

        let mut records = Vec::new();
        for (row_idx, cells) in range.rows().enumerate() {
            match classify_row(cells) {
                RowKind::Skip(reason) => {
                    debug!(item = %item, row = row_idx, reason = ?reason, "Skipping non-data row");
                },
                RowKind::Data => {
                    let record = build_record(cells, trade_date).map_err(|cause| {
                        SpimexError::parse(format!("{} row {}", item, row_idx), cause)
                    })?;
                    records.push(record);
                },
            }
        }

        Ok(records)
    }
}

/// Read the trade date from the fixed header cell
fn trade_date(range: &Range<Data>, item: &str) -> Result<NaiveDate> {
    let row = range
        .rows()
        .nth(TRADE_DATE_ROW)
        .ok_or_else(|| SpimexError::parse(item, "missing trade date header row"))?;

    let cell = match row.get(TRADE_DATE_COL) {
        Some(Data::String(s)) => s,
        other => {
            return Err(SpimexError::parse(
                item,
                format!("unexpected trade date cell: {:?}", other),
            ))
        },
    };

    let raw = cell.splitn(2, ':').nth(1).ok_or_else(|| {
        SpimexError::parse(item, format!("trade date cell {:?} has no ':' delimiter", cell))
    })?;

    NaiveDate::parse_from_str(raw.trim(), TRADE_DATE_FORMAT)
        .map_err(|e| SpimexError::parse(item, format!("bad trade date {:?}: {}", raw.trim(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spimex::CONTRACT_COUNT_HEADER;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    /// Build a sheet range from sparse rows, padded to uniform width like the
    /// XLS reader does
    fn sheet(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(1) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    fn report_sheet(data_rows: Vec<Vec<Data>>) -> Range<Data> {
        let mut rows = vec![
            vec![s("Бюллетень по итогам торгов")],
            vec![],
            vec![],
            vec![Data::Empty, s("Дата торгов: 13.07.2023")],
            vec![
                s("Код"),
                s("Инструмент"),
                s("Наименование"),
                s("Базис"),
                s("Объем"),
                s("Сумма"),
                s("Изм."),
                s(CONTRACT_COUNT_HEADER),
            ],
        ];
        rows.extend(data_rows);
        rows.push(vec![Data::Empty, s("Итого:")]);
        rows.push(vec![Data::Empty, s("Итого по секции:")]);
        sheet(rows)
    }

    fn data_row(code: &str, volume: f64, total: f64, count: f64) -> Vec<Data> {
        vec![
            Data::Empty,
            s(code),
            s("Product A"),
            s("Basis A"),
            Data::Float(volume),
            Data::Float(total),
            Data::Empty,
            Data::Float(count),
        ]
    }

    #[test]
    fn test_classify_skips_sentinel_count_cell() {
        let row = vec![
            Data::Empty,
            s("A1234XYZ"),
            s("Product"),
            s("Basis"),
            Data::Float(1.0),
            Data::Float(2.0),
            Data::Empty,
            s("-"),
        ];
        assert_eq!(
            classify_row(&row),
            RowKind::Skip(SkipReason::ContractCountSentinel)
        );
    }

    #[test]
    fn test_classify_skips_total_row_despite_numeric_count() {
        // The product-code check fires on its own even when the last cell
        // carries a plausible number.
        let row = vec![
            Data::Empty,
            s("Итого:"),
            Data::Empty,
            Data::Empty,
            Data::Float(10.0),
            Data::Float(20.0),
            Data::Empty,
            Data::Float(5.0),
        ];
        assert_eq!(
            classify_row(&row),
            RowKind::Skip(SkipReason::ProductCodeSentinel)
        );
    }

    #[test]
    fn test_classify_empty_row() {
        assert_eq!(
            classify_row(&[]),
            RowKind::Skip(SkipReason::ContractCountSentinel)
        );
    }

    #[test]
    fn test_classify_data_row() {
        assert_eq!(
            classify_row(&data_row("A1234XYZ", 1.5, 2.5, 3.0)),
            RowKind::Data
        );
    }

    #[test]
    fn test_parse_range_single_data_row() {
        let range = report_sheet(vec![data_row("A1234XYZ", 1.5, 2.5, 3.0)]);
        let records = XlsReportParser::new()
            .parse_range(&range, "report_1.xls")
            .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.exchange_product_id, "A1234XYZ");
        assert_eq!(record.exchange_product_name, "Product A");
        assert_eq!(record.delivery_basis_name, "Basis A");
        assert_eq!(record.oil_id, "A123");
        assert_eq!(record.delivery_basis_id, "4XY");
        assert_eq!(record.delivery_type_id, "Z");
        assert_eq!(record.volume, 1.5);
        assert_eq!(record.total, 2.5);
        assert_eq!(record.count, 3.0);
        assert_eq!(
            record.trade_date,
            NaiveDate::from_ymd_opt(2023, 7, 13).unwrap()
        );
    }

    #[test]
    fn test_parse_range_all_rows_accounted_for() {
        let range = report_sheet(vec![
            data_row("A1234XYZ", 1.5, 2.5, 3.0),
            data_row("B567QRSF", 10.0, 20.0, 4.0),
        ]);

        let total_rows = range.rows().count();
        let records = XlsReportParser::new()
            .parse_range(&range, "report_1.xls")
            .unwrap();
        let skipped = range
            .rows()
            .filter(|row| matches!(classify_row(row), RowKind::Skip(_)))
            .count();

        assert_eq!(records.len(), 2);
        assert_eq!(records.len() + skipped, total_rows);
    }

    #[test]
    fn test_parse_range_shares_trade_date() {
        let range = report_sheet(vec![
            data_row("A1234XYZ", 1.5, 2.5, 3.0),
            data_row("B567QRSF", 10.0, 20.0, 4.0),
        ]);
        let records = XlsReportParser::new()
            .parse_range(&range, "report_1.xls")
            .unwrap();

        assert!(records
            .iter()
            .all(|r| r.trade_date == NaiveDate::from_ymd_opt(2023, 7, 13).unwrap()));
    }

    #[test]
    fn test_parse_range_non_numeric_cell_is_fatal() {
        let mut bad_row = data_row("A1234XYZ", 1.5, 2.5, 3.0);
        bad_row[4] = s("n/a");
        let range = report_sheet(vec![bad_row]);

        let result = XlsReportParser::new().parse_range(&range, "report_1.xls");

        match result {
            Err(SpimexError::Parse { item, cause }) => {
                assert!(item.starts_with("report_1.xls row "));
                assert!(cause.contains("n/a"));
            },
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_range_malformed_date_is_fatal() {
        let mut rows = vec![
            vec![s("Бюллетень")],
            vec![],
            vec![],
            vec![Data::Empty, s("Дата торгов: not-a-date")],
        ];
        rows.push(data_row("A1234XYZ", 1.5, 2.5, 3.0));
        let range = sheet(rows);

        let result = XlsReportParser::new().parse_range(&range, "report_1.xls");

        assert!(matches!(result, Err(SpimexError::Parse { .. })));
    }

    #[test]
    fn test_parse_range_missing_date_delimiter_is_fatal() {
        let range = sheet(vec![
            vec![s("Бюллетень")],
            vec![],
            vec![],
            vec![Data::Empty, s("13.07.2023")],
        ]);

        let result = XlsReportParser::new().parse_range(&range, "report_1.xls");

        assert!(matches!(result, Err(SpimexError::Parse { .. })));
    }

    #[test]
    fn test_parse_dir_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let records = XlsReportParser::new().parse_dir(dir.path(), "xls").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_dir_bad_report_aborts_by_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report_bad.xls"), b"not an xls file").unwrap();

        let result = XlsReportParser::new().parse_dir(dir.path(), "xls");

        assert!(matches!(result, Err(SpimexError::Parse { .. })));
    }

    #[test]
    fn test_parse_dir_bad_report_skipped_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report_bad.xls"), b"not an xls file").unwrap();

        let records = XlsReportParser::new()
            .skip_invalid_reports(true)
            .parse_dir(dir.path(), "xls")
            .unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_dir_ignores_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"not a report").unwrap();

        let records = XlsReportParser::new().parse_dir(dir.path(), "xls").unwrap();

        assert!(records.is_empty());
    }
}
