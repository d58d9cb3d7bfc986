//! Extraction records, the batch table and its export formats.

use std::io::Write;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::VlozyError;
use crate::models::config::{delimiter_byte, ExportConfig};
use crate::zone::ZoneSet;

/// Column holding the source document's name.
pub const FILE_NAME_COLUMN: &str = "file_name";

/// Optional column holding the record status label.
pub const STATUS_COLUMN: &str = "status";

/// Optional column holding the record error summary.
pub const ERROR_COLUMN: &str = "error";

/// The value extracted for one zone of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Normalized recognized text; may be empty.
    Text(String),
    /// Extraction failed for this zone.
    Failed { reason: String },
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FieldValue::Failed { .. })
    }

    /// Cell text for delimited export.
    pub fn render<'a>(&'a self, failure_marker: &'a str) -> &'a str {
        self.as_text().unwrap_or(failure_marker)
    }
}

/// Overall outcome of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RecordStatus {
    /// Every zone produced text.
    Complete,
    /// The document decoded but at least one zone failed.
    Partial,
    /// The document could not be decoded.
    Failed { reason: String },
}

impl RecordStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Complete => "ok",
            RecordStatus::Partial => "partial",
            RecordStatus::Failed { .. } => "failed",
        }
    }
}

/// One row of the table: a document's zone values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRecord {
    pub file_name: String,
    /// Zone name and value, in zone set order.
    pub fields: Vec<(String, FieldValue)>,
    pub status: RecordStatus,
}

impl ExtractionRecord {
    /// Build a record from extracted fields, deriving its status.
    pub fn from_fields(file_name: impl Into<String>, fields: Vec<(String, FieldValue)>) -> Self {
        let status = if fields.iter().any(|(_, v)| v.is_failed()) {
            RecordStatus::Partial
        } else {
            RecordStatus::Complete
        };
        Self {
            file_name: file_name.into(),
            fields,
            status,
        }
    }

    /// A record for a document that could not be decoded.
    ///
    /// Every zone carries the same failure so the row keeps the table shape.
    pub fn failed(file_name: impl Into<String>, zones: &ZoneSet, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let fields = zones
            .iter()
            .map(|zone| {
                (
                    zone.name().to_string(),
                    FieldValue::Failed {
                        reason: reason.clone(),
                    },
                )
            })
            .collect();
        Self {
            file_name: file_name.into(),
            fields,
            status: RecordStatus::Failed { reason },
        }
    }

    pub fn get(&self, zone: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(name, _)| name == zone).map(|(_, v)| v)
    }

    /// Recognized text for `zone`, if it succeeded.
    pub fn text(&self, zone: &str) -> Option<&str> {
        self.get(zone).and_then(FieldValue::as_text)
    }

    /// Human-readable summary of what went wrong, if anything.
    pub fn error_summary(&self) -> Option<String> {
        match &self.status {
            RecordStatus::Complete => None,
            RecordStatus::Failed { reason } => Some(reason.clone()),
            RecordStatus::Partial => Some(
                self.fields
                    .iter()
                    .filter_map(|(name, value)| match value {
                        FieldValue::Failed { reason } => Some(format!("{}: {}", name, reason)),
                        FieldValue::Text(_) => None,
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }
}

/// Options controlling table export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub delimiter: char,
    pub failure_marker: String,
    /// Append `status` and `error` columns.
    pub include_status: bool,
}

impl ExportOptions {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            delimiter: config.delimiter,
            failure_marker: config.failure_marker.clone(),
            include_status: false,
        }
    }

    pub fn with_status(mut self, include_status: bool) -> Self {
        self.include_status = include_status;
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default())
    }
}

/// The batch result: one record per submitted document, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionTable {
    /// Zone names, fixed when the batch started.
    pub columns: Vec<String>,
    pub records: Vec<ExtractionRecord>,
}

impl ExtractionTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: ExtractionRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records with the given status label.
    pub fn count_status(&self, label: &str) -> usize {
        self.records.iter().filter(|r| r.status.label() == label).count()
    }

    /// Header row: zone columns, then `file_name`.
    pub fn header(&self, include_status: bool) -> Vec<&str> {
        let mut header: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        header.push(FILE_NAME_COLUMN);
        if include_status {
            header.extend([STATUS_COLUMN, ERROR_COLUMN]);
        }
        header
    }

    /// Write the table as delimited text.
    pub fn write_csv<W: Write>(&self, writer: W, options: &ExportOptions) -> Result<(), VlozyError> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter_byte(options.delimiter)?)
            .from_writer(writer);

        wtr.write_record(self.header(options.include_status))?;

        for record in &self.records {
            let mut row: Vec<String> = self
                .columns
                .iter()
                .map(|column| {
                    record
                        .get(column)
                        .map(|v| v.render(&options.failure_marker).to_string())
                        .unwrap_or_default()
                })
                .collect();
            row.push(record.file_name.clone());
            if options.include_status {
                row.push(record.status.label().to_string());
                row.push(record.error_summary().unwrap_or_default());
            }
            wtr.write_record(&row)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Render the table as delimited text.
    pub fn to_csv(&self, options: &ExportOptions) -> Result<String, VlozyError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer, options)?;
        String::from_utf8(buffer).map_err(|e| VlozyError::Config(e.to_string()))
    }

    /// Render the table as a pretty-printed JSON array; failed cells are `null`.
    pub fn to_json(&self, include_status: bool) -> Result<String, VlozyError> {
        let rows: Vec<JsonRow<'_>> = self
            .records
            .iter()
            .map(|record| JsonRow {
                columns: &self.columns,
                record,
                include_status,
            })
            .collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }
}

/// Serializes a record as an object whose keys follow column order.
struct JsonRow<'a> {
    columns: &'a [String],
    record: &'a ExtractionRecord,
    include_status: bool,
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for column in self.columns {
            let text = self.record.text(column);
            map.serialize_entry(column, &text)?;
        }
        map.serialize_entry(FILE_NAME_COLUMN, &self.record.file_name)?;
        if self.include_status {
            map.serialize_entry(STATUS_COLUMN, self.record.status.label())?;
            map.serialize_entry(ERROR_COLUMN, &self.record.error_summary())?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::Zone;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn failed(s: &str) -> FieldValue {
        FieldValue::Failed {
            reason: s.to_string(),
        }
    }

    fn sample() -> ExtractionTable {
        let mut table = ExtractionTable::new(vec!["invoice_no".into(), "total".into()]);
        table.push(ExtractionRecord::from_fields(
            "a.png",
            vec![
                ("invoice_no".into(), text("INV-1")),
                ("total".into(), text("1,234.50")),
            ],
        ));
        table.push(ExtractionRecord::from_fields(
            "b.png",
            vec![
                ("invoice_no".into(), text("INV-2")),
                ("total".into(), failed("engine unavailable")),
            ],
        ));
        table
    }

    #[test]
    fn test_status_derivation() {
        let table = sample();
        assert_eq!(table.records[0].status, RecordStatus::Complete);
        assert_eq!(table.records[1].status, RecordStatus::Partial);
        assert_eq!(
            table.records[1].error_summary().as_deref(),
            Some("total: engine unavailable")
        );
    }

    #[test]
    fn test_failed_record_keeps_shape() {
        let zones = ZoneSet::new(vec![
            Zone::new("a", 0, 0, 1, 1).unwrap(),
            Zone::new("b", 0, 0, 1, 1).unwrap(),
        ])
        .unwrap();
        let record = ExtractionRecord::failed("x.pdf", &zones, "PDF has no pages");

        assert_eq!(record.fields.len(), 2);
        assert!(record.fields.iter().all(|(_, v)| v.is_failed()));
        assert_eq!(record.status.label(), "failed");
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let csv = sample().to_csv(&ExportOptions::default()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "invoice_no,total,file_name");
        assert_eq!(lines[1], "INV-1,\"1,234.50\",a.png");
        assert_eq!(lines[2], "INV-2,#ERROR,b.png");
    }

    #[test]
    fn test_csv_with_status_columns() {
        let options = ExportOptions::default().with_status(true);
        let csv = sample().to_csv(&options).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "invoice_no,total,file_name,status,error");
        assert_eq!(lines[1], "INV-1,\"1,234.50\",a.png,ok,");
        assert_eq!(lines[2], "INV-2,#ERROR,b.png,partial,total: engine unavailable");
    }

    #[test]
    fn test_csv_custom_delimiter() {
        let options = ExportOptions {
            delimiter: ';',
            failure_marker: String::new(),
            include_status: false,
        };
        let csv = sample().to_csv(&options).unwrap();
        assert!(csv.starts_with("invoice_no;total;file_name\n"));
        assert!(csv.contains("INV-1;1,234.50;a.png"));
        assert!(csv.contains("INV-2;;b.png"));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let options = ExportOptions {
            delimiter: '§',
            ..ExportOptions::default()
        };
        assert!(matches!(sample().to_csv(&options), Err(VlozyError::Config(_))));
    }

    #[test]
    fn test_json_export() {
        let json = sample().to_json(false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            value,
            serde_json::json!([
                {"invoice_no": "INV-1", "total": "1,234.50", "file_name": "a.png"},
                {"invoice_no": "INV-2", "total": null, "file_name": "b.png"}
            ])
        );
        // Keys keep column order.
        let first = json.find("invoice_no").unwrap();
        assert!(first < json.find("total").unwrap());
        assert!(json.find("total").unwrap() < json.find("file_name").unwrap());
    }

    #[test]
    fn test_empty_table_exports_header_only() {
        let table = ExtractionTable::new(vec!["z".into()]);
        assert_eq!(table.to_csv(&ExportOptions::default()).unwrap(), "z,file_name\n");
        assert_eq!(table.to_json(false).unwrap(), "[]");
    }
}
