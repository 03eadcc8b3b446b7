//! Positional mapping of message payloads into fixed-width CSV records.

/// Column names of the message log, in emission order. The last column is
/// always the topic; the rest are filled positionally from the payload.
pub const FIELDS: [&str; 23] = [
    "BMCODE",
    "Temperature",
    "Pressure",
    "Volume",
    "Level",
    "Generator",
    "Grid",
    "Aggregate",
    "Compressor1",
    "Compressor2",
    "CIP",
    "VoltageU",
    "VoltageV",
    "VoltageW",
    "CurrentU",
    "CurrentV",
    "CurrentW",
    "Frequency",
    "PwrF",
    "TPwr",
    "Time",
    "Date",
    "Topic",
];

/// Columns taken from the payload; the final column holds the topic.
const PAYLOAD_FIELDS: usize = FIELDS.len() - 1;

/// The CSV header row, written once when the message log is created.
pub fn csv_header() -> String {
    FIELDS.join(",")
}

/// One row of the message log.
///
/// Built from a comma-delimited payload: tokens 0..=21 fill the first 22
/// columns, absent positions stay empty, extra tokens are ignored, and the
/// topic lands verbatim in the last column. Mapping never fails; short or
/// malformed payloads surface as blank cells rather than dropped rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    fields: Vec<String>,
}

impl MessageRecord {
    pub fn new(topic: &str, payload: &str) -> Self {
        let mut fields = Vec::with_capacity(FIELDS.len());
        let mut tokens = payload.split(',');
        for _ in 0..PAYLOAD_FIELDS {
            fields.push(tokens.next().unwrap_or("").to_owned());
        }
        fields.push(topic.to_owned());
        Self { fields }
    }

    #[inline]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Render as one CSV row. Values are joined as-is, without quoting or
    /// escaping: a value that itself contains a comma shifts the columns of
    /// its row. Kept compatible with the historical log format.
    #[inline]
    pub fn to_csv_row(&self) -> String {
        self.fields.join(",")
    }
}
