//! Printing of search results.

use std::io::{self, Write};

use crate::api::data::Record;

/// Pretty-print `record` as JSON with two spaces indentation.
pub fn format_record(record: &Record) -> serde_json::Result<String> {
    serde_json::to_string_pretty(record)
}

/// Write every record to `writer`, one pretty-printed JSON object after another,
/// in the order they were returned.
pub fn show_records<'a, W: Write>(
    records: impl IntoIterator<Item = &'a Record>,
    mut writer: W,
) -> io::Result<()> {
    for record in records {
        let formatted = format_record(record)?;
        writeln!(writer, "{formatted}")?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_format_record() -> anyhow::Result<()> {
        let record: Record = serde_json::from_value(json!({"name": "cat", "count": 3}))?;
        assert_eq!(
            format_record(&record)?,
            "{\n  \"count\": 3,\n  \"name\": \"cat\"\n}"
        );
        Ok(())
    }

    #[test]
    fn test_show_records() -> anyhow::Result<()> {
        let records: Vec<Record> =
            serde_json::from_value(json!([{"id": 1}, {"id": 2, "tags": "a b"}]))?;

        let mut out = Vec::new();
        show_records(&records, &mut out)?;
        assert_eq!(
            String::from_utf8(out)?,
            "{\n  \"id\": 1\n}\n{\n  \"id\": 2,\n  \"tags\": \"a b\"\n}\n"
        );
        Ok(())
    }
}
