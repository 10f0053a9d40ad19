//! Record sinks for the command line host

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::esco::OutputRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// Header row followed by one row per record
    Csv,
}

enum Sink {
    Jsonl(BufWriter<Box<dyn Write + Send>>),
    Csv(csv::Writer<Box<dyn Write + Send>>),
}

/// Serializes records in the chosen format
pub struct RecordWriter {
    sink: Sink,
    written: u64,
}

impl RecordWriter {
    /// Wrap `out`; CSV output gets its header immediately
    pub fn new(format: OutputFormat, out: Box<dyn Write + Send>) -> Result<Self> {
        let sink = match format {
            OutputFormat::Jsonl => Sink::Jsonl(BufWriter::new(out)),
            OutputFormat::Csv => {
                let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
                writer.write_record(OutputRecord::COLUMNS)?;
                Sink::Csv(writer)
            },
        };

        Ok(Self { sink, written: 0 })
    }

    pub fn stdout(format: OutputFormat) -> Result<Self> {
        Self::new(format, Box::new(io::stdout()))
    }

    pub fn create(format: OutputFormat, path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::new(format, Box::new(File::create(path)?))
    }

    pub fn write(&mut self, record: &OutputRecord) -> Result<()> {
        match &mut self.sink {
            Sink::Jsonl(out) => {
                serde_json::to_writer(&mut *out, record)?;
                out.write_all(b"\n")?;
            },
            Sink::Csv(writer) => writer.serialize(record)?,
        }

        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush buffered output
    pub fn finish(self) -> Result<u64> {
        match self.sink {
            Sink::Jsonl(mut out) => out.flush()?,
            Sink::Csv(mut writer) => writer.flush()?,
        }
        Ok(self.written)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(uri: &str) -> OutputRecord {
        OutputRecord {
            uri: uri.to_string(),
            title: "manage budgets".to_string(),
            alternative_label_en: "a | b".to_string(),
            selected_version: "v1.2.0".to_string(),
            ..OutputRecord::default()
        }
    }

    #[test]
    fn test_jsonl_one_object_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skills.jsonl");

        let mut writer = RecordWriter::create(OutputFormat::Jsonl, &path).unwrap();
        writer.write(&record("http://x/a")).unwrap();
        writer.write(&record("http://x/b")).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(value["uri"], "http://x/b");
        assert_eq!(value["alternativeLabel_en"], "a | b");
        assert_eq!(value["selectedVersion"], "v1.2.0");
    }

    #[test]
    fn test_csv_header_even_without_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skills.csv");

        RecordWriter::create(OutputFormat::Csv, &path).unwrap().finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), OutputRecord::COLUMNS.join(","));
    }

    #[test]
    fn test_csv_rows_follow_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skills.csv");

        let mut writer = RecordWriter::create(OutputFormat::Csv, &path).unwrap();
        writer.write(&record("http://x/a")).unwrap();
        writer.finish().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<OutputRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![record("http://x/a")]);
    }
}
