use std::{fs, path::Path};

use crate::pipeline::PipelineError;

/// An in-memory CSV table: a header row plus string cells.
///
/// Every report is assembled as a `CsvTable` and written in one go.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new<I>(headers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Index of the header whose trimmed name equals `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// The cell at `column` in `row`, if both exist.
    pub fn cell<'a>(&self, row: &'a [String], column: &str) -> Option<&'a str> {
        self.column(column).and_then(|i| row.get(i)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write to `path`, creating parent directories and replacing any
    /// existing file.
    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let sink_err = |e: csv::Error| PipelineError::Sink(format!("{}: {e}", path.display()));

        let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path).map_err(sink_err)?;
        wtr.write_record(&self.headers).map_err(sink_err)?;
        for row in &self.rows {
            wtr.write_record(row).map_err(sink_err)?;
        }
        wtr.flush()?;

        tracing::info!(path = %path.display(), rows = self.rows.len(), "wrote table");
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, PipelineError> {
        let source_err = |e: csv::Error| PipelineError::Source(format!("{}: {e}", path.display()));

        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(source_err)?;
        let headers = rdr.headers().map_err(source_err)?.iter().map(str::to_string).collect();
        let rows = rdr
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()
            .map_err(source_err)?;
        Ok(Self { headers, rows })
    }
}
