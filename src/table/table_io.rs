//! # Master table CSV I/O
//!
//! The master table is a **headerless** CSV with the ten [`TableRow`] columns. The
//! writer formats numbers through [`TableRow::to_fields`]; the reader deserializes by
//! column position.
use std::io::{Read, Write};

use camino::Utf8Path;
use log::info;

use crate::{pipeline_errors::PipelineError, table::TableRow};

/// Write `rows` as headerless CSV to any writer.
pub fn write_rows<W: Write>(writer: W, rows: &[TableRow]) -> Result<(), PipelineError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    for row in rows {
        wtr.write_record(row.to_fields())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the master table to `path`, replacing any previous file.
pub fn write_table(path: &Utf8Path, rows: &[TableRow]) -> Result<(), PipelineError> {
    let file = std::fs::File::create(path)?;
    write_rows(std::io::BufWriter::new(file), rows)?;
    info!("Wrote {} rows to {path}", rows.len());
    Ok(())
}

/// Read headerless table rows from any reader.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<TableRow>, PipelineError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);

    rdr.deserialize()
        .map(|record| record.map_err(PipelineError::from))
        .collect()
}

/// Read the master table back from `path`.
pub fn read_table(path: &Utf8Path) -> Result<Vec<TableRow>, PipelineError> {
    let file = std::fs::File::open(path).map_err(|source| PipelineError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;
    read_rows(std::io::BufReader::new(file))
}
