//! CSV import into typed columns.
//!
//! Header cells may carry a leaf type code after a slash (`nTracks/I`,
//! `accepted/O`); untyped headers default to `D` (f64).

use std::io::Read;
use std::path::Path;

use lcyield_core::schema::{ColumnType, TypeCode};
use lcyield_core::types::{Column, ColumnData, RowBatch, Value};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::record::RecordFileWriter;
use crate::storage::Storage;

fn parse_header(cell: &str) -> Result<(String, ColumnType)> {
    match cell.rsplit_once('/') {
        Some((name, code)) => match TypeCode::parse(code)? {
            TypeCode::Scalar(t) => Ok((name.trim().to_string(), t)),
            TypeCode::Array { .. } => Err(Error::Schema(format!(
                "array column '{name}' cannot be imported from CSV"
            ))),
        },
        None => Ok((cell.trim().to_string(), ColumnType::F64)),
    }
}

fn parse_cell(raw: &str, ty: ColumnType) -> Option<Value> {
    let s = raw.trim();
    Some(match ty {
        ColumnType::Bool => match s {
            "1" | "true" | "True" => Value::Bool(true),
            "0" | "false" | "False" => Value::Bool(false),
            _ => return None,
        },
        ColumnType::F32 | ColumnType::F64 => Value::F64(s.parse::<f64>().ok()?),
        ColumnType::U64 => Value::U64(s.parse::<u64>().ok()?),
        _ => Value::I64(s.parse::<i64>().ok()?),
    })
}

/// Read a whole CSV stream into a batch.
pub fn read_csv<R: Read>(reader: R) -> Result<RowBatch> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()?
        .iter()
        .map(parse_header)
        .collect::<Result<Vec<_>>>()?;

    let mut columns: Vec<ColumnData> = headers
        .iter()
        .map(|(_, ty)| ColumnData::with_capacity(*ty, 0))
        .collect();

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(Error::Csv(format!(
                "row {}: {} fields, expected {}",
                row + 1,
                record.len(),
                headers.len()
            )));
        }
        for (i, cell) in record.iter().enumerate() {
            let (name, ty) = &headers[i];
            let value = parse_cell(cell, *ty).ok_or_else(|| {
                Error::Csv(format!("row {}: cannot parse '{cell}' as {ty} for '{name}'", row + 1))
            })?;
            columns[i].push(value);
        }
    }

    Ok(RowBatch {
        columns: headers
            .into_iter()
            .zip(columns)
            .map(|((name, _), data)| Column::new(name, data))
            .collect(),
    })
}

/// Import `csv_path` and write it as a record file at `out_path`.
pub fn import_csv(
    csv_path: &Path,
    storage: &dyn Storage,
    out_path: &str,
    codec: Codec,
) -> Result<u64> {
    let file = std::fs::File::open(csv_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(csv_path.display().to_string())
        } else {
            Error::Storage(format!("open {}: {e}", csv_path.display()))
        }
    })?;
    let batch = read_csv(file)?;
    let mut writer = RecordFileWriter::new(codec);
    writer.add_batch(batch)?;
    let rows = writer.write(storage, out_path)?;
    tracing::info!(csv = %csv_path.display(), out = out_path, rows, "imported CSV");
    Ok(rows)
}
