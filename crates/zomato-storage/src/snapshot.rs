//! Collection snapshots on disk: a JSON array or newline-delimited JSON,
//! optionally zstd-compressed (`.zst`).

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use zomato_core::{Document, ExplorerError, Result};

fn data_error(path: &Path, e: impl std::fmt::Display) -> ExplorerError {
    ExplorerError::Data(format!("{}: {e}", path.display()))
}

fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    let fh = File::open(path).map_err(|e| data_error(path, e))?;
    if path.extension().is_some_and(|ext| ext == "zst") {
        let dec = zstd::Decoder::new(fh).map_err(|e| data_error(path, e))?;
        Ok(Box::new(BufReader::new(dec)))
    } else {
        Ok(Box::new(BufReader::new(fh)))
    }
}

/// Reads every document in `path`. Entries that are not JSON objects and
/// unparseable lines are skipped with a warning.
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let mut reader = open(path)?;
    let head = reader.fill_buf().map_err(|e| data_error(path, e))?;
    let is_array = head
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'[');

    let docs = if is_array {
        let mut body = String::new();
        reader
            .read_to_string(&mut body)
            .map_err(|e| data_error(path, e))?;
        let values: Vec<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| data_error(path, e))?;
        values
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| match v {
                serde_json::Value::Object(map) => Some(map),
                _ => {
                    tracing::warn!(path = %path.display(), index = i, "skipping non-object entry");
                    None
                }
            })
            .collect()
    } else {
        read_lines(path, reader)?
    };
    tracing::info!(path = %path.display(), documents = docs.len(), "loaded data file");
    Ok(docs)
}

fn read_lines(path: &Path, reader: Box<dyn BufRead>) -> Result<Vec<Document>> {
    let mut out = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| data_error(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(serde_json::Value::Object(map)) => out.push(map),
            Ok(_) => tracing::warn!(path = %path.display(), line = n + 1, "skipping non-object line"),
            Err(e) => tracing::warn!(path = %path.display(), line = n + 1, error = %e, "skipping bad line"),
        }
    }
    Ok(out)
}
