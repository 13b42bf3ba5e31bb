//! Streaming codec for gzip JSON-Lines data files
//!
//! Every data file is gzip-compressed UTF-8 text with one JSON record per
//! line, each record wrapping the item under the fixed `"Item"` key. A single
//! file is decoded eagerly (full decompress, then split); the cross-file
//! sequence exposed by [`ItemReader`] is lazy, finite, single-pass and
//! non-restartable — re-iterating means re-resolving the manifest.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{Map, Value};
use std::io::{Read, Write};
use tracing::{debug, warn};

use crate::client::ObjectStore;
use crate::convert;
use crate::error::{Result, TransferError};
use crate::export::ExportFormat;
use crate::manifest::DataFileRef;

/// Fixed key every data file line wraps its item under.
pub const ITEM_KEY: &str = "Item";

/// Decompress gzip-compressed data.
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    debug!("Decompressed {} -> {} bytes", data.len(), decompressed.len());
    Ok(decompressed)
}

/// Gzip-compress data.
pub fn compress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Records decoded from one data file, plus the count of lines the lenient
/// native decoder discarded.
#[derive(Debug, Clone)]
pub struct DecodedFile {
    pub items: Vec<Map<String, Value>>,
    pub skipped_lines: u64,
}

/// Decode one gzip data file according to the job's declared encoding.
///
/// The two encodings are mutually exclusive per job; the match here and in
/// [`encode_wire_tagged`] are the only two places the codec branches on it.
pub fn decode_data_file(data: &[u8], format: ExportFormat) -> Result<DecodedFile> {
    match format {
        ExportFormat::DynamodbJson => decode_wire_tagged(data),
        ExportFormat::Ion => decode_native(data),
    }
}

/// Decode a wire-tagged (self-describing) data file.
///
/// Strict: every line must be a JSON object keyed by `"Item"` whose payload is
/// a mapping.
pub fn decode_wire_tagged(data: &[u8]) -> Result<DecodedFile> {
    let text = decoded_text(data)?;
    let mut items = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)?;
        items.push(unwrap_item(&value).ok_or_else(|| {
            TransferError::MalformedRecord(format!(
                "line {} is not an object wrapping '{}'",
                idx + 1,
                ITEM_KEY
            ))
        })?);
    }
    Ok(DecodedFile {
        items,
        skipped_lines: 0,
    })
}

/// Decode a native-mapping data file.
///
/// Lenient on a per-line basis: a line whose top-level value, or whose item
/// payload, fails to coerce into a mapping is skipped rather than surfaced.
/// Skipped lines are counted and logged so callers can observe discarded
/// data. JSON syntax errors still fail the decode; an object missing the
/// `"Item"` key is still an error.
pub fn decode_native(data: &[u8]) -> Result<DecodedFile> {
    let text = decoded_text(data)?;
    let mut items = Vec::new();
    let mut skipped = 0u64;
    for (idx, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)?;
        let Value::Object(ref wrapper) = value else {
            skipped += 1;
            continue;
        };
        let payload = wrapper.get(ITEM_KEY).ok_or_else(|| {
            TransferError::MalformedRecord(format!(
                "line {} has no '{}' key",
                idx + 1,
                ITEM_KEY
            ))
        })?;
        match payload {
            Value::Object(item) => items.push(item.clone()),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, "discarded data file lines that did not decode to a mapping");
    }
    Ok(DecodedFile {
        items,
        skipped_lines: skipped,
    })
}

/// Encode native records as a wire-tagged gzip data file suitable for import:
/// one `{"Item": <tagged>}` line per record, trailing newline included.
pub fn encode_wire_tagged(records: &[Value]) -> Result<Vec<u8>> {
    let mut text = String::new();
    for record in records {
        let tagged = convert::record_to_wire_tagged(record)?;
        let mut line = Map::with_capacity(1);
        line.insert(ITEM_KEY.to_string(), Value::Object(tagged));
        text.push_str(&serde_json::to_string(&Value::Object(line))?);
        text.push('\n');
    }
    compress_gzip(text.as_bytes())
}

fn decoded_text(data: &[u8]) -> Result<String> {
    let bytes = decompress_gzip(data)?;
    String::from_utf8(bytes)
        .map_err(|e| TransferError::MalformedRecord(format!("data file is not UTF-8: {}", e)))
}

fn unwrap_item(value: &Value) -> Option<Map<String, Value>> {
    match value.get(ITEM_KEY) {
        Some(Value::Object(item)) => Some(item.clone()),
        _ => None,
    }
}

/// Lazy, single-pass iterator over every item of an export, flattening the
/// data files referenced by the per-file manifest in listed order.
///
/// Each file is fetched and fully decoded only when iteration reaches it.
/// The sequence is not restartable; resolve the manifest again to re-read.
pub struct ItemReader<'a> {
    store: &'a dyn ObjectStore,
    files: std::vec::IntoIter<DataFileRef>,
    buffer: std::vec::IntoIter<Map<String, Value>>,
    skipped_lines: u64,
}

impl<'a> ItemReader<'a> {
    pub fn new(store: &'a dyn ObjectStore, files: Vec<DataFileRef>) -> Self {
        Self {
            store,
            files: files.into_iter(),
            buffer: Vec::new().into_iter(),
            skipped_lines: 0,
        }
    }

    /// Yield the next item, fetching and decoding the next data file when the
    /// current one is exhausted. `Ok(None)` marks the end of the sequence.
    pub async fn next_item(&mut self) -> Result<Option<Map<String, Value>>> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Ok(Some(item));
            }
            let Some(file) = self.files.next() else {
                return Ok(None);
            };
            debug!(bucket = %file.bucket, key = %file.key, "fetching data file");
            let data = self.store.get_object(&file.bucket, &file.key).await?;
            let decoded = decode_data_file(&data, file.format)?;
            self.skipped_lines += decoded.skipped_lines;
            self.buffer = decoded.items.into_iter();
        }
    }

    /// Drain the remaining sequence into memory.
    pub async fn collect_remaining(mut self) -> Result<Vec<Map<String, Value>>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Lines the lenient native decoder has discarded so far.
    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gzip_lines(lines: &[&str]) -> Vec<u8> {
        let mut text = lines.join("\n");
        text.push('\n');
        compress_gzip(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_gzip_round_trip() {
        let original = b"hello, data files";
        let compressed = compress_gzip(original).unwrap();
        assert_eq!(decompress_gzip(&compressed).unwrap(), original);
    }

    #[test]
    fn test_decompress_invalid_gzip() {
        assert!(decompress_gzip(b"not gzip data").is_err());
    }

    #[test]
    fn test_decode_wire_tagged() {
        let data = gzip_lines(&[
            r#"{"Item":{"pk":{"S":"a"},"n":{"N":"1"}}}"#,
            r#"{"Item":{"pk":{"S":"b"},"n":{"N":"2"}}}"#,
        ]);
        let decoded = decode_wire_tagged(&data).unwrap();
        assert_eq!(decoded.items.len(), 2);
        assert_eq!(decoded.skipped_lines, 0);
        assert_eq!(decoded.items[0]["pk"], json!({"S": "a"}));
    }

    #[test]
    fn test_decode_wire_tagged_rejects_unwrapped_line() {
        let data = gzip_lines(&[r#"{"pk":{"S":"a"}}"#]);
        assert!(matches!(
            decode_wire_tagged(&data).unwrap_err(),
            TransferError::MalformedRecord(_)
        ));
    }

    #[test]
    fn test_decode_native_skips_scalar_payloads() {
        // One well-formed record and one scalar payload: exactly one record,
        // not two and not an error.
        let data = gzip_lines(&[r#"{"Item":{"id":1,"name":"Alice"}}"#, r#"{"Item":5}"#]);
        let decoded = decode_native(&data).unwrap();
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.skipped_lines, 1);
        assert_eq!(decoded.items[0]["name"], json!("Alice"));
    }

    #[test]
    fn test_decode_native_skips_non_object_lines() {
        let data = gzip_lines(&[r#"[1,2,3]"#, r#"{"Item":{"id":1}}"#]);
        let decoded = decode_native(&data).unwrap();
        assert_eq!(decoded.items.len(), 1);
        assert_eq!(decoded.skipped_lines, 1);
    }

    #[test]
    fn test_decode_native_propagates_syntax_errors() {
        let data = gzip_lines(&[r#"{"Item":{"id":1}}"#, "{broken"]);
        assert!(matches!(
            decode_native(&data).unwrap_err(),
            TransferError::Json(_)
        ));
    }

    #[test]
    fn test_encode_wire_tagged() {
        let records = vec![json!({"id": 1, "name": "Alice"})];
        let encoded = encode_wire_tagged(&records).unwrap();
        let text = String::from_utf8(decompress_gzip(&encoded).unwrap()).unwrap();

        assert!(text.ends_with('\n'));
        let line: Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(line["Item"]["id"], json!({"N": "1"}));
        assert_eq!(line["Item"]["name"], json!({"S": "Alice"}));
    }

    #[test]
    fn test_encode_then_decode() {
        let records = vec![json!({"id": 7}), json!({"id": 8})];
        let encoded = encode_wire_tagged(&records).unwrap();
        let decoded = decode_wire_tagged(&encoded).unwrap();
        assert_eq!(decoded.items.len(), 2);
        assert_eq!(decoded.items[1]["id"], json!({"N": "8"}));
    }
}
