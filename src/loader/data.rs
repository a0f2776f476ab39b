// Layer payload decoding: csv or base64 (optionally gzip/zlib compressed).
use crate::error::MapError;
use crate::gid::parse_raw_gid;
use crate::loader::xml::NodeExt;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};
use log::warn;
use roxmltree::Node;
use std::io::{self, Read};

/// Decode the `<data>` child of `element` into `width * height` raw tile ids.
pub(crate) fn decode_tile_ids(element: Node, width: usize, height: usize) -> Result<Vec<u32>, MapError> {
    let data = element
        .child("data")
        .ok_or_else(|| MapError::InvalidMap("tile layer without <data>".to_owned()))?;
    let encoding = data.attribute("encoding").ok_or(MapError::UnsupportedEncoding)?;
    let expected = width
        .checked_mul(height)
        .ok_or_else(|| MapError::InvalidMap(format!("tile layer of {width}x{height} cells is too large")))?;

    match encoding {
        "csv" => decode_csv(data.text_or_empty(), expected),
        "base64" => {
            let bytes = decode_base64(data.text_or_empty())?;
            // Compressed payloads may grow past this; the vec reallocates as ids arrive.
            let hint = expected.min(bytes.len() / 4);
            match data.attribute("compression") {
                None => read_ids(&bytes[..], expected, hint),
                Some("gzip") => read_ids(GzDecoder::new(&bytes[..]), expected, hint),
                Some("zlib") => read_ids(ZlibDecoder::new(&bytes[..]), expected, hint),
                Some(other) => Err(MapError::UnrecognizedCompression(other.to_owned())),
            }
        }
        other => Err(MapError::UnrecognizedEncoding(other.to_owned())),
    }
}

fn decode_csv(text: &str, expected: usize) -> Result<Vec<u32>, MapError> {
    // Every id takes at least two bytes ("1,"), so the text bounds the allocation.
    let mut ids = Vec::with_capacity(expected.min(text.len() / 2 + 1));
    for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let id = parse_raw_gid(token)
            .ok_or_else(|| MapError::InvalidTileData(format!("'{token}' is not a tile id")))?;
        ids.push(id);
    }
    if ids.len() < expected {
        return Err(MapError::TruncatedTileData {
            expected,
            found: ids.len(),
        });
    }
    if ids.len() > expected {
        warn!("csv tile data has {} ids, layer needs {}; ignoring the rest", ids.len(), expected);
        ids.truncate(expected);
    }
    Ok(ids)
}

fn decode_base64(text: &str) -> Result<Vec<u8>, MapError> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(cleaned)?)
}

// The reader is consumed here, so any decompressor is dropped on every return path.
fn read_ids<R: Read>(mut reader: R, expected: usize, capacity: usize) -> Result<Vec<u32>, MapError> {
    let mut ids = Vec::with_capacity(capacity);
    let mut word = [0u8; 4];
    while ids.len() < expected {
        match reader.read_exact(&mut word) {
            Ok(()) => ids.push(u32::from_le_bytes(word)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(MapError::TruncatedTileData {
                    expected,
                    found: ids.len(),
                })
            }
            Err(source) => return Err(MapError::TileDataIo { source }),
        }
    }
    Ok(ids)
}
