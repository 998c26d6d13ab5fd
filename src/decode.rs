//! Decoding of layer tile grids: CSV, base64 and base64 + gzip/zlib.

use crate::error::TileDataError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;

/// Decode an encoded `<data>` payload into `width * height` raw gids.
pub fn decode_tile_data(
    encoding: &str,
    compression: Option<&str>,
    payload: &str,
    width: usize,
    height: usize,
) -> Result<Vec<u32>, TileDataError> {
    let expected = grid_len(width, height)?;
    match encoding {
        "csv" => decode_csv(payload, expected),
        "base64" => {
            let needed = expected
                .checked_mul(4)
                .ok_or(TileDataError::TooLarge { width, height })?;
            let bytes = decode_base64(payload)?;
            let bytes = decompress(bytes, compression)?;
            gids_from_le_bytes(&bytes, needed)
        }
        other => Err(TileDataError::UnsupportedEncoding(other.to_owned())),
    }
}

/// Validate a plain gid array (TMJ `data` arrays, TMX `<tile>` lists).
pub fn decode_gid_array(gids: Vec<u32>, width: usize, height: usize) -> Result<Vec<u32>, TileDataError> {
    let expected = grid_len(width, height)?;
    if gids.len() != expected {
        return Err(TileDataError::SizeMismatch {
            expected,
            found: gids.len(),
        });
    }
    Ok(gids)
}

fn grid_len(width: usize, height: usize) -> Result<usize, TileDataError> {
    width
        .checked_mul(height)
        .ok_or(TileDataError::TooLarge { width, height })
}

fn decode_csv(payload: &str, expected: usize) -> Result<Vec<u32>, TileDataError> {
    let gids = payload
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|_| TileDataError::InvalidCsvValue(token.to_owned()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if gids.len() != expected {
        return Err(TileDataError::SizeMismatch {
            expected,
            found: gids.len(),
        });
    }
    Ok(gids)
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, TileDataError> {
    // TMX wraps the payload across lines
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

fn decompress(bytes: Vec<u8>, compression: Option<&str>) -> Result<Vec<u8>, TileDataError> {
    let mut out = Vec::with_capacity(bytes.len() * 4);
    match compression {
        None | Some("") => return Ok(bytes),
        Some("gzip") => GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut out)
            .map_err(TileDataError::Decompress)?,
        Some("zlib") => ZlibDecoder::new(bytes.as_slice())
            .read_to_end(&mut out)
            .map_err(TileDataError::Decompress)?,
        Some(other) => return Err(TileDataError::UnsupportedCompression(other.to_owned())),
    };
    Ok(out)
}

/// `needed` is the byte length of the grid, four bytes per gid.
fn gids_from_le_bytes(bytes: &[u8], needed: usize) -> Result<Vec<u32>, TileDataError> {
    if bytes.len() < needed {
        return Err(TileDataError::PrematureEnd {
            expected: needed,
            found: bytes.len(),
        });
    }
    Ok(bytes[..needed]
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gid::FLIP_H;

    const EXPECTED: [u32; 4] = [1, 2, 3 | FLIP_H, 4];

    #[test]
    fn decodes_csv_with_newlines() {
        let ids = decode_tile_data("csv", None, "\n1,2,\n2147483651,4\n", 2, 2).unwrap();
        assert_eq!(ids, EXPECTED);
    }

    #[test]
    fn csv_count_must_match_layer_size() {
        let err = decode_tile_data("csv", None, "1,2,3", 2, 2).unwrap_err();
        assert!(matches!(err, TileDataError::SizeMismatch { expected: 4, found: 3 }));
    }

    #[test]
    fn oversized_layers_are_rejected_before_decoding() {
        let err = decode_tile_data("csv", None, "1", usize::MAX, 2).unwrap_err();
        assert!(matches!(err, TileDataError::TooLarge { width: usize::MAX, height: 2 }));

        let err = decode_tile_data("base64", None, "AQAAAA==", usize::MAX / 2, 1).unwrap_err();
        assert!(matches!(err, TileDataError::TooLarge { .. }));

        let err = decode_gid_array(vec![1], usize::MAX, 3).unwrap_err();
        assert!(matches!(err, TileDataError::TooLarge { .. }));
    }

    #[test]
    fn csv_rejects_garbage() {
        let err = decode_tile_data("csv", None, "1,x,3,4", 2, 2).unwrap_err();
        assert!(matches!(err, TileDataError::InvalidCsvValue(t) if t == "x"));
    }

    #[test]
    fn decodes_uncompressed_base64() {
        let ids = decode_tile_data("base64", None, "AQAAAAIAAAADAACABAAAAA==", 2, 2).unwrap();
        assert_eq!(ids, EXPECTED);
        let ids = decode_tile_data("base64", Some(""), "  AQAAAAIAAAAD\n  AACABAAAAA==  ", 2, 2).unwrap();
        assert_eq!(ids, EXPECTED);
    }

    #[test]
    fn decodes_gzip_and_zlib() {
        let gz = decode_tile_data("base64", Some("gzip"), "H4sIAAAAAAACA2NkYGBgAmJmBoYGFiANAH1k4x4QAAAA", 2, 2).unwrap();
        assert_eq!(gz, EXPECTED);
        let zl = decode_tile_data("base64", Some("zlib"), "eJxjZGBgYAJiZgaGBhYgDQAC4ACL", 2, 2).unwrap();
        assert_eq!(zl, EXPECTED);
    }

    #[test]
    fn short_stream_is_premature_end() {
        let err = decode_tile_data("base64", None, "AQAAAAIAAAADAACA", 2, 2).unwrap_err();
        assert!(matches!(err, TileDataError::PrematureEnd { expected: 16, found: 12 }));
    }

    #[test]
    fn unknown_encoding_and_compression_are_rejected() {
        assert!(matches!(
            decode_tile_data("xml", None, "", 1, 1),
            Err(TileDataError::UnsupportedEncoding(e)) if e == "xml"
        ));
        assert!(matches!(
            decode_tile_data("base64", Some("zstd"), "AQAAAA==", 1, 1),
            Err(TileDataError::UnsupportedCompression(c)) if c == "zstd"
        ));
    }

    #[test]
    fn corrupt_gzip_reports_decompression_error() {
        let err = decode_tile_data("base64", Some("gzip"), "AQAAAAIAAAADAACABAAAAA==", 2, 2).unwrap_err();
        assert!(matches!(err, TileDataError::Decompress(_)));
    }
}
