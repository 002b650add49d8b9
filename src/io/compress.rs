//! Per-row compression. A compressed row is a single zstd frame followed by
//! padding, so the frame length is recovered from the frame itself.

use crate::core::FwError;

pub fn compress_row(row: &[u8], level: i32) -> Result<Vec<u8>, FwError> {
    zstd::bulk::compress(row, level)
        .map_err(|e| FwError::CompressionError(format!("compressing row: {e}")))
}

/// Decompress the frame at the start of `padded`, ignoring trailing padding.
/// `capacity` is the uncompressed row width.
pub fn decompress_row(padded: &[u8], capacity: usize) -> Result<Vec<u8>, FwError> {
    let frame_len = zstd::zstd_safe::find_frame_compressed_size(padded).map_err(|code| {
        FwError::CompressionError(format!(
            "locating row frame: {}",
            zstd::zstd_safe::get_error_name(code)
        ))
    })?;
    zstd::bulk::decompress(&padded[..frame_len], capacity)
        .map_err(|e| FwError::CompressionError(format!("decompressing row: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_frame_decompresses() {
        let row = b"12345 hello   world   3.25  ".to_vec();
        let mut stored = compress_row(&row, 3).unwrap();
        stored.extend_from_slice(&[b' '; 17]);
        assert_eq!(decompress_row(&stored, row.len()).unwrap(), row);
    }

    #[test]
    fn test_garbage_is_an_error() {
        let err = decompress_row(b"not a frame at all", 64).unwrap_err();
        assert!(matches!(err, FwError::CompressionError(_)));
    }
}
