//! Fixed-width encoding shared by data rows and every sidecar map.
//!
//! A map is a block of entries, each right-padded with spaces to the same
//! width and terminated by `\n`, so entry `i` starts at `i * (width + 1)`.

use crate::core::FwError;

pub(crate) const PAD: u8 = b' ';
pub(crate) const NEWLINE: u8 = b'\n';

/// Right-pad `value` with spaces to exactly `width` bytes.
pub fn pad(value: &[u8], width: usize) -> Result<Vec<u8>, FwError> {
    let mut buf = Vec::with_capacity(width);
    pad_into(&mut buf, value, width)?;
    Ok(buf)
}

/// Append `value` padded to `width` onto `buf`.
pub fn pad_into(buf: &mut Vec<u8>, value: &[u8], width: usize) -> Result<(), FwError> {
    if value.len() > width {
        return Err(FwError::InvariantViolation(format!(
            "value of {} bytes exceeds declared width {}",
            value.len(),
            width
        )));
    }
    buf.extend_from_slice(value);
    buf.resize(buf.len() + width - value.len(), PAD);
    Ok(())
}

/// Cumulative start offsets for `sizes`, plus a final entry equal to the total.
pub fn offsets(sizes: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(sizes.len() + 1);
    let mut pos = 0;
    out.push(pos);
    for size in sizes {
        pos += size;
        out.push(pos);
    }
    out
}

/// Encode `values` as a fixed-width map. Returns the block and the entry width.
pub fn build_map<T: AsRef<[u8]>>(values: &[T]) -> Result<(Vec<u8>, usize), FwError> {
    let width = values.iter().map(|v| v.as_ref().len()).max().unwrap_or(0);
    let mut buf = Vec::with_capacity(values.len() * (width + 1));
    for value in values {
        pad_into(&mut buf, value.as_ref(), width)?;
        buf.push(NEWLINE);
    }
    Ok((buf, width))
}

/// Strip padding from the right of a decoded slice.
pub fn trim(value: &[u8]) -> &[u8] {
    let end = value
        .iter()
        .rposition(|b| *b != PAD)
        .map(|p| p + 1)
        .unwrap_or(0);
    &value[..end]
}

/// Entry `index` of a map block with the given entry width, padding removed.
pub fn map_entry(block: &[u8], width: usize, index: usize) -> Result<&[u8], FwError> {
    let start = index * (width + 1);
    let end = start + width;
    if end > block.len() {
        return Err(FwError::InvariantViolation(format!(
            "map entry {index} (width {width}) beyond map of {} bytes",
            block.len()
        )));
    }
    Ok(trim(&block[start..end]))
}

/// Parse an unsigned decimal integer from a trimmed field.
pub fn parse_usize(value: &[u8]) -> Result<usize, FwError> {
    std::str::from_utf8(value)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| {
            FwError::InvariantViolation(format!(
                "expected an unsigned integer, found {:?}",
                String::from_utf8_lossy(value)
            ))
        })
}
