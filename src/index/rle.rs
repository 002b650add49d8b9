//! Run-length encoding for ascending row-number lists: comma-separated runs,
//! `start` for a single row and `start:count` for consecutive rows.

use crate::core::FwError;

pub fn encode(rows: &[usize]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < rows.len() {
        let start = rows[i];
        let mut count = 1;
        while i + count < rows.len() && rows[i + count] == start + count {
            count += 1;
        }
        if !out.is_empty() {
            out.push(',');
        }
        out.push_str(&start.to_string());
        if count > 1 {
            out.push(':');
            out.push_str(&count.to_string());
        }
        i += count;
    }
    out
}

pub fn decode_into(encoded: &[u8], out: &mut Vec<usize>) -> Result<(), FwError> {
    let text = std::str::from_utf8(encoded)
        .map_err(|_| FwError::InvariantViolation("row list is not valid UTF-8".into()))?;
    for run in text.split(',').filter(|r| !r.is_empty()) {
        let (start, count) = match run.split_once(':') {
            Some((start, count)) => (parse(start)?, parse(count)?),
            None => (parse(run)?, 1),
        };
        out.extend(start..start + count);
    }
    Ok(())
}

fn parse(n: &str) -> Result<usize, FwError> {
    n.parse()
        .map_err(|_| FwError::InvariantViolation(format!("bad row list entry '{n}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_runs() {
        assert_eq!(encode(&[0, 1, 2, 5, 7, 8]), "0:3,5,7:2");
        assert_eq!(encode(&[4]), "4");
        assert_eq!(encode(&[]), "");
        assert_eq!(encode(&[10, 11, 40]), "10:2,40");
    }

    #[test]
    fn test_decode() {
        let mut out = Vec::new();
        decode_into(b"0:3,5,7:2", &mut out).unwrap();
        assert_eq!(out, vec![0, 1, 2, 5, 7, 8]);
        assert!(decode_into(b"1,x", &mut out).is_err());
    }
}
