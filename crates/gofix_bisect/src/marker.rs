const PREFIX: &str = "[bisect-match ";
const HEX: &[u8; 16] = b"0123456789abcdef";

/// Returns the match marker for `id`: `[bisect-match 0x` followed by sixteen
/// lowercase hex digits and `]`.
pub fn marker(id: u64) -> String {
    let mut out = String::with_capacity(PREFIX.len() + 19);
    append_marker(&mut out, id);
    out
}

pub fn append_marker(dst: &mut String, id: u64) {
    dst.push_str(PREFIX);
    dst.push_str("0x");
    for shift in (0..16).rev() {
        let nibble = ((id >> (shift * 4)) & 0xf) as usize;
        dst.push(char::from(HEX[nibble]));
    }
    dst.push(']');
}

/// Finds the first marker in `line` and removes it, together with one
/// adjacent space (preferring the space before the marker).
///
/// The id may be written as `0x` plus up to sixteen hex digits, or as one to
/// sixty-four binary digits with an optional `0b` prefix. Returns `None` when the line holds no well-formed
/// marker.
pub fn cut_marker(line: &str) -> Option<(String, u64)> {
    let bytes = line.as_bytes();
    let start = line.find(PREFIX)?;
    let digits_start = start + PREFIX.len();
    let close = digits_start + line[digits_start..].find(']')?;
    let digits = &line[digits_start..close];

    let id = if let Some(hex) = digits.strip_prefix("0x")
        && !hex.is_empty()
    {
        if hex.len() > 16 {
            return None;
        }
        hex.bytes().fold(0_u64, |id, c| {
            let nibble = match c {
                b'0'..=b'9' => c - b'0',
                b'a'..=b'f' => c - b'a' + 10,
                b'A'..=b'F' => c - b'A' + 10,
                _ => 0,
            };
            (id << 4) | u64::from(nibble)
        })
    } else {
        let digits = digits.strip_prefix("0b").unwrap_or(digits);
        if digits.is_empty() || digits.len() > 64 {
            return None;
        }
        let mut id = 0_u64;
        for c in digits.bytes() {
            match c {
                b'0' | b'1' => id = (id << 1) | u64::from(c - b'0'),
                _ => return None,
            }
        }
        id
    };

    let mut cut_start = start;
    let mut cut_end = close + 1;
    if cut_start > 0 && bytes[cut_start - 1] == b' ' {
        cut_start -= 1;
    } else if bytes.get(cut_end) == Some(&b' ') {
        cut_end += 1;
    }
    let short = format!("{}{}", &line[..cut_start], &line[cut_end..]);
    Some((short, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_is_fixed_width_hex() {
        assert_eq!(marker(0x1), "[bisect-match 0x0000000000000001]");
        assert_eq!(marker(u64::MAX), "[bisect-match 0xffffffffffffffff]");
    }

    #[test]
    fn test_cut_marker_round_trips_hex() {
        let line = format!("inlined call {}", marker(0xabc));
        let (short, id) = cut_marker(&line).expect("marker");
        assert_eq!(short, "inlined call");
        assert_eq!(id, 0xabc);
    }

    #[test]
    fn test_cut_marker_binary_form() {
        let (short, id) = cut_marker("x [bisect-match 101] y").expect("marker");
        assert_eq!(id, 5);
        assert_eq!(short, "x y");

        let (short, id) = cut_marker("[bisect-match 0b101] y").expect("marker");
        assert_eq!(id, 0b101);
        assert_eq!(short, "y");
    }

    #[test]
    fn test_cut_marker_rejects_malformed() {
        assert!(cut_marker("no marker here").is_none());
        assert!(cut_marker("[bisect-match 0x12").is_none());
        assert!(cut_marker("[bisect-match 012]").is_none());
        assert!(cut_marker("[bisect-match ]").is_none());
        assert!(cut_marker("[bisect-match 0x00000000000000001]").is_none());
    }
}
