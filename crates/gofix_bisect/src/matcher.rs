use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("invalid pattern syntax: {0}")]
    Syntax(String),
    #[error("invalid pattern syntax (+ after -): {0}")]
    PlusAfterMinus(String),
    #[error("pattern bits too long: {0}")]
    TooLong(String),
}

/// One `(mask, bits, result)` term of a compiled pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cond {
    mask: u64,
    bits: u64,
    result: bool,
}

/// A compiled bisect pattern.
///
/// Conditions are consulted from last to first, so later terms override
/// earlier ones. `enable` records the polarity of the list: when false the
/// listed ids are the ones to disable (and report).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    verbose: bool,
    enable: bool,
    list: Vec<Cond>,
}

impl Matcher {
    /// Compiles a pattern.
    ///
    /// An empty pattern yields `Ok(None)`, meaning no bisection is in effect:
    /// every change is enabled and none is reported.
    pub fn new(pattern: &str) -> Result<Option<Self>, PatternError> {
        if pattern.is_empty() {
            return Ok(None);
        }
        let syntax = || PatternError::Syntax(pattern.to_string());

        let mut matcher = Self {
            verbose: false,
            enable: true,
            list: Vec::new(),
        };
        let mut p = pattern.as_bytes();
        while let [b'v', rest @ ..] = p {
            matcher.verbose = true;
            p = rest;
            if p.is_empty() {
                return Err(syntax());
            }
        }
        while let [b'!', rest @ ..] = p {
            matcher.enable = !matcher.enable;
            p = rest;
            if p.is_empty() {
                return Err(syntax());
            }
        }
        if p == b"n" {
            matcher.enable = !matcher.enable;
            p = b"y";
        }

        let mut result = true;
        let mut bits = 0_u64;
        let mut start = 0_usize;
        // Bits per digit: 1 for binary terms, 4 after a leading 'x'.
        let mut width = 1_usize;
        for i in 0..=p.len() {
            // A virtual '-' terminates the final term.
            let c = p.get(i).copied().unwrap_or(b'-');
            if i == start && width == 1 && c == b'x' {
                start = i + 1;
                width = 4;
                continue;
            }
            match c {
                b'0' | b'1' => {
                    bits = (bits << width) | u64::from(c - b'0');
                }
                b'2'..=b'9' if width == 4 => {
                    bits = (bits << 4) | u64::from(c - b'0');
                }
                b'a'..=b'f' | b'A'..=b'F' if width == 4 => {
                    bits = (bits << 4) | u64::from((c & !0x20) - b'A' + 10);
                }
                b'y' => {
                    if matches!(p.get(i + 1), Some(b'0' | b'1')) {
                        return Err(syntax());
                    }
                    bits = 0;
                }
                b'+' | b'-' => {
                    if c == b'+' && !result {
                        return Err(PatternError::PlusAfterMinus(pattern.to_string()));
                    }
                    if i > 0 {
                        let mut n = (i - start) * width;
                        if n > 64 {
                            return Err(PatternError::TooLong(pattern.to_string()));
                        }
                        if n == 0 {
                            return Err(syntax());
                        }
                        if p[start] == b'y' {
                            n = 0;
                        }
                        let mask = if n == 64 { u64::MAX } else { (1_u64 << n) - 1 };
                        matcher.list.push(Cond { mask, bits, result });
                    } else if c == b'-' {
                        // A leading '-' starts from "everything enabled".
                        matcher.list.push(Cond {
                            mask: 0,
                            bits: 0,
                            result: true,
                        });
                    }
                    bits = 0;
                    result = c == b'+';
                    start = i + 1;
                    width = 1;
                }
                _ => return Err(syntax()),
            }
        }
        Ok(Some(matcher))
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Reports whether the change with the given id should be enabled.
    pub fn should_enable(&self, id: u64) -> bool {
        match self.find(id) {
            Some(cond) => cond.result == self.enable,
            None => !self.enable,
        }
    }

    /// Reports whether the change with the given id should be reported.
    pub fn should_report(&self, id: u64) -> bool {
        self.find(id).is_some_and(|cond| cond.result)
    }

    fn find(&self, id: u64) -> Option<&Cond> {
        self.list
            .iter()
            .rev()
            .find(|cond| id & cond.mask == cond.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pattern: &str) -> Matcher {
        Matcher::new(pattern)
            .expect("valid pattern")
            .expect("non-empty pattern")
    }

    #[test]
    fn test_later_terms_override_earlier_ones() {
        let m = compile("01+10-1001");
        assert!(!m.should_enable(0b1001));
        assert!(m.should_enable(0b01));
        assert!(m.should_enable(0b110));
        assert!(!m.should_enable(0b11));
        assert!(m.should_report(0b01));
        assert!(!m.should_report(0b1001));
    }

    #[test]
    fn test_y_and_n() {
        let yes = compile("y");
        assert!(yes.should_enable(42));
        assert!(yes.should_report(42));

        let no = compile("n");
        assert!(!no.should_enable(42));
        assert!(no.should_report(42));
    }

    #[test]
    fn test_negated_pattern_disables_listed_ids() {
        let m = compile("!01");
        assert!(!m.should_enable(0b101));
        assert!(m.should_report(0b101));
        assert!(m.should_enable(0b10));
        assert!(!m.should_report(0b10));
    }

    #[test]
    fn test_leading_minus_starts_from_everything() {
        let m = compile("-1");
        assert!(m.should_enable(0b10));
        assert!(!m.should_enable(0b11));
    }

    #[test]
    fn test_hex_terms_and_verbose() {
        let m = compile("vx1f");
        assert!(m.verbose());
        assert!(m.should_enable(0x31f));
        assert!(!m.should_enable(0x31e));
    }

    #[test]
    fn test_invalid_patterns() {
        assert_eq!(Matcher::new(""), Ok(None));
        assert!(matches!(Matcher::new("v"), Err(PatternError::Syntax(_))));
        assert!(matches!(Matcher::new("12"), Err(PatternError::Syntax(_))));
        assert!(matches!(
            Matcher::new("0-1+0"),
            Err(PatternError::PlusAfterMinus(_))
        ));
        let long = "1".repeat(65);
        assert!(matches!(Matcher::new(&long), Err(PatternError::TooLong(_))));
        assert!(matches!(Matcher::new("1+"), Err(PatternError::Syntax(_))));
    }
}
