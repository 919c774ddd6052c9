//! 64-bit FNV-1a hashing of change identities.
//!
//! Integers are fed least-significant byte first so ids are stable across
//! platforms.

use std::hash::Hasher;

const OFFSET64: u64 = 14_695_981_039_346_656_037;
const PRIME64: u64 = 1_099_511_628_211;

#[derive(Debug, Clone, Copy)]
pub struct Fnv64(u64);

impl Default for Fnv64 {
    fn default() -> Self {
        Self(OFFSET64)
    }
}

impl Fnv64 {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_str(mut self, s: &str) -> Self {
        self.write(s.as_bytes());
        self
    }

    #[must_use]
    pub fn with_u64(mut self, x: u64) -> Self {
        self.write_u64(x);
        self
    }
}

impl Hasher for Fnv64 {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(PRIME64);
        }
    }

    fn write_u32(&mut self, x: u32) {
        self.write(&x.to_le_bytes());
    }

    fn write_u64(&mut self, x: u64) {
        self.write(&x.to_le_bytes());
    }

    fn write_usize(&mut self, x: usize) {
        self.write_u64(x as u64);
    }
}

/// Hashes a sequence of strings.
pub fn hash_str(parts: &[&str]) -> u64 {
    parts
        .iter()
        .fold(Fnv64::new(), |h, part| h.with_str(part))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(hash_str(&[]), OFFSET64);
        // FNV-1a("a")
        assert_eq!(hash_str(&["a"]), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(hash_str(&["ab", "c"]), hash_str(&["abc"]));
    }

    #[test]
    fn test_integers_hash_little_endian() {
        let by_int = Fnv64::new().with_u64(0x0102).finish();
        let mut by_bytes = Fnv64::new();
        by_bytes.write(&[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(by_int, by_bytes.finish());
    }
}
