use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use rand::rngs::OsRng;

pub const CODE_LEN: usize = 6;

/// Produces one-time verification codes: six ASCII digits.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Codes drawn uniformly from `000000..=999999` using the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngCodes;

impl CodeGenerator for OsRngCodes {
    fn generate(&self) -> String {
        format!("{:06}", OsRng.gen_range(0..1_000_000u32))
    }
}

/// Hands out a fixed list of codes in order, wrapping around.
#[derive(Debug)]
pub struct FixedCodes {
    codes: Vec<String>,
    next: AtomicUsize,
}

impl FixedCodes {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        assert!(!codes.is_empty(), "FixedCodes needs at least one code");
        Self {
            codes,
            next: AtomicUsize::new(0),
        }
    }
}

impl CodeGenerator for FixedCodes {
    fn generate(&self) -> String {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.codes[i % self.codes.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_codes_are_six_digits() {
        for _ in 0..200 {
            let code = OsRngCodes.generate();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn fixed_codes_cycle() {
        let codes = FixedCodes::new(["111111", "222222"]);
        assert_eq!(codes.generate(), "111111");
        assert_eq!(codes.generate(), "222222");
        assert_eq!(codes.generate(), "111111");
    }
}
