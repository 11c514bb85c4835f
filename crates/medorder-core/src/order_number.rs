//! Human-readable order number generation.
//!
//! Numbers look like `ORD12345678457`: a configurable prefix, the last eight
//! digits of the Unix millisecond clock and a three-digit random suffix.

use rand::Rng;

use crate::db::{DbError, DbResult};

/// Upper bound on regeneration attempts before giving up.
pub const MAX_ATTEMPTS: u32 = 1000;

/// Produces order numbers unique against an existence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderNumberGenerator {
    prefix: String,
}

impl OrderNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// One candidate for the given clock reading.
    pub fn candidate<R: Rng + ?Sized>(&self, now_ms: i64, rng: &mut R) -> String {
        format!(
            "{}{:08}{}",
            self.prefix,
            now_ms.rem_euclid(100_000_000),
            rng.gen_range(100..=999)
        )
    }

    /// Generate a number for which `exists` reports false.
    pub fn generate<R, F>(&self, rng: &mut R, exists: F) -> DbResult<String>
    where
        R: Rng + ?Sized,
        F: FnMut(&str) -> DbResult<bool>,
    {
        self.generate_with_clock(|| chrono::Utc::now().timestamp_millis(), rng, exists)
    }

    /// `generate` against an injected millisecond clock.
    pub fn generate_with_clock<C, R, F>(&self, mut now_ms: C, rng: &mut R, mut exists: F) -> DbResult<String>
    where
        C: FnMut() -> i64,
        R: Rng + ?Sized,
        F: FnMut(&str) -> DbResult<bool>,
    {
        for _ in 0..MAX_ATTEMPTS {
            let candidate = self.candidate(now_ms(), rng);
            if !exists(&candidate)? {
                return Ok(candidate);
            }
        }
        tracing::error!(prefix = %self.prefix, "no free order number after {} attempts", MAX_ATTEMPTS);
        Err(DbError::Constraint(format!(
            "could not generate a unique order number after {} attempts",
            MAX_ATTEMPTS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_candidate_shape() {
        let generator = OrderNumberGenerator::new("ORD");
        let mut rng = StdRng::seed_from_u64(7);
        let number = generator.candidate(1_700_000_123_456, &mut rng);

        assert!(number.starts_with("ORD00123456"));
        assert_eq!(number.len(), 3 + 8 + 3);
        let suffix: u32 = number[11..].parse().unwrap();
        assert!((100..=999).contains(&suffix));
    }

    #[test]
    fn test_same_millisecond_numbers_are_distinct() {
        let generator = OrderNumberGenerator::new("ORD");
        let mut rng = StdRng::seed_from_u64(42);
        let mut issued = HashSet::new();

        for _ in 0..200 {
            let number = generator
                .generate_with_clock(|| 1_700_000_000_000, &mut rng, |n| Ok(issued.contains(n)))
                .unwrap();
            assert!(issued.insert(number));
        }
    }

    #[test]
    fn test_gives_up_when_space_exhausted() {
        let generator = OrderNumberGenerator::new("ORD");
        let mut rng = StdRng::seed_from_u64(1);
        let mut calls = 0;
        let result = generator.generate_with_clock(
            || 0,
            &mut rng,
            |_| {
                calls += 1;
                Ok(true)
            },
        );
        assert!(result.is_err());
        assert_eq!(calls, MAX_ATTEMPTS);
    }
}
