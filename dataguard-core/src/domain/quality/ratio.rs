// dataguard-core/src/domain/quality/ratio.rs

use serde::{Serialize, Serializer};

const SCALE: u128 = 1_000_000_000;

/// Maximum tolerated violation ratio, stored in parts per billion so that
/// threshold comparisons are exact integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Threshold {
    ppb: u64,
}

impl Threshold {
    pub const ZERO: Threshold = Threshold { ppb: 0 };

    /// `None` when the value is not a ratio in [0, 1].
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return None;
        }
        Some(Self {
            ppb: (value * SCALE as f64).round() as u64,
        })
    }

    pub fn as_f64(&self) -> f64 {
        self.ppb as f64 / SCALE as f64
    }
}

impl Serialize for Threshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// violations / evaluated, kept as integers until display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Ratio {
    pub violations: u64,
    pub evaluated: u64,
}

impl Ratio {
    pub fn new(violations: u64, evaluated: u64) -> Self {
        Self {
            violations,
            evaluated,
        }
    }

    /// Zero for an empty denominator.
    pub fn value(&self) -> f64 {
        if self.evaluated == 0 {
            return 0.0;
        }
        self.violations as f64 / self.evaluated as f64
    }

    /// Strictly greater than the threshold. Equality passes.
    pub fn exceeds(&self, threshold: Threshold) -> bool {
        if self.evaluated == 0 {
            return false;
        }
        (self.violations as u128) * SCALE > (threshold.ppb as u128) * (self.evaluated as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_range() {
        assert!(Threshold::new(-0.1).is_none());
        assert!(Threshold::new(1.5).is_none());
        assert!(Threshold::new(f64::NAN).is_none());
        assert!(Threshold::new(0.0).is_some());
        assert!(Threshold::new(1.0).is_some());
    }

    #[test]
    fn test_boundary_is_passing() {
        let t = Threshold::new(0.02).unwrap_or(Threshold::ZERO);
        assert!(!Ratio::new(2, 100).exceeds(t));
        assert!(Ratio::new(201, 10_000).exceeds(t));
        assert!(!Ratio::new(200, 10_000).exceeds(t));
    }

    #[test]
    fn test_zero_threshold() {
        assert!(Ratio::new(1, 1_000_000).exceeds(Threshold::ZERO));
        assert!(!Ratio::new(0, 10).exceeds(Threshold::ZERO));
    }

    #[test]
    fn test_empty_ratio() {
        let r = Ratio::new(0, 0);
        assert_eq!(r.value(), 0.0);
        assert!(!r.exceeds(Threshold::ZERO));
    }
}
