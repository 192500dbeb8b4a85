use crate::error::SirError;
use serde::{Deserialize, Serialize};

/// Per-contact infection probability `p` and per-step recovery probability `q`.
///
/// Both are held as `f32`, the precision the batched compare works in, so the
/// two engines test draws against exactly the same thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    p: f32,
    q: f32,
}

impl Probabilities {
    pub fn new(p: f64, q: f64) -> Result<Self, SirError> {
        check("p", p)?;
        check("q", q)?;
        Ok(Self {
            p: p as f32,
            q: q as f32,
        })
    }

    /// `p = q = 1`: every contact infects and every case recovers after one
    /// step, which reduces the process to breadth-first level assignment.
    pub fn breadth_first() -> Self {
        Self { p: 1.0, q: 1.0 }
    }

    #[inline]
    pub fn p(&self) -> f32 {
        self.p
    }

    #[inline]
    pub fn q(&self) -> f32 {
        self.q
    }
}

fn check(name: &'static str, value: f64) -> Result<(), SirError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SirError::ProbabilityOutOfRange { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_checks() {
        assert!(Probabilities::new(0.0, 1.0).is_ok());
        assert_eq!(
            Probabilities::new(1.5, 0.5),
            Err(SirError::ProbabilityOutOfRange { name: "p", value: 1.5 })
        );
        assert!(matches!(
            Probabilities::new(0.5, -0.1),
            Err(SirError::ProbabilityOutOfRange { name: "q", .. })
        ));
        assert!(Probabilities::new(f64::NAN, 0.5).is_err());
    }
}
