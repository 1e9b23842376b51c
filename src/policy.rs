//! Decision policy: quota check and the probabilistic act gate.
//!
//! Pure functions over the supplied counters and random source.

use rand::Rng;

/// `true` once today's count has reached today's limit.
#[must_use]
pub fn quota_exhausted(count: u32, limit: u32) -> bool {
    count >= limit
}

/// `true` with probability `p`: a uniform draw in `[0, 1)` falls below `p`.
pub fn should_act_now<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    rng.r#gen::<f64>() < p
}

/// Outcome of evaluating the policy for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Today's quota is used up.
    QuotaExhausted,
    /// Under quota, but the coin flip said not now.
    Skip,
    /// Make a contribution.
    Act,
}

/// Configured decision policy.
#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy {
    act_probability: f64,
}

impl DecisionPolicy {
    /// Policy acting with probability `act_probability` (clamped to `[0, 1]`).
    #[must_use]
    pub fn new(act_probability: f64) -> Self {
        Self {
            act_probability: act_probability.clamp(0.0, 1.0),
        }
    }

    /// Configured act probability.
    pub fn act_probability(&self) -> f64 {
        self.act_probability
    }

    /// Quota first, then the coin flip. The random source is only consulted
    /// when under quota.
    pub fn decide<R: Rng + ?Sized>(&self, count: u32, limit: u32, rng: &mut R) -> Decision {
        if quota_exhausted(count, limit) {
            Decision::QuotaExhausted
        } else if should_act_now(rng, self.act_probability) {
            Decision::Act
        } else {
            Decision::Skip
        }
    }
}

impl From<&crate::config::PolicyConfig> for DecisionPolicy {
    fn from(config: &crate::config::PolicyConfig) -> Self {
        Self::new(config.act_probability)
    }
}
