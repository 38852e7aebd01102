//! Per-session cumulative epsilon accounting, generalized from the
//! `PrivacyBudget` tracker used for federated trait-delta aggregation:
//! a one-way ledger under basic composition (total epsilon is the sum
//! of every query's cost). No refunds, no advanced composition, just the
//! simplest accounting that makes `BudgetExhausted` reachable, which is
//! all this spec's Non-goals ask for.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyBudget {
    pub session_key: String,
    pub total_epsilon: f64,
    pub spent: f64,
}

impl PrivacyBudget {
    pub fn new(session_key: impl Into<String>, total_epsilon: f64) -> Self {
        PrivacyBudget {
            session_key: session_key.into(),
            total_epsilon,
            spent: 0.0,
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.total_epsilon - self.spent).max(0.0)
    }

    pub fn charge(&mut self, epsilon: f64) -> Result<()> {
        if self.spent + epsilon > self.total_epsilon {
            return Err(Error::BudgetExhausted {
                session_key: self.session_key.clone(),
                spent: self.spent,
                requested: epsilon,
                total: self.total_epsilon,
            });
        }
        self.spent += epsilon;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charges_accumulate() {
        let mut budget = PrivacyBudget::new("s1", 1.0);
        budget.charge(0.4).unwrap();
        budget.charge(0.4).unwrap();
        assert!((budget.spent - 0.8).abs() < 1e-12);
        assert!((budget.remaining() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn exhaustion_is_surfaced_and_not_charged() {
        let mut budget = PrivacyBudget::new("s1", 1.0);
        budget.charge(0.9).unwrap();
        let err = budget.charge(0.5).unwrap_err();
        assert!(matches!(err, Error::BudgetExhausted { .. }));
        // the failed charge is not applied (no refunds needed, but also no overspend)
        assert!((budget.spent - 0.9).abs() < 1e-12);
    }
}
