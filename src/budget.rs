//! Shared call budget for one top-level invocation tree.
//!
//! A [`Budget`] is created once per top-level call and cloned (by reference)
//! into every descendant node and capability binding. Clones share one
//! counter; charging is a single atomic check-and-decrement, so concurrent
//! branches can never both pass a still-positive value and overdraw it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::SolveError;

/// Kind of chargeable operation, recorded for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charge {
    /// One oracle round-trip.
    Oracle,
    /// One lookup call from sandboxed code.
    Lookup,
    /// One recursive self-call from sandboxed code.
    Recurse,
}

impl fmt::Display for Charge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oracle => write!(f, "oracle call"),
            Self::Lookup => write!(f, "lookup"),
            Self::Recurse => write!(f, "recursive call"),
        }
    }
}

#[derive(Debug)]
struct Ledger {
    allowance: u64,
    remaining: AtomicU64,
}

/// Handle to a shared, strictly decreasing counter.
#[derive(Debug, Clone)]
pub(crate) struct Budget {
    ledger: Arc<Ledger>,
}

impl Budget {
    /// Creates a fresh ledger with the given starting allowance.
    pub fn new(allowance: u64) -> Self {
        Self {
            ledger: Arc::new(Ledger {
                allowance,
                remaining: AtomicU64::new(allowance),
            }),
        }
    }

    /// Charges one operation against the ledger.
    ///
    /// Fails with `BudgetExceeded` when the decrement would take the counter
    /// to zero or below; the counter is left untouched in that case.
    pub fn charge(&self, operation: Charge) -> Result<(), SolveError> {
        match self
            .ledger
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n > 1).then(|| n - 1)
            }) {
            Ok(previous) => {
                debug!("Charged {operation}, {} remaining", previous - 1);
                Ok(())
            }
            Err(_) => Err(SolveError::budget_exceeded(
                self.ledger.allowance,
                operation,
            )),
        }
    }

    /// Current counter value.
    pub fn remaining(&self) -> u64 {
        self.ledger.remaining.load(Ordering::SeqCst)
    }

    /// Starting allowance of this ledger.
    pub fn allowance(&self) -> u64 {
        self.ledger.allowance
    }

    /// Number of successful charges so far.
    pub fn spent(&self) -> u64 {
        self.ledger.allowance - self.remaining()
    }
}
