//! Pure balance computations over one group snapshot.
//!
//! Nothing here touches the database: the operations in `ops::balances` read
//! a [`LedgerSnapshot`] inside one transaction and hand it to these
//! functions. Balances and the pairwise ledger are computed independently
//! from the same inputs; the debt views are derived from them.

use serde::{Deserialize, Serialize};

use crate::{Expense, Roster, Settlement};

mod balances;
mod debts;
mod pairwise;

pub use balances::{ParticipantBalance, aggregate_balances};
pub use debts::{
    Debt, DebtMode, SETTLED_THRESHOLD, detailed_debts, minimal_transfers, simplified_debts,
};
pub use pairwise::{NetDirection, PairEntry, PairTransaction, PairwiseLedger};

/// Roster, expenses and settlements of one group, read together.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub roster: Roster,
    pub expenses: Vec<Expense>,
    pub settlements: Vec<Settlement>,
}

impl LedgerSnapshot {
    #[must_use]
    pub fn balances(&self) -> Vec<ParticipantBalance> {
        aggregate_balances(&self.roster, &self.expenses, &self.settlements)
    }

    #[must_use]
    pub fn pairwise(&self) -> PairwiseLedger {
        PairwiseLedger::build(&self.roster, &self.expenses, &self.settlements)
    }
}
