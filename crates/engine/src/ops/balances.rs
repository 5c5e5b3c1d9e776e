use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};

use crate::{
    BalanceQuery, BalanceScope, Debt, DebtMode, EngineError, LedgerSnapshot, PairEntry,
    Participant, ParticipantBalance, ResultEngine, detailed_debts, minimal_transfers,
    simplified_debts,
};

use super::{Engine, access::require_member, with_tx};

/// Balances and debts of a group as seen by one caller.
///
/// Only one of `simplified_debts` and `detailed_debts` is filled, depending
/// on the requested [`DebtMode`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBalances {
    pub group_id: String,
    pub balances: Vec<ParticipantBalance>,
    pub simplified_debts: Vec<Debt>,
    pub detailed_debts: Vec<Debt>,
    pub pairs: Vec<PairEntry>,
}

impl Engine {
    /// Reads the group ledger in one transaction and derives balances,
    /// pairwise entries and debts from it.
    ///
    /// With [`BalanceScope::Caller`] the pairs and debts are limited to the
    /// ones the caller takes part in. [`BalanceScope::Group`] is reserved to
    /// admins.
    pub async fn group_balances(&self, query: BalanceQuery) -> ResultEngine<GroupBalances> {
        let snapshot = self.ledger_snapshot(&query).await?;
        let caller = Participant::registered(query.user_id.as_str());

        let balances = snapshot.balances();
        let mut pairwise = snapshot.pairwise();
        if query.scope == BalanceScope::Caller {
            pairwise = pairwise.visible_to(&caller);
        }

        let mut result = GroupBalances {
            group_id: query.group_id.clone(),
            ..GroupBalances::default()
        };
        match query.mode {
            DebtMode::Detailed => result.detailed_debts = detailed_debts(&pairwise),
            DebtMode::Simplified => result.simplified_debts = simplified_debts(&pairwise),
            DebtMode::Minimal => {
                result.simplified_debts = minimal_transfers(&balances)
                    .into_iter()
                    .filter(|debt| query.scope == BalanceScope::Group || debt.involves(&caller))
                    .collect();
            }
        }
        result.pairs = pairwise.entries().cloned().collect();
        result.balances = balances;

        tracing::debug!(
            group_id = %query.group_id,
            expenses = snapshot.expenses.len(),
            settlements = snapshot.settlements.len(),
            pairs = result.pairs.len(),
            "balances computed"
        );
        Ok(result)
    }

    async fn ledger_snapshot(&self, query: &BalanceQuery) -> ResultEngine<LedgerSnapshot> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, &query.group_id).await?;
            let member = require_member(&roster, &query.user_id)?;
            if query.scope == BalanceScope::Group && !member.role.is_admin() {
                return Err(EngineError::Forbidden(
                    "only an admin can see every debt of the group".to_string(),
                ));
            }
            let expenses = self.load_expenses(&db_tx, &query.group_id).await?;
            let settlements = self.load_settlements(&db_tx, &query.group_id).await?;
            Ok(LedgerSnapshot {
                roster,
                expenses,
                settlements,
            })
        })
    }
}
