use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Expense, Money, Participant, Roster, Settlement};

/// What one participant paid, what they owe, and where that leaves them.
///
/// `balance > 0` means the group owes the participant money.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantBalance {
    pub participant: Participant,
    pub name: String,
    pub paid: Money,
    pub owes: Money,
    pub balance: Money,
}

/// Folds expenses and confirmed settlements into one balance per roster
/// participant, in roster order.
///
/// - the payer of an expense is credited its full amount
/// - every split debits its participant
/// - a confirmed settlement credits `from` and debits `to`
///
/// References to participants outside the roster are skipped, as are
/// settlements still waiting for confirmation.
#[must_use]
pub fn aggregate_balances(
    roster: &Roster,
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Vec<ParticipantBalance> {
    let mut rows: Vec<ParticipantBalance> = roster
        .participants()
        .map(|participant| ParticipantBalance {
            name: roster.name_of(&participant),
            participant,
            paid: Money::ZERO,
            owes: Money::ZERO,
            balance: Money::ZERO,
        })
        .collect();
    let index: HashMap<Participant, usize> = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| (row.participant.clone(), idx))
        .collect();

    for expense in expenses {
        match index.get(&expense.payer) {
            Some(&idx) => rows[idx].paid += expense.amount,
            None => tracing::debug!(
                expense_id = %expense.id,
                payer = %expense.payer,
                "skipping payer outside the roster"
            ),
        }
        for split in &expense.splits {
            if let Some(&idx) = index.get(&split.participant) {
                rows[idx].owes += split.amount;
            }
        }
    }

    for row in &mut rows {
        row.balance = row.paid - row.owes;
    }

    for settlement in settlements.iter().filter(|s| s.confirmed_by_recipient()) {
        if let Some(&idx) = index.get(&settlement.from) {
            rows[idx].balance += settlement.amount;
        }
        if let Some(&idx) = index.get(&settlement.to) {
            rows[idx].balance -= settlement.amount;
        }
    }

    rows
}
