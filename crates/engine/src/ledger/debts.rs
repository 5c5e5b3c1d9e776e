use serde::{Deserialize, Serialize};

use crate::{Money, Participant};

use super::{NetDirection, PairwiseLedger, ParticipantBalance};

/// Amounts at or below this are treated as settled: a single leftover cent
/// is rounding dust and never reported as a debt.
pub const SETTLED_THRESHOLD: Money = Money::new(1);

/// How debts are presented to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtMode {
    /// Raw per-direction debts, up to two entries per pair.
    #[default]
    Detailed,
    /// One netted entry per pair.
    Simplified,
    /// Fewest transfers over the whole group, ignoring who incurred what
    /// with whom.
    Minimal,
}

/// `from` should pay `to` the given amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub from: Participant,
    pub from_name: String,
    pub to: Participant,
    pub to_name: String,
    pub amount: Money,
}

impl Debt {
    #[must_use]
    pub fn involves(&self, participant: &Participant) -> bool {
        &self.from == participant || &self.to == participant
    }
}

fn debt(from: &Participant, from_name: &str, to: &Participant, to_name: &str, amount: Money) -> Debt {
    Debt {
        from: from.clone(),
        from_name: from_name.to_string(),
        to: to.clone(),
        to_name: to_name.to_string(),
        amount,
    }
}

/// One entry per pair and direction with an outstanding amount, `A → B`
/// before `B → A`, pairs in key order.
#[must_use]
pub fn detailed_debts(ledger: &PairwiseLedger) -> Vec<Debt> {
    let mut out = Vec::new();
    for entry in ledger.entries() {
        for (direction, amount) in [
            (NetDirection::AtoB, entry.a_owes_b),
            (NetDirection::BtoA, entry.b_owes_a),
        ] {
            if amount > SETTLED_THRESHOLD {
                let (from, from_name, to, to_name) = entry.orient(direction);
                out.push(debt(from, from_name, to, to_name, amount));
            }
        }
    }
    out
}

/// One netted entry per pair with an outstanding net amount, pairs in key
/// order.
#[must_use]
pub fn simplified_debts(ledger: &PairwiseLedger) -> Vec<Debt> {
    ledger
        .entries()
        .filter(|entry| entry.net_amount() > SETTLED_THRESHOLD)
        .map(|entry| {
            let (from, from_name, to, to_name) = entry.orient(entry.net_direction());
            debt(from, from_name, to, to_name, entry.net_amount())
        })
        .collect()
}

/// Greedy minimal set of transfers that zeroes every balance: the largest
/// debtor pays the largest creditor until one of them is square, then the
/// next pair is matched.
///
/// Ties are broken by participant order so the output is deterministic.
/// Balances that do not sum to zero leave the unmatched remainder out.
#[must_use]
pub fn minimal_transfers(balances: &[ParticipantBalance]) -> Vec<Debt> {
    let mut debtors: Vec<(&ParticipantBalance, Money)> = balances
        .iter()
        .filter(|b| b.balance < -SETTLED_THRESHOLD)
        .map(|b| (b, -b.balance))
        .collect();
    let mut creditors: Vec<(&ParticipantBalance, Money)> = balances
        .iter()
        .filter(|b| b.balance > SETTLED_THRESHOLD)
        .map(|b| (b, b.balance))
        .collect();

    // Ascending, so the largest sits at the end and can be popped.
    let by_amount = |x: &(&ParticipantBalance, Money), y: &(&ParticipantBalance, Money)| {
        x.1.cmp(&y.1)
            .then_with(|| y.0.participant.cmp(&x.0.participant))
    };
    debtors.sort_by(by_amount);
    creditors.sort_by(by_amount);

    let mut out = Vec::new();
    while let (Some(debtor), Some(creditor)) = (debtors.pop(), creditors.pop()) {
        let amount = debtor.1.min(creditor.1);
        out.push(debt(
            &debtor.0.participant,
            &debtor.0.name,
            &creditor.0.participant,
            &creditor.0.name,
            amount,
        ));

        let debtor_left = debtor.1 - amount;
        let creditor_left = creditor.1 - amount;
        if debtor_left > SETTLED_THRESHOLD {
            debtors.push((debtor.0, debtor_left));
            debtors.sort_by(by_amount);
        }
        if creditor_left > SETTLED_THRESHOLD {
            creditors.push((creditor.0, creditor_left));
            creditors.sort_by(by_amount);
        }
    }
    out
}
