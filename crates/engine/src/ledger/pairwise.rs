use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Expense, Money, Participant, Roster, Settlement};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetDirection {
    AtoB,
    BtoA,
}

/// One expense split or payment that contributed to a pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairTransaction {
    pub amount: Money,
    pub payer_name: String,
    pub date: DateTime<Utc>,
    pub description: String,
    pub is_payment: bool,
}

/// Debts between two participants, `person_a < person_b`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairEntry {
    pub person_a: Participant,
    pub person_a_name: String,
    pub person_b: Participant,
    pub person_b_name: String,
    pub a_owes_b: Money,
    pub b_owes_a: Money,
    pub transactions: Vec<PairTransaction>,
}

impl PairEntry {
    #[must_use]
    pub fn net_amount(&self) -> Money {
        (self.a_owes_b - self.b_owes_a).abs()
    }

    /// `AtoB` only when A strictly owes more; an exact tie reports `BtoA`
    /// with a zero net amount.
    #[must_use]
    pub fn net_direction(&self) -> NetDirection {
        if self.a_owes_b > self.b_owes_a {
            NetDirection::AtoB
        } else {
            NetDirection::BtoA
        }
    }

    #[must_use]
    pub fn involves(&self, participant: &Participant) -> bool {
        &self.person_a == participant || &self.person_b == participant
    }

    /// `(ower, ower name, receiver, receiver name)` for a direction.
    pub(crate) fn orient(
        &self,
        direction: NetDirection,
    ) -> (&Participant, &str, &Participant, &str) {
        match direction {
            NetDirection::AtoB => (
                &self.person_a,
                self.person_a_name.as_str(),
                &self.person_b,
                self.person_b_name.as_str(),
            ),
            NetDirection::BtoA => (
                &self.person_b,
                self.person_b_name.as_str(),
                &self.person_a,
                self.person_a_name.as_str(),
            ),
        }
    }
}

/// Undirected pair ledger of a group.
///
/// Entries are keyed by the ordered pair, so the same two participants always
/// land in one entry whatever order expenses arrive in, and iteration order is
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairwiseLedger {
    entries: BTreeMap<(Participant, Participant), PairEntry>,
}

impl PairwiseLedger {
    /// Folds expense splits and confirmed settlements into pair entries.
    ///
    /// A split adds to what its participant owes the payer. A confirmed
    /// settlement subtracts from what `from` owes `to`, which may push that
    /// side below zero; netting sorts it out.
    #[must_use]
    pub fn build(roster: &Roster, expenses: &[Expense], settlements: &[Settlement]) -> Self {
        let mut ledger = Self::default();

        for expense in expenses {
            if !roster.contains(&expense.payer) {
                continue;
            }
            let payer_name = roster.name_of(&expense.payer);
            for split in &expense.splits {
                if split.participant == expense.payer || !roster.contains(&split.participant) {
                    continue;
                }
                let entry = ledger.entry(roster, &split.participant, &expense.payer);
                if entry.person_a == split.participant {
                    entry.a_owes_b += split.amount;
                } else {
                    entry.b_owes_a += split.amount;
                }
                entry.transactions.push(PairTransaction {
                    amount: split.amount,
                    payer_name: payer_name.clone(),
                    date: expense.occurred_at,
                    description: expense.description.clone(),
                    is_payment: false,
                });
            }
        }

        for settlement in settlements.iter().filter(|s| s.confirmed_by_recipient()) {
            if settlement.from == settlement.to
                || !roster.contains(&settlement.from)
                || !roster.contains(&settlement.to)
            {
                continue;
            }
            let payer_name = roster.name_of(&settlement.from);
            let receiver_name = roster.name_of(&settlement.to);
            let entry = ledger.entry(roster, &settlement.from, &settlement.to);
            if entry.person_a == settlement.from {
                entry.a_owes_b -= settlement.amount;
            } else {
                entry.b_owes_a -= settlement.amount;
            }
            entry.transactions.push(PairTransaction {
                amount: settlement.amount,
                payer_name,
                date: settlement.confirmed_at.unwrap_or(settlement.created_at),
                description: format!("payment to {receiver_name}"),
                is_payment: true,
            });
        }

        ledger
    }

    fn entry(&mut self, roster: &Roster, x: &Participant, y: &Participant) -> &mut PairEntry {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        self.entries
            .entry((a.clone(), b.clone()))
            .or_insert_with(|| PairEntry {
                person_a: a.clone(),
                person_a_name: roster.name_of(a),
                person_b: b.clone(),
                person_b_name: roster.name_of(b),
                a_owes_b: Money::ZERO,
                b_owes_a: Money::ZERO,
                transactions: Vec::new(),
            })
    }

    /// Entry for two participants, in either order.
    #[must_use]
    pub fn get(&self, x: &Participant, y: &Participant) -> Option<&PairEntry> {
        let key = if x <= y {
            (x.clone(), y.clone())
        } else {
            (y.clone(), x.clone())
        };
        self.entries.get(&key)
    }

    /// Entries sorted by pair key.
    pub fn entries(&self) -> impl Iterator<Item = &PairEntry> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keeps only the entries `participant` is part of.
    #[must_use]
    pub fn visible_to(mut self, participant: &Participant) -> Self {
        self.entries.retain(|_, entry| entry.involves(participant));
        self
    }
}
