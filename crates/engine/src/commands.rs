//! Command structs for engine operations.
//!
//! These types group parameters for write operations and balance queries,
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DebtMode, Money, Participant};

/// How an expense amount is attributed to participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SplitRule {
    /// Equal shares among the listed participants.
    Equal { participants: Vec<Participant> },
    /// Explicit amount per participant.
    Exact { amounts: Vec<(Participant, Money)> },
    /// Share per participant in basis points (`10_000` = 100%).
    Percentage { basis_points: Vec<(Participant, u32)> },
    /// Shares proportional to integer weights.
    Shares { weights: Vec<(Participant, u32)> },
    /// Line items, each split equally among the participants involved.
    Itemized { items: Vec<ItemInput> },
}

/// One line of an itemised expense.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    pub name: String,
    pub amount: Money,
    pub involved: Vec<Participant>,
}

impl ItemInput {
    #[must_use]
    pub fn new(name: impl Into<String>, amount: Money, involved: Vec<Participant>) -> Self {
        Self {
            name: name.into(),
            amount,
            involved,
        }
    }
}

/// Create an expense, or replace every field of an existing one.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub group_id: String,
    pub user_id: String,
    pub description: String,
    pub amount: Money,
    pub payer: Participant,
    pub rule: SplitRule,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        description: impl Into<String>,
        amount: Money,
        payer: Participant,
        rule: SplitRule,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            user_id: user_id.into(),
            description: description.into(),
            amount,
            payer,
            rule,
            category: None,
            occurred_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}

/// Record a payment from `from` to `to`.
#[derive(Clone, Debug)]
pub struct CreateSettlementCmd {
    pub group_id: String,
    pub user_id: String,
    pub from: Participant,
    pub to: Participant,
    pub amount: Money,
    pub note: Option<String>,
}

impl CreateSettlementCmd {
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        user_id: impl Into<String>,
        from: Participant,
        to: Participant,
        amount: Money,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            user_id: user_id.into(),
            from,
            to,
            amount,
            note: None,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Register a user, optionally claiming a phone number.
#[derive(Clone, Debug)]
pub struct RegisterUserCmd {
    pub username: String,
    pub display_name: String,
    pub phone: Option<String>,
}

impl RegisterUserCmd {
    #[must_use]
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
            phone: None,
        }
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Whose debts a balance query returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceScope {
    /// Only pairs the caller is part of.
    #[default]
    Caller,
    /// Every pair of the group. Admins only.
    Group,
}

#[derive(Clone, Debug)]
pub struct BalanceQuery {
    pub group_id: String,
    pub user_id: String,
    pub scope: BalanceScope,
    pub mode: DebtMode,
}

impl BalanceQuery {
    #[must_use]
    pub fn new(group_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            user_id: user_id.into(),
            scope: BalanceScope::default(),
            mode: DebtMode::default(),
        }
    }

    #[must_use]
    pub fn scope(mut self, scope: BalanceScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: DebtMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Settlement listing filter.
#[derive(Clone, Debug, Default)]
pub struct SettlementListFilter {
    pub status: Option<crate::SettlementStatus>,
    pub involving: Option<Participant>,
}
