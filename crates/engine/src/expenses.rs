//! Expense primitives.
//!
//! An [`Expense`] is money one participant paid on behalf of the group,
//! attributed to participants through [`Split`]s. Itemised expenses also carry
//! their [`ExpenseItem`]s so the attribution can be rebuilt or migrated.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, Participant, ResultEngine};

/// The portion of one expense attributed to one participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub participant: Participant,
    pub amount: Money,
}

impl Split {
    #[must_use]
    pub fn new(participant: Participant, amount: Money) -> Self {
        Self {
            participant,
            amount,
        }
    }
}

/// One line of an itemised expense and the participants sharing it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub id: String,
    pub name: String,
    pub amount: Money,
    pub involved: Vec<Participant>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount: Money,
    pub payer: Participant,
    pub splits: Vec<Split>,
    pub items: Vec<ExpenseItem>,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Sum of all split amounts. Not necessarily equal to `amount` for
    /// records written before split sums were enforced.
    #[must_use]
    pub fn split_total(&self) -> Money {
        self.splits.iter().map(|s| s.amount).sum()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub description: String,
    pub amount_minor: i64,
    pub payer_kind: String,
    pub payer_id: String,
    pub category: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.clone()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.cents()),
            payer_kind: ActiveValue::Set(expense.payer.kind().as_str().to_string()),
            payer_id: ActiveValue::Set(expense.payer.id().to_string()),
            category: ActiveValue::Set(expense.category.clone()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            created_by: ActiveValue::Set(expense.created_by.clone()),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl Model {
    pub(crate) fn payer(&self) -> ResultEngine<Participant> {
        Participant::from_parts(&self.payer_kind, self.payer_id.clone())
    }

    /// Builds the domain expense; splits and items are attached by the caller.
    pub(crate) fn into_expense(self) -> ResultEngine<Expense> {
        let payer = self.payer()?;
        if self.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(format!(
                "stored expense {} has a non-positive amount",
                self.id
            )));
        }
        Ok(Expense {
            id: self.id,
            group_id: self.group_id,
            description: self.description,
            amount: Money::new(self.amount_minor),
            payer,
            splits: Vec::new(),
            items: Vec::new(),
            category: self.category,
            occurred_at: self.occurred_at,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}
