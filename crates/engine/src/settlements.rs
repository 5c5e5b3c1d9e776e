//! Settlement primitives.
//!
//! A [`Settlement`] records a payment from one participant to another. It is
//! created `Pending` and becomes balance-affecting only once the recipient
//! confirms it. Rejected settlements are deleted, so they have no state of
//! their own.
//!
//! While a settlement is pending its row carries an `outstanding_key`
//! (`group/from/to`) covered by a unique index: the store itself guarantees
//! at most one outstanding payment per direction. Confirming clears the key.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, Participant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Confirmed,
}

impl SettlementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
        }
    }
}

impl TryFrom<&str> for SettlementStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            other => Err(EngineError::InvalidInput(format!(
                "invalid settlement status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub group_id: String,
    pub from: Participant,
    pub to: Participant,
    pub amount: Money,
    pub note: Option<String>,
    pub status: SettlementStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

impl Settlement {
    /// `true` once the recipient acknowledged the payment.
    #[must_use]
    pub fn confirmed_by_recipient(&self) -> bool {
        self.status == SettlementStatus::Confirmed
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == SettlementStatus::Pending
    }
}

/// Key shared by every pending settlement of the same ordered pair.
pub(crate) fn outstanding_key(group_id: &str, from: &Participant, to: &Participant) -> String {
    format!(
        "{group_id}/{}:{}/{}:{}",
        from.kind().as_str(),
        from.id(),
        to.kind().as_str(),
        to.id()
    )
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub from_kind: String,
    pub from_id: String,
    pub to_kind: String,
    pub to_id: String,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub status: String,
    #[sea_orm(unique)]
    pub outstanding_key: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub confirmed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Settlement> for ActiveModel {
    fn from(settlement: &Settlement) -> Self {
        let outstanding = settlement
            .is_pending()
            .then(|| outstanding_key(&settlement.group_id, &settlement.from, &settlement.to));
        Self {
            id: ActiveValue::Set(settlement.id.clone()),
            group_id: ActiveValue::Set(settlement.group_id.clone()),
            from_kind: ActiveValue::Set(settlement.from.kind().as_str().to_string()),
            from_id: ActiveValue::Set(settlement.from.id().to_string()),
            to_kind: ActiveValue::Set(settlement.to.kind().as_str().to_string()),
            to_id: ActiveValue::Set(settlement.to.id().to_string()),
            amount_minor: ActiveValue::Set(settlement.amount.cents()),
            note: ActiveValue::Set(settlement.note.clone()),
            status: ActiveValue::Set(settlement.status.as_str().to_string()),
            outstanding_key: ActiveValue::Set(outstanding),
            created_by: ActiveValue::Set(settlement.created_by.clone()),
            created_at: ActiveValue::Set(settlement.created_at),
            confirmed_at: ActiveValue::Set(settlement.confirmed_at),
        }
    }
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            from: Participant::from_parts(&model.from_kind, model.from_id)?,
            to: Participant::from_parts(&model.to_kind, model.to_id)?,
            status: SettlementStatus::try_from(model.status.as_str())?,
            id: model.id,
            group_id: model.group_id,
            amount: Money::new(model.amount_minor),
            note: model.note,
            created_by: model.created_by,
            created_at: model.created_at,
            confirmed_at: model.confirmed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outstanding_key_is_directional() {
        let alice = Participant::registered("alice");
        let bob = Participant::registered("bob");
        assert_ne!(
            outstanding_key("g", &alice, &bob),
            outstanding_key("g", &bob, &alice)
        );
        assert_ne!(
            outstanding_key("g", &alice, &bob),
            outstanding_key("h", &alice, &bob)
        );
    }

    #[test]
    fn confirmed_rows_carry_no_outstanding_key() {
        let mut settlement = Settlement {
            id: "s".to_string(),
            group_id: "g".to_string(),
            from: Participant::registered("bob"),
            to: Participant::registered("alice"),
            amount: Money::new(3000),
            note: None,
            status: SettlementStatus::Pending,
            created_by: "bob".to_string(),
            created_at: Utc::now(),
            confirmed_at: None,
        };
        let pending = ActiveModel::from(&settlement);
        assert!(matches!(pending.outstanding_key, ActiveValue::Set(Some(_))));

        settlement.status = SettlementStatus::Confirmed;
        let confirmed = ActiveModel::from(&settlement);
        assert!(matches!(confirmed.outstanding_key, ActiveValue::Set(None)));
        assert!(settlement.confirmed_by_recipient());
    }
}
