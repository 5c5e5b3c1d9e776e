//! Merging a pending participant into the user who registered with their
//! phone number.
//!
//! Each group is migrated in its own transaction. The pending record is
//! deleted last, so a run that fails halfway leaves it in place and a second
//! run picks up where the first stopped; a run after success finds nothing to
//! do.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, MemberRole, Participant, ParticipantKind, ResultEngine, SettlementStatus,
    expense_item_participants, expense_splits, expenses, group_members,
    normalize_phone, pending_participants, settlements, settlements::outstanding_key,
};

use super::{Engine, with_tx};

/// What a reconciliation run changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Groups whose pending participant was merged.
    pub groups: Vec<String>,
    pub expenses_reassigned: u64,
    pub splits_reassigned: u64,
    pub splits_merged: u64,
    pub items_reassigned: u64,
    pub settlements_reassigned: u64,
}

impl ReconcileReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn absorb(&mut self, other: ReconcileReport) {
        self.groups.extend(other.groups);
        self.expenses_reassigned += other.expenses_reassigned;
        self.splits_reassigned += other.splits_reassigned;
        self.splits_merged += other.splits_merged;
        self.items_reassigned += other.items_reassigned;
        self.settlements_reassigned += other.settlements_reassigned;
    }
}

const PENDING: &str = ParticipantKind::Pending.as_str();
const REGISTERED: &str = ParticipantKind::Registered.as_str();

impl Engine {
    /// Moves every trace of the pending participants registered under `phone`
    /// to `user_id`: payers, splits, item involvement, settlements and group
    /// membership.
    ///
    /// Running it twice is harmless: the second run finds no pending record.
    pub async fn reconcile_pending_participant(
        &self,
        phone: &str,
        user_id: &str,
    ) -> ResultEngine<ReconcileReport> {
        let phone = normalize_phone(phone, &self.default_country_code)?;
        let candidates: Vec<pending_participants::Model> = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            pending_participants::Entity::find()
                .filter(pending_participants::Column::Phone.eq(phone.clone()))
                .all(&db_tx)
                .await
                .map_err(EngineError::from)
        })?;

        let mut report = ReconcileReport::default();
        for pending in candidates {
            let group_report = self.reconcile_group(&pending.id, user_id).await?;
            report.absorb(group_report);
        }
        if !report.is_empty() {
            tracing::info!(
                user_id,
                groups = report.groups.len(),
                expenses = report.expenses_reassigned,
                splits = report.splits_reassigned + report.splits_merged,
                settlements = report.settlements_reassigned,
                "pending participant reconciled"
            );
        }
        Ok(report)
    }

    async fn reconcile_group(&self, pending_id: &str, user_id: &str) -> ResultEngine<ReconcileReport> {
        with_tx!(self, |db_tx| {
            // Re-read inside the transaction: a concurrent run may already
            // have merged it.
            let Some(pending) = pending_participants::Entity::find_by_id(pending_id.to_string())
                .one(&db_tx)
                .await?
            else {
                return Ok(ReconcileReport::default());
            };
            let group_id = pending.group_id.clone();
            let mut report = ReconcileReport {
                groups: vec![group_id.clone()],
                ..ReconcileReport::default()
            };

            report.expenses_reassigned = expenses::Entity::update_many()
                .col_expr(expenses::Column::PayerKind, Expr::value(REGISTERED))
                .col_expr(expenses::Column::PayerId, Expr::value(user_id))
                .filter(expenses::Column::GroupId.eq(group_id.clone()))
                .filter(expenses::Column::PayerKind.eq(PENDING))
                .filter(expenses::Column::PayerId.eq(pending_id.to_string()))
                .exec(&db_tx)
                .await?
                .rows_affected;

            let (reassigned, merged) = self.reassign_splits(&db_tx, pending_id, user_id).await?;
            report.splits_reassigned = reassigned;
            report.splits_merged = merged;
            report.items_reassigned = self.reassign_items(&db_tx, pending_id, user_id).await?;
            report.settlements_reassigned = self
                .reassign_settlements(&db_tx, &group_id, pending_id, user_id)
                .await?;

            let already_member =
                group_members::Entity::find_by_id((group_id.clone(), user_id.to_string()))
                    .one(&db_tx)
                    .await?
                    .is_some();
            if !already_member {
                group_members::ActiveModel {
                    group_id: ActiveValue::Set(group_id.clone()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    role: ActiveValue::Set(MemberRole::Member.as_str().to_string()),
                    joined_at: ActiveValue::Set(Utc::now()),
                }
                .insert(&db_tx)
                .await?;
            }
            pending_participants::Entity::delete_by_id(pending_id.to_string())
                .exec(&db_tx)
                .await?;

            tracing::debug!(group_id = %group_id, pending_id, user_id, "group reconciled");
            Ok(report)
        })
    }

    /// Rewrites splits of the pending id. When the user already has a split
    /// on the same expense the amounts are added and the pending split is
    /// dropped.
    async fn reassign_splits(
        &self,
        db: &DatabaseTransaction,
        pending_id: &str,
        user_id: &str,
    ) -> ResultEngine<(u64, u64)> {
        let pending_splits = expense_splits::Entity::find()
            .filter(expense_splits::Column::ParticipantKind.eq(PENDING))
            .filter(expense_splits::Column::ParticipantId.eq(pending_id.to_string()))
            .all(db)
            .await?;
        let expense_ids: Vec<String> = pending_splits
            .iter()
            .map(|s| s.expense_id.clone())
            .collect();
        let mut user_splits: HashMap<String, expense_splits::Model> = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.is_in(expense_ids))
            .filter(expense_splits::Column::ParticipantKind.eq(REGISTERED))
            .filter(expense_splits::Column::ParticipantId.eq(user_id.to_string()))
            .all(db)
            .await?
            .into_iter()
            .map(|s| (s.expense_id.clone(), s))
            .collect();

        let (mut reassigned, mut merged) = (0, 0);
        for split in pending_splits {
            match user_splits.remove(&split.expense_id) {
                Some(existing) => {
                    let total = existing.amount_minor + split.amount_minor;
                    let mut active: expense_splits::ActiveModel = existing.into();
                    active.amount_minor = ActiveValue::Set(total);
                    active.update(db).await?;
                    expense_splits::Entity::delete_by_id(split.id)
                        .exec(db)
                        .await?;
                    merged += 1;
                }
                None => {
                    let mut active: expense_splits::ActiveModel = split.into();
                    active.participant_kind = ActiveValue::Set(REGISTERED.to_string());
                    active.participant_id = ActiveValue::Set(user_id.to_string());
                    active.update(db).await?;
                    reassigned += 1;
                }
            }
        }
        Ok((reassigned, merged))
    }

    /// Moves item involvement to the user, without duplicating it on items
    /// the user was already part of.
    async fn reassign_items(
        &self,
        db: &DatabaseTransaction,
        pending_id: &str,
        user_id: &str,
    ) -> ResultEngine<u64> {
        let rows = expense_item_participants::Entity::find()
            .filter(expense_item_participants::Column::ParticipantKind.eq(PENDING))
            .filter(expense_item_participants::Column::ParticipantId.eq(pending_id.to_string()))
            .all(db)
            .await?;

        let mut moved = 0;
        for row in rows {
            let item_id = row.item_id.clone();
            expense_item_participants::Entity::delete_by_id((
                row.item_id,
                row.participant_kind,
                row.participant_id,
            ))
            .exec(db)
            .await?;

            let present = expense_item_participants::Entity::find_by_id((
                item_id.clone(),
                REGISTERED.to_string(),
                user_id.to_string(),
            ))
            .one(db)
            .await?
            .is_some();
            if !present {
                expense_item_participants::ActiveModel {
                    item_id: ActiveValue::Set(item_id),
                    participant_kind: ActiveValue::Set(REGISTERED.to_string()),
                    participant_id: ActiveValue::Set(user_id.to_string()),
                }
                .insert(db)
                .await?;
            }
            moved += 1;
        }
        Ok(moved)
    }

    /// Rewrites both ends of the group's settlements.
    ///
    /// A pending settlement whose direction the user already has outstanding
    /// is folded into that one. A settlement that would end up between the
    /// user and themselves is dropped.
    async fn reassign_settlements(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        pending_id: &str,
        user_id: &str,
    ) -> ResultEngine<u64> {
        let pending_side = Participant::pending(pending_id);
        let user = Participant::registered(user_id);
        let rows = settlements::Entity::find()
            .filter(settlements::Column::GroupId.eq(group_id.to_string()))
            .all(db)
            .await?;

        let mut touched = 0;
        for row in rows {
            let from = Participant::from_parts(&row.from_kind, row.from_id.clone())?;
            let to = Participant::from_parts(&row.to_kind, row.to_id.clone())?;
            if from != pending_side && to != pending_side {
                continue;
            }
            let swap = |p: Participant| if p == pending_side { user.clone() } else { p };
            let (from, to) = (swap(from), swap(to));
            touched += 1;

            if from == to {
                tracing::warn!(settlement_id = %row.id, user_id, "dropping settlement to self");
                settlements::Entity::delete_by_id(row.id).exec(db).await?;
                continue;
            }

            let pending = row.status == SettlementStatus::Pending.as_str();
            let key = pending.then(|| outstanding_key(group_id, &from, &to));
            if let Some(key) = &key {
                let outstanding = settlements::Entity::find()
                    .filter(settlements::Column::OutstandingKey.eq(key.clone()))
                    .filter(settlements::Column::Id.ne(row.id.clone()))
                    .one(db)
                    .await?;
                if let Some(outstanding) = outstanding {
                    let total = outstanding.amount_minor + row.amount_minor;
                    let mut active: settlements::ActiveModel = outstanding.into();
                    active.amount_minor = ActiveValue::Set(total);
                    active.update(db).await?;
                    settlements::Entity::delete_by_id(row.id).exec(db).await?;
                    continue;
                }
            }

            let mut active: settlements::ActiveModel = row.into();
            active.from_kind = ActiveValue::Set(from.kind().as_str().to_string());
            active.from_id = ActiveValue::Set(from.id().to_string());
            active.to_kind = ActiveValue::Set(to.kind().as_str().to_string());
            active.to_id = ActiveValue::Set(to.id().to_string());
            active.outstanding_key = ActiveValue::Set(key);
            active.update(db).await?;
        }
        Ok(touched)
    }
}
