use chrono::Utc;
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    CreateSettlementCmd, EngineError, Participant, ResultEngine, Roster, Settlement,
    SettlementListFilter, SettlementStatus, settlements,
    settlements::outstanding_key,
    util::{ensure_positive, new_id, normalize_optional_text, parse_uuid},
};

use super::{
    Engine,
    access::{require_in_roster, require_member},
    with_tx,
};

/// Shape checks shared by every way of recording a payment.
fn validate_parties(roster: &Roster, cmd: &CreateSettlementCmd) -> ResultEngine<()> {
    if cmd.from == cmd.to {
        return Err(EngineError::InvalidInput(
            "a settlement needs two different participants".to_string(),
        ));
    }
    ensure_positive(cmd.amount, "settlement amount")?;
    require_in_roster(roster, &cmd.from, "payer")?;
    require_in_roster(roster, &cmd.to, "recipient")?;
    Ok(())
}

/// The recipient confirms; an admin stands in for a recipient without an
/// account.
fn may_confirm(roster: &Roster, user_id: &str, settlement: &Settlement) -> bool {
    match &settlement.to {
        Participant::Registered(to) => to == user_id,
        Participant::Pending(_) => roster.is_admin(user_id),
    }
}

/// Either party, the creator or an admin may withdraw a pending payment.
fn may_withdraw(roster: &Roster, user_id: &str, settlement: &Settlement) -> bool {
    settlement.from.is_user(user_id)
        || settlement.to.is_user(user_id)
        || settlement.created_by == user_id
        || roster.is_admin(user_id)
}

impl Engine {
    async fn require_settlement(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        settlement_id: &str,
    ) -> ResultEngine<Settlement> {
        parse_uuid(settlement_id, "settlement")?;
        let model = settlements::Entity::find_by_id(settlement_id.to_string())
            .filter(settlements::Column::GroupId.eq(group_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
        Settlement::try_from(model)
    }

    /// Every settlement of a group, oldest first. Undecodable rows are
    /// skipped.
    pub(super) async fn load_settlements(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<Settlement>> {
        let models = settlements::Entity::find()
            .filter(settlements::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(settlements::Column::CreatedAt)
            .order_by_asc(settlements::Column::Id)
            .all(db)
            .await?;
        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id.clone();
            match Settlement::try_from(model) {
                Ok(settlement) => out.push(settlement),
                Err(err) => {
                    tracing::warn!(settlement_id = %id, %err, "skipping unreadable settlement")
                }
            }
        }
        Ok(out)
    }

    async fn insert_settlement(
        &self,
        cmd: CreateSettlementCmd,
        status: SettlementStatus,
    ) -> ResultEngine<Settlement> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, &cmd.group_id).await?;
            require_member(&roster, &cmd.user_id)?;
            if status == SettlementStatus::Pending
                && !cmd.from.is_user(&cmd.user_id)
                && !roster.is_admin(&cmd.user_id)
            {
                return Err(EngineError::Forbidden(
                    "only the payer or an admin can record a payment".to_string(),
                ));
            }
            validate_parties(&roster, &cmd)?;

            let now = Utc::now();
            let settlement = Settlement {
                id: new_id(),
                group_id: cmd.group_id.clone(),
                from: cmd.from.clone(),
                to: cmd.to.clone(),
                amount: cmd.amount,
                note: normalize_optional_text(cmd.note.as_deref()),
                status,
                created_by: cmd.user_id.clone(),
                created_at: now,
                confirmed_at: (status == SettlementStatus::Confirmed).then_some(now),
            };

            let conflict = format!(
                "a pending settlement from {} to {} already exists",
                roster.name_of(&settlement.from),
                roster.name_of(&settlement.to)
            );
            if settlement.is_pending() {
                let key = outstanding_key(&settlement.group_id, &settlement.from, &settlement.to);
                let outstanding = settlements::Entity::find()
                    .filter(settlements::Column::OutstandingKey.eq(key))
                    .one(&db_tx)
                    .await?;
                if outstanding.is_some() {
                    return Err(EngineError::Conflict(conflict));
                }
            }
            // The unique index on `outstanding_key` catches a concurrent
            // insert that slipped past the lookup above.
            settlements::ActiveModel::from(&settlement)
                .insert(&db_tx)
                .await
                .map_err(|err| EngineError::conflict_on_unique(err, &conflict))?;

            tracing::info!(
                settlement_id = %settlement.id,
                group_id = %settlement.group_id,
                from = %settlement.from,
                to = %settlement.to,
                amount = %settlement.amount,
                status = settlement.status.as_str(),
                "settlement recorded"
            );
            Ok(settlement)
        })
    }

    /// Records a payment from `cmd.from` to `cmd.to`, waiting for the
    /// recipient's confirmation.
    ///
    /// The caller must be the payer or a group admin. Only one pending
    /// settlement may exist per group and direction.
    pub async fn create_settlement(&self, cmd: CreateSettlementCmd) -> ResultEngine<Settlement> {
        let settlement = self
            .insert_settlement(cmd, SettlementStatus::Pending)
            .await?;
        self.notifier.settlement_requested(&settlement);
        Ok(settlement)
    }

    /// The recipient records money they already received: the settlement is
    /// created confirmed.
    pub async fn record_received_payment(
        &self,
        cmd: CreateSettlementCmd,
    ) -> ResultEngine<Settlement> {
        if !cmd.to.is_user(&cmd.user_id) {
            return Err(EngineError::Forbidden(
                "only the recipient can record a received payment".to_string(),
            ));
        }
        let settlement = self
            .insert_settlement(cmd, SettlementStatus::Confirmed)
            .await?;
        self.notifier.settlement_confirmed(&settlement);
        Ok(settlement)
    }

    /// Confirms a pending settlement. From here on it counts in every
    /// balance.
    pub async fn confirm_settlement(
        &self,
        group_id: &str,
        settlement_id: &str,
        user_id: &str,
    ) -> ResultEngine<Settlement> {
        let settlement = self
            .mark_confirmed(group_id, settlement_id, user_id)
            .await?;
        self.notifier.settlement_confirmed(&settlement);
        Ok(settlement)
    }

    async fn mark_confirmed(
        &self,
        group_id: &str,
        settlement_id: &str,
        user_id: &str,
    ) -> ResultEngine<Settlement> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_member(&roster, user_id)?;
            let mut settlement = self
                .require_settlement(&db_tx, group_id, settlement_id)
                .await?;
            if !may_confirm(&roster, user_id, &settlement) {
                return Err(EngineError::Forbidden(
                    "only the recipient can confirm a settlement".to_string(),
                ));
            }
            if settlement.confirmed_by_recipient() {
                return Err(EngineError::Conflict(
                    "settlement already confirmed".to_string(),
                ));
            }

            let now = Utc::now();
            let updated = settlements::Entity::update_many()
                .col_expr(
                    settlements::Column::Status,
                    Expr::value(SettlementStatus::Confirmed.as_str()),
                )
                .col_expr(settlements::Column::ConfirmedAt, Expr::value(now))
                .col_expr(
                    settlements::Column::OutstandingKey,
                    Expr::value(Option::<String>::None),
                )
                .filter(settlements::Column::Id.eq(settlement_id.to_string()))
                .filter(settlements::Column::Status.eq(SettlementStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(EngineError::Conflict(
                    "settlement already confirmed".to_string(),
                ));
            }

            settlement.status = SettlementStatus::Confirmed;
            settlement.confirmed_at = Some(now);
            tracing::info!(settlement_id, group_id, user_id, "settlement confirmed");
            Ok(settlement)
        })
    }

    /// Withdraws a pending settlement. The record is removed.
    pub async fn reject_settlement(
        &self,
        group_id: &str,
        settlement_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_member(&roster, user_id)?;
            let settlement = self
                .require_settlement(&db_tx, group_id, settlement_id)
                .await?;
            if !may_withdraw(&roster, user_id, &settlement) {
                return Err(EngineError::Forbidden(
                    "only the parties or an admin can reject a settlement".to_string(),
                ));
            }
            if settlement.confirmed_by_recipient() {
                return Err(EngineError::Conflict(
                    "a confirmed settlement cannot be rejected".to_string(),
                ));
            }
            self.delete_pending(&db_tx, settlement_id).await?;
            tracing::info!(settlement_id, group_id, user_id, "settlement rejected");
            Ok(())
        })
    }

    /// Deletes a settlement. Pending ones follow the rules of
    /// [`Engine::reject_settlement`]; confirmed ones may only be removed by an
    /// admin, as a correction.
    pub async fn delete_settlement(
        &self,
        group_id: &str,
        settlement_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_member(&roster, user_id)?;
            let settlement = self
                .require_settlement(&db_tx, group_id, settlement_id)
                .await?;

            if settlement.confirmed_by_recipient() {
                if !roster.is_admin(user_id) {
                    return Err(EngineError::Forbidden(
                        "only an admin can delete a confirmed settlement".to_string(),
                    ));
                }
                settlements::Entity::delete_by_id(settlement_id.to_string())
                    .exec(&db_tx)
                    .await?;
                tracing::warn!(settlement_id, group_id, user_id, "confirmed settlement deleted");
            } else {
                if !may_withdraw(&roster, user_id, &settlement) {
                    return Err(EngineError::Forbidden(
                        "only the parties or an admin can delete a settlement".to_string(),
                    ));
                }
                self.delete_pending(&db_tx, settlement_id).await?;
                tracing::info!(settlement_id, group_id, user_id, "settlement deleted");
            }
            Ok(())
        })
    }

    /// Deletes a settlement only while it is still pending.
    async fn delete_pending(&self, db: &DatabaseTransaction, settlement_id: &str) -> ResultEngine<()> {
        let deleted = settlements::Entity::delete_many()
            .filter(settlements::Column::Id.eq(settlement_id.to_string()))
            .filter(settlements::Column::Status.eq(SettlementStatus::Pending.as_str()))
            .exec(db)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(EngineError::Conflict(
                "settlement was confirmed meanwhile".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn list_settlements(
        &self,
        group_id: &str,
        user_id: &str,
        filter: SettlementListFilter,
    ) -> ResultEngine<Vec<Settlement>> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_member(&roster, user_id)?;
            let settlements = self.load_settlements(&db_tx, group_id).await?;
            Ok(settlements
                .into_iter()
                .filter(|s| filter.status.is_none_or(|status| s.status == status))
                .filter(|s| {
                    filter
                        .involving
                        .as_ref()
                        .is_none_or(|p| &s.from == p || &s.to == p)
                })
                .collect())
        })
    }
}
