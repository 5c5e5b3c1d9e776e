use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, Expense, ExpenseCmd, ExpenseItem, Money, Participant, ResultEngine, Roster,
    Split, expense_item_participants, expense_items, expense_splits, expenses,
    splits::expand_rule,
    util::{ensure_positive, new_id, normalize_optional_text, normalize_required_name, parse_uuid},
};

use super::{
    Engine,
    access::{require_in_roster, require_member},
    with_tx,
};

/// Checks the expanded splits against the roster and the expense amount.
fn validate_splits(roster: &Roster, amount: Money, splits: &[Split]) -> ResultEngine<()> {
    if splits.is_empty() {
        return Err(EngineError::InvalidInput(
            "an expense needs at least one split".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(splits.len());
    for split in splits {
        require_in_roster(roster, &split.participant, "split participant")?;
        if !seen.insert(&split.participant) {
            return Err(EngineError::InvalidInput(format!(
                "{} appears in more than one split",
                split.participant
            )));
        }
        if split.amount.is_negative() {
            return Err(EngineError::InvalidAmount(
                "split amounts must be >= 0".to_string(),
            ));
        }
        if split.amount > Money::MAX {
            return Err(EngineError::InvalidAmount(format!(
                "split amounts must be <= {}",
                Money::MAX
            )));
        }
    }
    let total = splits
        .iter()
        .try_fold(Money::ZERO, |acc, s| acc.checked_add(s.amount))
        .ok_or_else(|| EngineError::InvalidAmount("split amounts overflow".to_string()))?;
    if total != amount {
        return Err(EngineError::InvalidAmount(format!(
            "splits add up to {total}, expense amount is {amount}"
        )));
    }
    Ok(())
}

/// Who may record an expense paid by `payer`: admins for anyone, members for
/// themselves or for a pending participant.
fn ensure_can_record(roster: &Roster, user_id: &str, payer: &Participant) -> ResultEngine<()> {
    if roster.is_admin(user_id) {
        return Ok(());
    }
    match payer {
        Participant::Registered(id) if id == user_id => Ok(()),
        Participant::Pending(_) => Ok(()),
        Participant::Registered(id) => Err(EngineError::Forbidden(format!(
            "only an admin can record an expense paid by {id}"
        ))),
    }
}

impl Engine {
    /// Validates a command against the roster and builds the expense it
    /// describes.
    fn build_expense(
        &self,
        roster: &Roster,
        cmd: &ExpenseCmd,
        id: String,
        created_by: String,
        created_at: chrono::DateTime<Utc>,
    ) -> ResultEngine<Expense> {
        let description = normalize_required_name(&cmd.description, "description")?;
        ensure_positive(cmd.amount, "expense amount")?;
        require_in_roster(roster, &cmd.payer, "payer")?;

        let expansion = expand_rule(cmd.amount, &cmd.rule)?;
        validate_splits(roster, cmd.amount, &expansion.splits)?;

        Ok(Expense {
            id,
            group_id: cmd.group_id.clone(),
            description,
            amount: cmd.amount,
            payer: cmd.payer.clone(),
            splits: expansion.splits,
            items: expansion.items,
            category: normalize_optional_text(cmd.category.as_deref()),
            occurred_at: cmd.occurred_at,
            created_by,
            created_at,
        })
    }

    async fn insert_children(&self, db: &DatabaseTransaction, expense: &Expense) -> ResultEngine<()> {
        for split in &expense.splits {
            expense_splits::ActiveModel {
                id: ActiveValue::Set(new_id()),
                expense_id: ActiveValue::Set(expense.id.clone()),
                participant_kind: ActiveValue::Set(split.participant.kind().as_str().to_string()),
                participant_id: ActiveValue::Set(split.participant.id().to_string()),
                amount_minor: ActiveValue::Set(split.amount.cents()),
            }
            .insert(db)
            .await?;
        }
        for (position, item) in expense.items.iter().enumerate() {
            expense_items::ActiveModel {
                id: ActiveValue::Set(item.id.clone()),
                expense_id: ActiveValue::Set(expense.id.clone()),
                name: ActiveValue::Set(item.name.clone()),
                amount_minor: ActiveValue::Set(item.amount.cents()),
                position: ActiveValue::Set(i32::try_from(position).unwrap_or(i32::MAX)),
            }
            .insert(db)
            .await?;
            for participant in &item.involved {
                expense_item_participants::ActiveModel {
                    item_id: ActiveValue::Set(item.id.clone()),
                    participant_kind: ActiveValue::Set(participant.kind().as_str().to_string()),
                    participant_id: ActiveValue::Set(participant.id().to_string()),
                }
                .insert(db)
                .await?;
            }
        }
        Ok(())
    }

    async fn delete_children(&self, db: &DatabaseTransaction, expense_id: &str) -> ResultEngine<()> {
        let item_ids: Vec<String> = expense_items::Entity::find()
            .filter(expense_items::Column::ExpenseId.eq(expense_id.to_string()))
            .all(db)
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();
        expense_item_participants::Entity::delete_many()
            .filter(expense_item_participants::Column::ItemId.is_in(item_ids))
            .exec(db)
            .await?;
        expense_items::Entity::delete_many()
            .filter(expense_items::Column::ExpenseId.eq(expense_id.to_string()))
            .exec(db)
            .await?;
        expense_splits::Entity::delete_many()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id.to_string()))
            .exec(db)
            .await?;
        Ok(())
    }

    async fn require_expense(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        expense_id: &str,
    ) -> ResultEngine<expenses::Model> {
        parse_uuid(expense_id, "expense")?;
        expenses::Entity::find_by_id(expense_id.to_string())
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))
    }

    pub async fn create_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, &cmd.group_id).await?;
            require_member(&roster, &cmd.user_id)?;
            ensure_can_record(&roster, &cmd.user_id, &cmd.payer)?;

            let expense =
                self.build_expense(&roster, &cmd, new_id(), cmd.user_id.clone(), Utc::now())?;
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
            self.insert_children(&db_tx, &expense).await?;

            tracing::info!(
                group_id = %expense.group_id,
                expense_id = %expense.id,
                amount = %expense.amount,
                splits = expense.splits.len(),
                "expense created"
            );
            Ok(expense)
        })
    }

    /// Replaces every field of an expense. Allowed to its creator and to
    /// group admins.
    pub async fn update_expense(&self, expense_id: &str, cmd: ExpenseCmd) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, &cmd.group_id).await?;
            require_member(&roster, &cmd.user_id)?;
            let current = self
                .require_expense(&db_tx, &cmd.group_id, expense_id)
                .await?;
            if current.created_by != cmd.user_id && !roster.is_admin(&cmd.user_id) {
                return Err(EngineError::Forbidden(
                    "only the creator or an admin can edit an expense".to_string(),
                ));
            }
            ensure_can_record(&roster, &cmd.user_id, &cmd.payer)?;

            let expense = self.build_expense(
                &roster,
                &cmd,
                current.id.clone(),
                current.created_by.clone(),
                current.created_at,
            )?;
            self.delete_children(&db_tx, &expense.id).await?;
            expenses::ActiveModel::from(&expense).update(&db_tx).await?;
            self.insert_children(&db_tx, &expense).await?;

            tracing::info!(expense_id = %expense.id, amount = %expense.amount, "expense updated");
            Ok(expense)
        })
    }

    /// Deletes an expense. Allowed to its payer and to group admins.
    pub async fn delete_expense(
        &self,
        group_id: &str,
        expense_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_member(&roster, user_id)?;
            let model = self.require_expense(&db_tx, group_id, expense_id).await?;
            let paid_by_caller = model.payer().is_ok_and(|payer| payer.is_user(user_id));
            if !paid_by_caller && !roster.is_admin(user_id) {
                return Err(EngineError::Forbidden(
                    "only the payer or an admin can delete an expense".to_string(),
                ));
            }
            self.delete_children(&db_tx, expense_id).await?;
            expenses::Entity::delete_by_id(expense_id.to_string())
                .exec(&db_tx)
                .await?;
            tracing::info!(group_id, expense_id, "expense deleted");
            Ok(())
        })
    }

    /// Expenses of a group, oldest first.
    pub async fn list_expenses(&self, group_id: &str, user_id: &str) -> ResultEngine<Vec<Expense>> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_member(&roster, user_id)?;
            self.load_expenses(&db_tx, group_id).await
        })
    }

    /// Reads every expense of a group with its splits and items.
    ///
    /// Rows that cannot be decoded are logged and skipped so one bad record
    /// does not hide the rest of the ledger.
    pub(super) async fn load_expenses(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Vec<Expense>> {
        let models: Vec<expenses::Model> = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(expenses::Column::OccurredAt)
            .order_by_asc(expenses::Column::Id)
            .all(db)
            .await?;
        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();

        let mut splits: HashMap<String, Vec<Split>> = HashMap::new();
        for model in expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.is_in(ids.clone()))
            .order_by_asc(expense_splits::Column::Id)
            .all(db)
            .await?
        {
            match model.participant() {
                Ok(participant) => splits
                    .entry(model.expense_id.clone())
                    .or_default()
                    .push(Split::new(participant, Money::new(model.amount_minor))),
                Err(err) => tracing::warn!(split_id = %model.id, %err, "skipping unreadable split"),
            }
        }

        let item_models: Vec<expense_items::Model> = expense_items::Entity::find()
            .filter(expense_items::Column::ExpenseId.is_in(ids))
            .order_by_asc(expense_items::Column::Position)
            .all(db)
            .await?;
        let item_ids: Vec<String> = item_models.iter().map(|i| i.id.clone()).collect();
        let mut involved: HashMap<String, Vec<Participant>> = HashMap::new();
        for model in expense_item_participants::Entity::find()
            .filter(expense_item_participants::Column::ItemId.is_in(item_ids))
            .all(db)
            .await?
        {
            if let Ok(participant) = model.participant() {
                involved
                    .entry(model.item_id.clone())
                    .or_default()
                    .push(participant);
            }
        }
        let mut items: HashMap<String, Vec<ExpenseItem>> = HashMap::new();
        for model in item_models {
            let mut participants = involved.remove(&model.id).unwrap_or_default();
            participants.sort();
            items.entry(model.expense_id).or_default().push(ExpenseItem {
                id: model.id,
                name: model.name,
                amount: Money::new(model.amount_minor),
                involved: participants,
            });
        }

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id.clone();
            match model.into_expense() {
                Ok(mut expense) => {
                    expense.splits = splits.remove(&id).unwrap_or_default();
                    expense.items = items.remove(&id).unwrap_or_default();
                    out.push(expense);
                }
                Err(err) => tracing::warn!(expense_id = %id, %err, "skipping unreadable expense"),
            }
        }
        tracing::debug!(group_id, expenses = out.len(), "expenses loaded");
        Ok(out)
    }
}
