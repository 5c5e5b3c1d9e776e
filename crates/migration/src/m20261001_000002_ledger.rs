//! Ledger schema: expenses and settlements of a group.
//!
//! Participants are stored as a `(kind, id)` pair, `kind` being `registered`
//! (id = username) or `pending` (id = pending participant id).
//!
//! - `expenses`, `expense_splits`: who paid and how it is attributed
//! - `expense_items`, `expense_item_participants`: lines of itemised expenses
//! - `settlements`: payments between participants; `outstanding_key` is set
//!   only while a settlement is pending and is unique, so at most one payment
//!   per group and direction waits for confirmation

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Groups {
    Table,
    Id,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    GroupId,
    Description,
    AmountMinor,
    PayerKind,
    PayerId,
    Category,
    OccurredAt,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum ExpenseSplits {
    Table,
    Id,
    ExpenseId,
    ParticipantKind,
    ParticipantId,
    AmountMinor,
}

#[derive(Iden)]
enum ExpenseItems {
    Table,
    Id,
    ExpenseId,
    Name,
    AmountMinor,
    Position,
}

#[derive(Iden)]
enum ExpenseItemParticipants {
    Table,
    ItemId,
    ParticipantKind,
    ParticipantId,
}

#[derive(Iden)]
enum Settlements {
    Table,
    Id,
    GroupId,
    FromKind,
    FromId,
    ToKind,
    ToId,
    AmountMinor,
    Note,
    Status,
    OutstandingKey,
    CreatedBy,
    CreatedAt,
    ConfirmedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::GroupId).string().not_null())
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(ColumnDef::new(Expenses::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::PayerKind).string().not_null())
                    .col(ColumnDef::new(Expenses::PayerId).string().not_null())
                    .col(ColumnDef::new(Expenses::Category).string())
                    .col(ColumnDef::new(Expenses::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Expenses::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-group_id")
                            .from(Expenses::Table, Expenses::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-group_id-occurred_at")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .col(Expenses::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-payer")
                    .table(Expenses::Table)
                    .col(Expenses::PayerKind)
                    .col(Expenses::PayerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Expense splits
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseSplits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseSplits::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseSplits::ExpenseId).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseSplits::ParticipantKind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseSplits::ParticipantId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseSplits::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_splits-expense_id")
                            .from(ExpenseSplits::Table, ExpenseSplits::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_splits-expense_id-participant-unique")
                    .table(ExpenseSplits::Table)
                    .col(ExpenseSplits::ExpenseId)
                    .col(ExpenseSplits::ParticipantKind)
                    .col(ExpenseSplits::ParticipantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_splits-participant")
                    .table(ExpenseSplits::Table)
                    .col(ExpenseSplits::ParticipantKind)
                    .col(ExpenseSplits::ParticipantId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Expense items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ExpenseItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseItems::ExpenseId).string().not_null())
                    .col(ColumnDef::new(ExpenseItems::Name).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseItems::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpenseItems::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_items-expense_id")
                            .from(ExpenseItems::Table, ExpenseItems::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseItemParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseItemParticipants::ItemId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseItemParticipants::ParticipantKind)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseItemParticipants::ParticipantId)
                            .string()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ExpenseItemParticipants::ItemId)
                            .col(ExpenseItemParticipants::ParticipantKind)
                            .col(ExpenseItemParticipants::ParticipantId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_item_participants-item_id")
                            .from(
                                ExpenseItemParticipants::Table,
                                ExpenseItemParticipants::ItemId,
                            )
                            .to(ExpenseItems::Table, ExpenseItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Settlements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Settlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settlements::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settlements::GroupId).string().not_null())
                    .col(ColumnDef::new(Settlements::FromKind).string().not_null())
                    .col(ColumnDef::new(Settlements::FromId).string().not_null())
                    .col(ColumnDef::new(Settlements::ToKind).string().not_null())
                    .col(ColumnDef::new(Settlements::ToId).string().not_null())
                    .col(
                        ColumnDef::new(Settlements::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Settlements::Note).string())
                    .col(
                        ColumnDef::new(Settlements::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Settlements::OutstandingKey).string())
                    .col(ColumnDef::new(Settlements::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Settlements::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Settlements::ConfirmedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-settlements-group_id")
                            .from(Settlements::Table, Settlements::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // NULLs never collide, so only pending rows take part.
        manager
            .create_index(
                Index::create()
                    .name("idx-settlements-outstanding_key-unique")
                    .table(Settlements::Table)
                    .col(Settlements::OutstandingKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-settlements-group_id-created_at")
                    .table(Settlements::Table)
                    .col(Settlements::GroupId)
                    .col(Settlements::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settlements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseItemParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseSplits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        Ok(())
    }
}
