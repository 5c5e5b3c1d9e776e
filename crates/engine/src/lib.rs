//! Balance and settlement engine for shared expenses.
//!
//! Groups hold registered members and pending participants. Expenses record
//! who paid and how the amount is split; settlements record payments between
//! two participants and only count once the recipient confirms them. From
//! those the engine derives per-participant balances, a pairwise debt ledger
//! and the debts to settle.
//!
//! Pure computations live in [`ledger`]; everything that reads or writes the
//! database goes through [`Engine`].

pub use commands::{
    BalanceQuery, BalanceScope, CreateSettlementCmd, ExpenseCmd, ItemInput, RegisterUserCmd,
    SettlementListFilter, SplitRule,
};
pub use error::{EngineError, ErrorKind};
pub use expenses::{Expense, ExpenseItem, Split};
pub use groups::GroupKind;
pub use ledger::{
    Debt, DebtMode, LedgerSnapshot, NetDirection, PairEntry, PairTransaction, PairwiseLedger,
    ParticipantBalance, SETTLED_THRESHOLD, aggregate_balances, detailed_debts, minimal_transfers,
    simplified_debts,
};
pub use money::Money;
pub use notifier::{SettlementNotifier, TracingNotifier};
pub use ops::{
    DEFAULT_COUNTRY_CODE, Engine, EngineBuilder, Group, GroupBalances, ReconcileReport,
    Registration, User,
};
pub use participant::{
    Member, MemberRole, Participant, ParticipantKind, PendingParticipant, Roster, RosterEntry,
    resolve_participant,
};
pub use phone::normalize_phone;
pub use settlements::{Settlement, SettlementStatus};

mod commands;
mod error;
mod expense_item_participants;
mod expense_items;
mod expense_splits;
mod expenses;
mod group_members;
mod groups;
pub mod ledger;
mod money;
mod notifier;
mod ops;
mod participant;
mod pending_participants;
mod phone;
mod settlements;
mod splits;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
