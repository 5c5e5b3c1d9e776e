//! Outbound notifications about settlements.
//!
//! The engine only reports that something happened; delivering a message to
//! a person (push, chat, mail) belongs to whoever implements the trait.

use std::fmt::Debug;

use crate::Settlement;

pub trait SettlementNotifier: Debug + Send + Sync {
    /// A pending settlement was created and waits for `settlement.to`.
    fn settlement_requested(&self, settlement: &Settlement);

    /// The recipient confirmed the payment.
    fn settlement_confirmed(&self, settlement: &Settlement);
}

/// Default notifier: writes an event to the log and nothing else.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl SettlementNotifier for TracingNotifier {
    fn settlement_requested(&self, settlement: &Settlement) {
        tracing::info!(
            settlement_id = %settlement.id,
            group_id = %settlement.group_id,
            from = %settlement.from,
            to = %settlement.to,
            amount = %settlement.amount,
            "settlement awaiting confirmation"
        );
    }

    fn settlement_confirmed(&self, settlement: &Settlement) {
        tracing::info!(
            settlement_id = %settlement.id,
            group_id = %settlement.group_id,
            to = %settlement.to,
            "settlement confirmed"
        );
    }
}
