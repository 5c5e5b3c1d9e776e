use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{ResultEngine, SettlementNotifier, TracingNotifier};

mod access;
mod balances;
mod expenses;
mod groups;
mod reconcile;
mod settlements;
mod users;

pub use balances::GroupBalances;
pub use groups::Group;
pub use reconcile::ReconcileReport;
pub use users::{Registration, User};

/// Country code applied to phone numbers written without one.
pub const DEFAULT_COUNTRY_CODE: &str = "39";

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    notifier: Arc<dyn SettlementNotifier>,
    default_country_code: String,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Option<Arc<dyn SettlementNotifier>>,
    default_country_code: Option<String>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Where settlement events go. Defaults to [`TracingNotifier`].
    pub fn notifier(mut self, notifier: Arc<dyn SettlementNotifier>) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    /// Country code (digits only, e.g. `"39"`) for national phone numbers.
    pub fn default_country_code(mut self, code: impl Into<String>) -> EngineBuilder {
        self.default_country_code = Some(code.into());
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let default_country_code = self
            .default_country_code
            .map(|code| code.trim().trim_start_matches('+').to_string())
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string());
        if default_country_code.is_empty()
            || !default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(crate::EngineError::InvalidInput(format!(
                "invalid default country code: {default_country_code:?}"
            )));
        }

        Ok(Engine {
            database: self.database,
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(TracingNotifier)),
            default_country_code,
        })
    }
}
