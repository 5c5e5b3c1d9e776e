use chrono::Utc;
use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, RegisterUserCmd, ResultEngine, normalize_phone, users,
    util::normalize_required_name,
};

use super::{Engine, ReconcileReport, with_tx};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub display_name: String,
    pub phone: Option<String>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            username: model.username,
            display_name: model.display_name,
            phone: model.phone,
        }
    }
}

/// A new user and what their phone number pulled in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub user: User,
    pub reconciled: ReconcileReport,
}

impl Engine {
    /// Registers a user.
    ///
    /// When a phone is given it is normalised and every pending participant
    /// carrying it is merged into the new account.
    pub async fn register_user(&self, cmd: RegisterUserCmd) -> ResultEngine<Registration> {
        let username = normalize_required_name(&cmd.username, "username")?;
        if username.chars().any(char::is_whitespace) {
            return Err(EngineError::InvalidInput(
                "username must not contain whitespace".to_string(),
            ));
        }
        let display_name = normalize_required_name(&cmd.display_name, "display name")?;
        let phone = cmd
            .phone
            .as_deref()
            .map(|raw| normalize_phone(raw, &self.default_country_code))
            .transpose()?;

        let user = self.insert_user(username, display_name, phone).await?;
        let reconciled = match &user.phone {
            Some(phone) => {
                self.reconcile_pending_participant(phone, &user.username)
                    .await?
            }
            None => ReconcileReport::default(),
        };
        Ok(Registration { user, reconciled })
    }

    async fn insert_user(
        &self,
        username: String,
        display_name: String,
        phone: Option<String>,
    ) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            if self.find_user(&db_tx, &username).await?.is_some() {
                return Err(EngineError::ExistingKey(username));
            }
            let model = users::ActiveModel {
                username: ActiveValue::Set(username.clone()),
                display_name: ActiveValue::Set(display_name),
                phone: ActiveValue::Set(phone),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| EngineError::conflict_on_unique(err, "phone number already registered"))?;
            tracing::info!(username = %model.username, "user registered");
            Ok(User::from(model))
        })
    }

    pub async fn user(&self, username: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, username).await.map(User::from)
        })
    }
}
