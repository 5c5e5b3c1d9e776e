//! Groups: the context expenses and settlements live in.
//!
//! A friendship is stored as a group of kind `friendship` with exactly its
//! two members, so the ledger code never needs to tell them apart.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Group,
    Friendship,
}

impl GroupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Friendship => "friendship",
        }
    }
}

impl TryFrom<&str> for GroupKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "group" => Ok(Self::Group),
            "friendship" => Ok(Self::Friendship),
            other => Err(EngineError::InvalidInput(format!(
                "invalid group kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub kind: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
