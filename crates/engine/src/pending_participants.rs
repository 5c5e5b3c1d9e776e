//! Unregistered participants, scoped to one group.

use sea_orm::entity::prelude::*;

use crate::PendingParticipant;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "pending_participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub name: String,
    /// Canonical E.164 phone number.
    pub phone: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for PendingParticipant {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            group_id: model.group_id,
            name: model.name,
            phone: model.phone,
        }
    }
}
