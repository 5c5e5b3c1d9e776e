//! Who is involved in each expense item.

use sea_orm::entity::prelude::*;

use crate::{Participant, ResultEngine};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_item_participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub participant_kind: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub participant_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expense_items::Entity",
        from = "Column::ItemId",
        to = "super::expense_items::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ExpenseItems,
}

impl Related<super::expense_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub(crate) fn participant(&self) -> ResultEngine<Participant> {
        Participant::from_parts(&self.participant_kind, self.participant_id.clone())
    }
}
