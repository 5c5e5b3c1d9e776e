use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, GroupKind, MemberRole, PendingParticipant, ResultEngine, Roster, group_members,
    groups, normalize_phone, pending_participants, users,
    util::{new_id, normalize_required_name},
};

use super::{
    Engine,
    access::{require_admin, require_member},
    with_tx,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub kind: GroupKind,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<groups::Model> for Group {
    type Error = EngineError;

    fn try_from(model: groups::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: GroupKind::try_from(model.kind.as_str())?,
            id: model.id,
            name: model.name,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}

fn membership(group_id: &str, user_id: &str, role: MemberRole) -> group_members::ActiveModel {
    group_members::ActiveModel {
        group_id: ActiveValue::Set(group_id.to_string()),
        user_id: ActiveValue::Set(user_id.to_string()),
        role: ActiveValue::Set(role.as_str().to_string()),
        joined_at: ActiveValue::Set(Utc::now()),
    }
}

fn ensure_not_friendship(group: &groups::Model) -> ResultEngine<()> {
    if group.kind == GroupKind::Friendship.as_str() {
        return Err(EngineError::InvalidInput(
            "a friendship always has exactly its two members".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    async fn insert_group(
        &self,
        db: &DatabaseTransaction,
        name: String,
        kind: GroupKind,
        created_by: &str,
    ) -> ResultEngine<Group> {
        let group = Group {
            id: new_id(),
            name,
            kind,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        groups::ActiveModel {
            id: ActiveValue::Set(group.id.clone()),
            name: ActiveValue::Set(group.name.clone()),
            kind: ActiveValue::Set(kind.as_str().to_string()),
            created_by: ActiveValue::Set(group.created_by.clone()),
            created_at: ActiveValue::Set(group.created_at),
        }
        .insert(db)
        .await?;
        Ok(group)
    }

    /// Creates a group with `user_id` as its first admin.
    pub async fn create_group(&self, name: &str, user_id: &str) -> ResultEngine<Group> {
        let name = normalize_required_name(name, "group name")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let group = self
                .insert_group(&db_tx, name, GroupKind::Group, user_id)
                .await?;
            membership(&group.id, user_id, MemberRole::Admin)
                .insert(&db_tx)
                .await?;
            tracing::info!(group_id = %group.id, user_id, "group created");
            Ok(group)
        })
    }

    /// Creates the two-person context shared by `user_id` and `friend_id`.
    ///
    /// Both sides are admins. At most one friendship exists per pair.
    pub async fn create_friendship(&self, user_id: &str, friend_id: &str) -> ResultEngine<Group> {
        if user_id == friend_id {
            return Err(EngineError::InvalidInput(
                "cannot befriend yourself".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let user = self.require_user(&db_tx, user_id).await?;
            let friend = self.require_user(&db_tx, friend_id).await?;

            let mine: Vec<String> = group_members::Entity::find()
                .filter(group_members::Column::UserId.eq(user_id.to_string()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.group_id)
                .collect();
            let shared = group_members::Entity::find()
                .filter(group_members::Column::UserId.eq(friend_id.to_string()))
                .filter(group_members::Column::GroupId.is_in(mine))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.group_id)
                .collect::<Vec<_>>();
            let existing = groups::Entity::find()
                .filter(groups::Column::Id.is_in(shared))
                .filter(groups::Column::Kind.eq(GroupKind::Friendship.as_str()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(format!(
                    "friendship {user_id}/{friend_id}"
                )));
            }

            let name = format!("{} & {}", user.display_name, friend.display_name);
            let group = self
                .insert_group(&db_tx, name, GroupKind::Friendship, user_id)
                .await?;
            membership(&group.id, user_id, MemberRole::Admin)
                .insert(&db_tx)
                .await?;
            membership(&group.id, friend_id, MemberRole::Admin)
                .insert(&db_tx)
                .await?;
            tracing::info!(group_id = %group.id, user_id, friend_id, "friendship created");
            Ok(group)
        })
    }

    pub async fn group_roster(&self, group_id: &str, user_id: &str) -> ResultEngine<Roster> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_member(&roster, user_id)?;
            Ok(roster)
        })
    }

    pub async fn add_group_member(
        &self,
        group_id: &str,
        user_id: &str,
        member_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            ensure_not_friendship(&group)?;
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_admin(&roster, user_id)?;
            self.require_user(&db_tx, member_id).await?;
            if roster.is_member(member_id) {
                return Err(EngineError::ExistingKey(member_id.to_string()));
            }
            membership(group_id, member_id, MemberRole::Member)
                .insert(&db_tx)
                .await?;
            tracing::info!(group_id, member_id, "member added");
            Ok(())
        })
    }

    /// Removes a member. Their expenses and settlements stay in storage but
    /// no longer resolve, so balances skip them.
    pub async fn remove_group_member(
        &self,
        group_id: &str,
        user_id: &str,
        member_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group = self.require_group(&db_tx, group_id).await?;
            ensure_not_friendship(&group)?;
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_admin(&roster, user_id)?;
            let member = roster
                .member(member_id)
                .ok_or_else(|| EngineError::KeyNotFound(format!("member {member_id}")))?;
            if member.role.is_admin() && admin_count(&roster) == 1 {
                return Err(EngineError::Conflict(
                    "a group needs at least one admin".to_string(),
                ));
            }
            group_members::Entity::delete_by_id((group_id.to_string(), member_id.to_string()))
                .exec(&db_tx)
                .await?;
            tracing::info!(group_id, member_id, "member removed");
            Ok(())
        })
    }

    pub async fn set_member_role(
        &self,
        group_id: &str,
        user_id: &str,
        member_id: &str,
        role: MemberRole,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_admin(&roster, user_id)?;
            let member = roster
                .member(member_id)
                .ok_or_else(|| EngineError::KeyNotFound(format!("member {member_id}")))?;
            if member.role == role {
                return Ok(());
            }
            if member.role.is_admin() && admin_count(&roster) == 1 {
                return Err(EngineError::Conflict(
                    "a group needs at least one admin".to_string(),
                ));
            }
            group_members::Entity::update_many()
                .col_expr(group_members::Column::Role, Expr::value(role.as_str()))
                .filter(group_members::Column::GroupId.eq(group_id.to_string()))
                .filter(group_members::Column::UserId.eq(member_id.to_string()))
                .exec(&db_tx)
                .await?;
            tracing::info!(group_id, member_id, role = role.as_str(), "member role changed");
            Ok(())
        })
    }

    /// Tracks someone without an account by name and phone.
    ///
    /// Phones already claimed by a registered user are refused: that user
    /// should be added as a member instead.
    pub async fn add_pending_participant(
        &self,
        group_id: &str,
        user_id: &str,
        name: &str,
        phone: &str,
    ) -> ResultEngine<PendingParticipant> {
        let name = normalize_required_name(name, "participant name")?;
        let phone = normalize_phone(phone, &self.default_country_code)?;
        with_tx!(self, |db_tx| {
            let roster = self.load_roster(&db_tx, group_id).await?;
            require_member(&roster, user_id)?;

            let owner = users::Entity::find()
                .filter(users::Column::Phone.eq(phone.clone()))
                .one(&db_tx)
                .await?;
            if let Some(owner) = owner {
                return Err(EngineError::Conflict(if roster.is_member(&owner.username) {
                    format!("{phone} belongs to member {}", owner.username)
                } else {
                    format!("{phone} belongs to registered user {}", owner.username)
                }));
            }

            let pending = PendingParticipant {
                id: new_id(),
                group_id: group_id.to_string(),
                name,
                phone,
            };
            pending_participants::ActiveModel {
                id: ActiveValue::Set(pending.id.clone()),
                group_id: ActiveValue::Set(pending.group_id.clone()),
                name: ActiveValue::Set(pending.name.clone()),
                phone: ActiveValue::Set(pending.phone.clone()),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| match err.sql_err() {
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => {
                    EngineError::ExistingKey(pending.phone.clone())
                }
                _ => EngineError::Database(err),
            })?;
            tracing::info!(group_id, pending_id = %pending.id, "pending participant added");
            Ok(pending)
        })
    }
}

fn admin_count(roster: &Roster) -> usize {
    roster.members.iter().filter(|m| m.role.is_admin()).count()
}
