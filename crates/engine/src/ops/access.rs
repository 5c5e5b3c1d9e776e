use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{
    EngineError, Member, MemberRole, Participant, PendingParticipant, ResultEngine, Roster,
    group_members, groups, pending_participants, users,
};

use super::Engine;

/// Generates `find_*` and `require_*` lookups by primary key.
macro_rules! impl_require_by_id {
    ($find_fn:ident, $require_fn:ident, $entity:path, $model:path, $err_msg:literal) => {
        pub(super) async fn $find_fn(
            &self,
            db: &DatabaseTransaction,
            id: &str,
        ) -> ResultEngine<Option<$model>> {
            <$entity>::find_by_id(id.to_string())
                .one(db)
                .await
                .map_err(Into::into)
        }

        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            id: &str,
        ) -> ResultEngine<$model> {
            self.$find_fn(db, id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_require_by_id!(
        find_group,
        require_group,
        groups::Entity,
        groups::Model,
        "group not exists"
    );

    impl_require_by_id!(
        find_user,
        require_user,
        users::Entity,
        users::Model,
        "user not exists"
    );

    /// Members (in join order) and pending participants of a group.
    pub(super) async fn load_roster(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Roster> {
        let group = self.require_group(db, group_id).await?;

        let member_models: Vec<group_members::Model> = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(group_members::Column::JoinedAt)
            .order_by_asc(group_members::Column::UserId)
            .all(db)
            .await?;
        let usernames: Vec<String> = member_models.iter().map(|m| m.user_id.clone()).collect();
        let display_names: HashMap<String, String> = users::Entity::find()
            .filter(users::Column::Username.is_in(usernames))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.username, u.display_name))
            .collect();

        let mut members = Vec::with_capacity(member_models.len());
        for model in member_models {
            let role = match MemberRole::try_from(model.role.as_str()) {
                Ok(role) => role,
                Err(err) => {
                    tracing::warn!(
                        group_id,
                        user_id = %model.user_id,
                        %err,
                        "skipping member with unreadable role"
                    );
                    continue;
                }
            };
            members.push(Member {
                display_name: display_names
                    .get(&model.user_id)
                    .cloned()
                    .unwrap_or_else(|| model.user_id.clone()),
                user_id: model.user_id,
                role,
            });
        }

        let pending: Vec<PendingParticipant> = pending_participants::Entity::find()
            .filter(pending_participants::Column::GroupId.eq(group_id.to_string()))
            .order_by_asc(pending_participants::Column::Name)
            .order_by_asc(pending_participants::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(PendingParticipant::from)
            .collect();

        Ok(Roster {
            group_id: group.id,
            created_by: group.created_by,
            members,
            pending,
        })
    }
}

pub(super) fn require_member<'a>(roster: &'a Roster, user_id: &str) -> ResultEngine<&'a Member> {
    roster.member(user_id).ok_or_else(|| {
        EngineError::Forbidden(format!(
            "{user_id} is not a member of group {}",
            roster.group_id
        ))
    })
}

pub(super) fn require_admin<'a>(roster: &'a Roster, user_id: &str) -> ResultEngine<&'a Member> {
    let member = require_member(roster, user_id)?;
    if !member.role.is_admin() {
        return Err(EngineError::Forbidden(format!(
            "{user_id} is not an admin of group {}",
            roster.group_id
        )));
    }
    Ok(member)
}

/// Fails with a validation error when `participant` is not part of the group.
pub(super) fn require_in_roster(
    roster: &Roster,
    participant: &Participant,
    label: &str,
) -> ResultEngine<()> {
    if !roster.contains(participant) {
        return Err(EngineError::InvalidInput(format!(
            "{label} {participant} is not part of group {}",
            roster.group_id
        )));
    }
    Ok(())
}
