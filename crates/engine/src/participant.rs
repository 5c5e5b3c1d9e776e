//! Participants and the group roster.
//!
//! A [`Participant`] is whoever can pay for an expense, owe a split or take
//! part in a settlement. Registered users are identified by username; pending
//! participants (tracked by name and phone, no login) by a UUID scoped to one
//! group. The two id spaces never overlap.
//!
//! Every read path goes through [`resolve_participant`], so a reference to a
//! removed member simply resolves to `None` and is skipped by the ledger.

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Registered,
    Pending,
}

impl ParticipantKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Pending => "pending",
        }
    }
}

impl TryFrom<&str> for ParticipantKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "registered" => Ok(Self::Registered),
            "pending" => Ok(Self::Pending),
            other => Err(EngineError::InvalidInput(format!(
                "invalid participant kind: {other}"
            ))),
        }
    }
}

/// Who pays, owes, sends or receives money inside a group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Participant {
    Registered(String),
    Pending(String),
}

impl Participant {
    #[must_use]
    pub fn registered(user_id: impl Into<String>) -> Self {
        Self::Registered(user_id.into())
    }

    #[must_use]
    pub fn pending(pending_id: impl Into<String>) -> Self {
        Self::Pending(pending_id.into())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Registered(id) | Self::Pending(id) => id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ParticipantKind {
        match self {
            Self::Registered(_) => ParticipantKind::Registered,
            Self::Pending(_) => ParticipantKind::Pending,
        }
    }

    /// Returns the username when the participant is a registered user.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Registered(id) => Some(id),
            Self::Pending(_) => None,
        }
    }

    #[must_use]
    pub fn is_user(&self, user_id: &str) -> bool {
        self.user_id() == Some(user_id)
    }

    /// Rebuilds a participant from its stored `(kind, id)` columns.
    pub(crate) fn from_parts(kind: &str, id: String) -> ResultEngine<Self> {
        if id.trim().is_empty() {
            return Err(EngineError::InvalidId("empty participant id".to_string()));
        }
        Ok(match ParticipantKind::try_from(kind)? {
            ParticipantKind::Registered => Self::Registered(id),
            ParticipantKind::Pending => Self::Pending(id),
        })
    }
}

/// Participants are ordered by id first, so a pair of participants always
/// maps to the same `(a, b)` key no matter which side is seen first.
impl Ord for Participant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id()
            .cmp(other.id())
            .then_with(|| self.kind().cmp(&other.kind()))
    }
}

impl PartialOrd for Participant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered(id) => write!(f, "{id}"),
            Self::Pending(id) => write!(f, "pending:{id}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    Member,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl TryFrom<&str> for MemberRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            other => Err(EngineError::InvalidInput(format!(
                "invalid member role: {other}"
            ))),
        }
    }
}

/// A registered member of a group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
    pub display_name: String,
    pub role: MemberRole,
}

/// An unregistered person tracked inside one group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingParticipant {
    pub id: String,
    pub group_id: String,
    pub name: String,
    /// Phone number in canonical E.164 form.
    pub phone: String,
}

/// Resolved roster entry for a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RosterEntry<'a> {
    Member(&'a Member),
    Pending(&'a PendingParticipant),
}

impl<'a> RosterEntry<'a> {
    #[must_use]
    pub fn name(&self) -> &'a str {
        match self {
            Self::Member(member) => &member.display_name,
            Self::Pending(pending) => &pending.name,
        }
    }
}

/// The people of one group: ordered registered members, pending
/// participants and the group creator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub group_id: String,
    pub created_by: String,
    pub members: Vec<Member>,
    pub pending: Vec<PendingParticipant>,
}

impl Roster {
    /// All participants, registered members first, in roster order.
    pub fn participants(&self) -> impl Iterator<Item = Participant> + '_ {
        self.members
            .iter()
            .map(|m| Participant::Registered(m.user_id.clone()))
            .chain(
                self.pending
                    .iter()
                    .map(|p| Participant::Pending(p.id.clone())),
            )
    }

    #[must_use]
    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    #[must_use]
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member(user_id).is_some()
    }

    #[must_use]
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.member(user_id).is_some_and(|m| m.role.is_admin())
    }

    #[must_use]
    pub fn contains(&self, participant: &Participant) -> bool {
        resolve_participant(self, participant).is_some()
    }

    /// Display name of a participant, or its raw id when it no longer
    /// resolves.
    #[must_use]
    pub fn name_of(&self, participant: &Participant) -> String {
        resolve_participant(self, participant)
            .map(|entry| entry.name().to_string())
            .unwrap_or_else(|| participant.id().to_string())
    }
}

/// Resolves a participant against the roster of its group.
///
/// Returns `None` for references that no longer belong to the group (removed
/// members, merged pending participants).
#[must_use]
pub fn resolve_participant<'a>(
    roster: &'a Roster,
    participant: &Participant,
) -> Option<RosterEntry<'a>> {
    match participant {
        Participant::Registered(user_id) => roster.member(user_id).map(RosterEntry::Member),
        Participant::Pending(pending_id) => roster
            .pending
            .iter()
            .find(|p| &p.id == pending_id)
            .map(RosterEntry::Pending),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Roster {
        Roster {
            group_id: "g".to_string(),
            created_by: "alice".to_string(),
            members: vec![
                Member {
                    user_id: "alice".to_string(),
                    display_name: "Alice".to_string(),
                    role: MemberRole::Admin,
                },
                Member {
                    user_id: "bob".to_string(),
                    display_name: "Bob".to_string(),
                    role: MemberRole::Member,
                },
            ],
            pending: vec![PendingParticipant {
                id: "p-1".to_string(),
                group_id: "g".to_string(),
                name: "Dev".to_string(),
                phone: "+391234567890".to_string(),
            }],
        }
    }

    #[test]
    fn resolves_registered_and_pending() {
        let roster = roster();
        assert_eq!(
            resolve_participant(&roster, &Participant::registered("bob")).map(|e| e.name()),
            Some("Bob")
        );
        assert_eq!(
            resolve_participant(&roster, &Participant::pending("p-1")).map(|e| e.name()),
            Some("Dev")
        );
        assert!(resolve_participant(&roster, &Participant::registered("carol")).is_none());
        // Same id, wrong id space.
        assert!(resolve_participant(&roster, &Participant::pending("bob")).is_none());
    }

    #[test]
    fn ordering_is_by_id() {
        let a = Participant::registered("alice");
        let b = Participant::pending("bob");
        assert!(a < b);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn admin_flag_comes_from_role() {
        let roster = roster();
        assert!(roster.is_admin("alice"));
        assert!(!roster.is_admin("bob"));
        assert!(!roster.is_admin("carol"));
    }
}
