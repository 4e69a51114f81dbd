//! Expense scopes and the cache-key namespace derived from them.
//!
//! Every expense and budget belongs to exactly one [`Scope`]. The scope picks
//! the key prefix aggregates are cached under:
//!
//! | kind   | user scope            | team scope                 |
//! |--------|-----------------------|----------------------------|
//! | report | `report:{id}:{month}` | `team-report:{id}:{month}` |
//! | alert  | `alert:{id}:{month}`  | `team-alert:{id}:{month}`  |

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MonthKey, ResultEngine, util::parse_uuid};

/// Owner of a set of expenses and budgets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// Personal scope, keyed by username.
    User(String),
    /// Shared team scope.
    Team(Uuid),
}

/// The two derived aggregates kept in the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Report,
    Alert,
}

impl CacheKind {
    fn prefix(self, scope: &Scope) -> &'static str {
        match (self, scope) {
            (Self::Report, Scope::User(_)) => "report",
            (Self::Alert, Scope::User(_)) => "alert",
            (Self::Report, Scope::Team(_)) => "team-report",
            (Self::Alert, Scope::Team(_)) => "team-alert",
        }
    }
}

impl Scope {
    pub const USER: &'static str = "user";
    pub const TEAM: &'static str = "team";

    /// Storage discriminator (`user` / `team`).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => Self::USER,
            Self::Team(_) => Self::TEAM,
        }
    }

    /// Storage identifier: the username or the team UUID.
    pub fn id(&self) -> String {
        match self {
            Self::User(username) => username.clone(),
            Self::Team(team_id) => team_id.to_string(),
        }
    }

    pub fn is_team(&self) -> bool {
        matches!(self, Self::Team(_))
    }

    /// Rebuilds a scope from its stored `(kind, id)` pair.
    pub fn from_parts(kind: &str, id: &str) -> ResultEngine<Self> {
        match kind {
            Self::USER => Ok(Self::User(id.to_string())),
            Self::TEAM => Ok(Self::Team(parse_uuid(id, "team")?)),
            other => Err(EngineError::InvalidInput(format!(
                "invalid scope kind: {other}"
            ))),
        }
    }

    /// Cache key for the given aggregate of this scope and month.
    pub fn cache_key(&self, kind: CacheKind, month: MonthKey) -> String {
        resolve_key(kind, self, month)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Produces the cache key for `(kind, scope, month)`.
pub fn resolve_key(kind: CacheKind, scope: &Scope, month: MonthKey) -> String {
    format!("{}:{}:{}", kind.prefix(scope), scope.id(), month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june() -> MonthKey {
        "2024-06".parse().unwrap()
    }

    #[test]
    fn user_keys_use_plain_namespaces() {
        let scope = Scope::User("alice".to_string());
        assert_eq!(
            resolve_key(CacheKind::Report, &scope, june()),
            "report:alice:2024-06"
        );
        assert_eq!(
            resolve_key(CacheKind::Alert, &scope, june()),
            "alert:alice:2024-06"
        );
    }

    #[test]
    fn team_keys_use_team_namespaces() {
        let team_id = Uuid::nil();
        let scope = Scope::Team(team_id);
        assert_eq!(
            scope.cache_key(CacheKind::Report, june()),
            format!("team-report:{team_id}:2024-06")
        );
        assert_eq!(
            scope.cache_key(CacheKind::Alert, june()),
            format!("team-alert:{team_id}:2024-06")
        );
    }

    #[test]
    fn user_and_team_keys_never_collide() {
        let team_id = Uuid::new_v4();
        let as_team = Scope::Team(team_id);
        let as_user = Scope::User(team_id.to_string());
        assert_ne!(
            as_team.cache_key(CacheKind::Report, june()),
            as_user.cache_key(CacheKind::Report, june())
        );
    }

    #[test]
    fn parts_round_trip() {
        let team = Scope::Team(Uuid::new_v4());
        assert_eq!(Scope::from_parts(team.kind(), &team.id()).unwrap(), team);
        assert!(Scope::from_parts("team", "not-a-uuid").is_err());
        assert!(Scope::from_parts("org", "x").is_err());
    }
}
