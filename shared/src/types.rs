//! Common types used across the CRM

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Caller role resolved by the authentication layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(alias = "dealer")]
    Salesperson,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Salesperson => "salesperson",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "salesperson" | "dealer" => Ok(Role::Salesperson),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Which salespersons' rows a caller may see.
///
/// Computed once per request from the caller's identity and threaded into
/// every scoped query instead of branching on role at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    All,
    Salesperson(Uuid),
}

impl AccessScope {
    pub fn for_caller(user_id: Uuid, role: Role) -> Self {
        match role {
            Role::Admin => AccessScope::All,
            Role::Salesperson => AccessScope::Salesperson(user_id),
        }
    }

    /// The salesperson filter to bind into a query; `None` means unrestricted
    pub fn salesperson_filter(&self) -> Option<Uuid> {
        match self {
            AccessScope::All => None,
            AccessScope::Salesperson(id) => Some(*id),
        }
    }

    /// Whether a row owned by `owner` is visible
    pub fn permits(&self, owner: Option<Uuid>) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Salesperson(id) => owner == Some(*id),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, AccessScope::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_for_roles() {
        let id = Uuid::new_v4();
        assert_eq!(AccessScope::for_caller(id, Role::Admin), AccessScope::All);
        assert_eq!(
            AccessScope::for_caller(id, Role::Salesperson).salesperson_filter(),
            Some(id)
        );
    }

    #[test]
    fn test_salesperson_scope_permits_only_own_rows() {
        let me = Uuid::new_v4();
        let scope = AccessScope::Salesperson(me);
        assert!(scope.permits(Some(me)));
        assert!(!scope.permits(Some(Uuid::new_v4())));
        assert!(!scope.permits(None));
        assert!(AccessScope::All.permits(None));
    }

    #[test]
    fn test_legacy_dealer_role() {
        assert_eq!("dealer".parse::<Role>(), Ok(Role::Salesperson));
        let role: Role = serde_json::from_str("\"dealer\"").unwrap();
        assert_eq!(role, Role::Salesperson);
    }
}
