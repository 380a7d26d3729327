//! Access-control decision point.
//!
//! Maps (identity-or-anonymous, requirement) to allow/deny. The decision is a
//! pure function of its inputs and never re-validates the token; by the time an
//! identity reaches here the transport gate has already accepted it.

use crate::auth::identity::IdentityContext;

/// What a route demands of its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequirement {
    /// Open to everyone, anonymous callers included.
    None,
    /// Any verified identity.
    AnyAuthenticated,
    /// A verified identity whose roles contain this exact name.
    Role(String),
}

impl AccessRequirement {
    pub fn role(name: impl Into<String>) -> Self {
        AccessRequirement::Role(name.into())
    }
}

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity was presented for a route that needs one.
    NotAuthenticated,
    /// The identity lacks the required role.
    InsufficientRole,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotAuthenticated => "not_authenticated",
            DenyReason::InsufficientRole => "insufficient_role",
        }
    }
}

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    /// Bounded label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDecision::Allow => "allow",
            AccessDecision::Deny(_) => "deny",
        }
    }
}

/// Decide whether `identity` satisfies `requirement`.
///
/// Role comparison is exact and case-sensitive.
pub fn authorize(
    identity: Option<&IdentityContext>,
    requirement: &AccessRequirement,
) -> AccessDecision {
    match (requirement, identity) {
        (AccessRequirement::None, _) => AccessDecision::Allow,
        (_, None) => AccessDecision::Deny(DenyReason::NotAuthenticated),
        (AccessRequirement::AnyAuthenticated, Some(_)) => AccessDecision::Allow,
        (AccessRequirement::Role(role), Some(identity)) => {
            if identity.has_role(role) {
                AccessDecision::Allow
            } else {
                AccessDecision::Deny(DenyReason::InsufficientRole)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::identity::test_support::identity_with_roles;

    #[test]
    fn test_none_allows_anonymous() {
        assert_eq!(
            authorize(None, &AccessRequirement::None),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_none_allows_authenticated() {
        let identity = identity_with_roles("u", &[]);
        assert_eq!(
            authorize(Some(&identity), &AccessRequirement::None),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_any_authenticated_denies_anonymous() {
        assert_eq!(
            authorize(None, &AccessRequirement::AnyAuthenticated),
            AccessDecision::Deny(DenyReason::NotAuthenticated)
        );
    }

    #[test]
    fn test_any_authenticated_allows_identity_without_roles() {
        let identity = identity_with_roles("u", &[]);
        assert_eq!(
            authorize(Some(&identity), &AccessRequirement::AnyAuthenticated),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_role_denies_anonymous_as_not_authenticated() {
        assert_eq!(
            authorize(None, &AccessRequirement::role("Admin")),
            AccessDecision::Deny(DenyReason::NotAuthenticated)
        );
    }

    #[test]
    fn test_role_allows_matching_role() {
        let identity = identity_with_roles("u", &["Customer", "Admin"]);
        assert_eq!(
            authorize(Some(&identity), &AccessRequirement::role("Admin")),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_role_denies_missing_role() {
        let identity = identity_with_roles("u", &["Customer"]);
        assert_eq!(
            authorize(Some(&identity), &AccessRequirement::role("Admin")),
            AccessDecision::Deny(DenyReason::InsufficientRole)
        );
    }

    #[test]
    fn test_role_comparison_is_case_sensitive() {
        let identity = identity_with_roles("u", &["admin"]);
        assert_eq!(
            authorize(Some(&identity), &AccessRequirement::role("Admin")),
            AccessDecision::Deny(DenyReason::InsufficientRole)
        );
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(AccessDecision::Allow.as_str(), "allow");
        assert_eq!(
            AccessDecision::Deny(DenyReason::InsufficientRole).as_str(),
            "deny"
        );
        assert_eq!(DenyReason::NotAuthenticated.as_str(), "not_authenticated");
        assert_eq!(DenyReason::InsufficientRole.as_str(), "insufficient_role");
    }
}
