//! Security context query surface.
//!
//! Pylon does not authenticate. A pre-matching or request filter that does
//! authenticate installs a [`SecurityContext`] on the request, and operations
//! or later filters query it.

use std::collections::BTreeSet;

/// Who is calling and over what channel.
///
/// # Example
///
/// ```rust
/// use pylon_core::SecurityContext;
///
/// let security = SecurityContext::authenticated("alice", "Bearer")
///     .with_role("admin")
///     .secure(true);
///
/// assert_eq!(security.principal(), Some("alice"));
/// assert!(security.is_user_in_role("admin"));
/// assert!(!security.is_user_in_role("auditor"));
/// assert!(security.is_secure());
/// assert_eq!(security.authentication_scheme(), Some("Bearer"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityContext {
    principal: Option<String>,
    roles: BTreeSet<String>,
    secure: bool,
    scheme: Option<String>,
}

impl SecurityContext {
    /// An unauthenticated caller.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated caller.
    #[must_use]
    pub fn authenticated(principal: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            principal: Some(principal.into()),
            scheme: Some(scheme.into()),
            ..Self::default()
        }
    }

    /// Grants a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Marks whether the request arrived over a secure channel.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// The principal name, if authenticated.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Role membership check. Always `false` for anonymous callers.
    #[must_use]
    pub fn is_user_in_role(&self, role: &str) -> bool {
        self.principal.is_some() && self.roles.contains(role)
    }

    /// Granted roles in sorted order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    /// Whether the request used https.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// The authentication scheme, e.g. `Basic` or `Bearer`.
    #[must_use]
    pub fn authentication_scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// A log-safe identifier for the caller.
    #[must_use]
    pub fn log_id(&self) -> String {
        match (&self.scheme, &self.principal) {
            (Some(scheme), Some(principal)) => format!("{}:{principal}", scheme.to_lowercase()),
            (None, Some(principal)) => principal.clone(),
            _ => "anonymous".to_string(),
        }
    }
}
