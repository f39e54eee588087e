//! Account context for account-aware searches.
//!
//! The search layer does not interpret accounts. An [`AccountContext`] is
//! handed to a [`QueryAugmenter`], which may restrict the expression (for
//! example by adding permission filters) before it is optimized and executed.

use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::expression::Expression;

/// Identity of the caller of an account-aware search.
///
/// ```
/// use sift_search::account::AccountContext;
///
/// let account = AccountContext::new("u-17")
///     .with_role("editor")
///     .with_correlation_id("req-42");
///
/// assert!(account.has_role("editor"));
/// assert_eq!(account.correlation_id(), Some("req-42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    user_id: String,
    roles: BTreeSet<String>,
    correlation_id: Option<String>,
}

impl AccountContext {
    /// Creates a context for a user without roles.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: BTreeSet::new(),
            correlation_id: None,
        }
    }

    /// Adds a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Sets the correlation ID used for request tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Returns the user ID.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the roles.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    /// Returns `true` if the account has `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }
}

/// Rewrites a search expression for the calling account.
pub trait QueryAugmenter: Send + Sync + Debug {
    /// Returns the expression to execute for `account`.
    fn augment(&self, account: &AccountContext, expression: Expression) -> Expression;
}
