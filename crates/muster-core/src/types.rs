//! Shared types.
//!
//! Most domain types live in their respective modules (geo, attendance);
//! this module holds the handful shared across the whole crate.

use serde::{Deserialize, Serialize};

/// The signed-in portal user an attendance action is performed for.
///
/// Threaded explicitly through the service instead of living in a
/// process-wide session store, so callers stay decoupled from how the
/// session is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Portal user id.
    pub id: String,

    /// Display name, used in user-visible messages.
    pub name: String,
}

impl UserContext {
    /// Create a user context.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
