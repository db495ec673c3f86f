//! Signed-in user details supplied by the session collaborator.

use serde::{Deserialize, Serialize};

/// Read-only identity shown in the form header. Credentials never reach the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub display_name: String,
    pub avatar_uri: Option<String>,
}
