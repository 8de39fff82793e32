use serde::{Deserialize, Serialize};

use shopledger_core::UserId;

use crate::Role;

/// Authenticated identity passed explicitly into every core operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Session established by a successful login.
///
/// Holds what the caller needs to display plus the identity used for
/// authorization downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl Session {
    pub fn identity(&self) -> Identity {
        Identity::new(self.user_id, self.role)
    }
}
