use core::str::FromStr;

use serde::{Deserialize, Serialize};

use shopledger_core::DomainError;

/// Role used for authorization decisions.
///
/// Roles form a total order by level: `Admin > Manager > Staff > Viewer`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Full access, including user management.
    Admin,
    /// Manage inventory, categories, write-offs and reports.
    Manager,
    /// Add stock, record sales, view inventory.
    Staff,
    /// Read-only.
    Viewer,
}

impl Role {
    /// All roles, highest level first.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Staff, Role::Viewer];

    pub fn level(self) -> u8 {
        match self {
            Role::Admin => 4,
            Role::Manager => 3,
            Role::Staff => 2,
            Role::Viewer => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Staff => "STAFF",
            Role::Viewer => "VIEWER",
        }
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.level().cmp(&other.level())
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_totally_ordered_by_level() {
        assert!(Role::Admin > Role::Manager);
        assert!(Role::Manager > Role::Staff);
        assert!(Role::Staff > Role::Viewer);

        let mut shuffled = vec![Role::Staff, Role::Admin, Role::Viewer, Role::Manager];
        shuffled.sort_by(|a, b| b.cmp(a));
        assert_eq!(shuffled, Role::ALL.to_vec());
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("MANAGER".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("viewer".parse::<Role>().unwrap(), Role::Viewer);
        assert!("OWNER".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Staff).unwrap(), "\"STAFF\"");
    }
}
