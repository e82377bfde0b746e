//! Roles

use std::fmt;

use serde::Deserialize;

/// Who the session is acting as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// No role picked yet.
    #[default]
    Anonymous,

    /// A customer browsing and reserving deals.
    Customer,

    /// A business partner publishing deals.
    Business,
}

impl Role {
    /// Returns the role name as used by views.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Customer => "customer",
            Role::Business => "business",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_role_is_anonymous() {
        assert_eq!(Role::default(), Role::Anonymous);
    }

    #[test]
    fn display_matches_view_names() {
        assert_eq!(Role::Customer.to_string(), "customer");
        assert_eq!(Role::Business.to_string(), "business");
        assert_eq!(Role::Anonymous.to_string(), "anonymous");
    }
}
