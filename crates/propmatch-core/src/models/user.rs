use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Developer,
    Admin,
}

impl Role {
    /// Landing route for this role's dashboard
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Client => "/client",
            Role::Developer => "/developer",
            Role::Admin => "/admin",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Developer => "developer",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "developer" => Ok(Role::Developer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

fn default_active() -> bool {
    true
}

/// User profile as resolved by the identity service's "current user" call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, alias = "emailVerified")]
    pub email_verified: bool,
    #[serde(default = "default_active", alias = "isActive")]
    pub is_active: bool,
    #[serde(default, alias = "setupCompleted")]
    pub setup_completed: bool,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// First name for greetings, falling back to the email's local part
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if let Some(first) = name.split_whitespace().next() {
            return first;
        }
        self.email.split('@').next().unwrap_or(&self.email)
    }

    pub fn needs_verification(&self) -> bool {
        !self.email_verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!("client".parse::<Role>(), Ok(Role::Client));
        assert_eq!("Developer".parse::<Role>(), Ok(Role::Developer));
        assert_eq!(" ADMIN ".parse::<Role>(), Ok(Role::Admin));
        assert!("investor".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_dashboard_paths() {
        assert_eq!(Role::Client.dashboard_path(), "/client");
        assert_eq!(Role::Developer.dashboard_path(), "/developer");
        assert_eq!(Role::Admin.dashboard_path(), "/admin");
    }

    #[test]
    fn test_user_record_defaults() {
        let json = r#"{"id":"u1","name":"Ada Obi","email":"ada@example.com","role":"developer"}"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Developer);
        assert!(!user.email_verified);
        assert!(user.is_active);
        assert!(!user.setup_completed);
        assert!(user.created_at.is_none());
    }

    #[test]
    fn test_user_record_camel_case_aliases() {
        let json = r#"{
            "id": "u2",
            "name": "Tunde",
            "email": "tunde@example.com",
            "role": "client",
            "emailVerified": true,
            "isActive": false,
            "setupCompleted": true,
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;
        let user: UserRecord = serde_json::from_str(json).unwrap();
        assert!(user.email_verified);
        assert!(!user.is_active);
        assert!(user.setup_completed);
        assert!(user.created_at.is_some());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let json = r#"{"id":"u3","name":"X","email":"x@example.com","role":"owner"}"#;
        assert!(serde_json::from_str::<UserRecord>(json).is_err());
    }

    #[test]
    fn test_display_name() {
        let mut user: UserRecord = serde_json::from_str(
            r#"{"id":"u1","name":"Ada Obi","email":"ada@example.com","role":"client"}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), "Ada");
        user.name = "  ".to_string();
        assert_eq!(user.display_name(), "ada");
    }
}
