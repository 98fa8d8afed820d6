//! User, role and session models.
//!
//! These mirror the user records returned by the school-management API.
//! Profile fields the client does not know about are preserved verbatim so
//! that a profile merge or a save/load cycle never drops data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a signed-in user.
///
/// The set is closed: anything the server sends outside the five known
/// roles parses to `Unknown`. `User` keeps the raw `role_type` string, so
/// an unrecognised role is never rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
    Parent,
    Staff,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Every role a user can actually hold.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Teacher,
        Role::Student,
        Role::Parent,
        Role::Staff,
    ];

    /// Lowercase wire name, as used in `role_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
            Role::Staff => "staff",
            Role::Unknown => "unknown",
        }
    }

    /// Human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
            Role::Parent => "Parent",
            Role::Staff => "Staff",
            Role::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    /// Never fails: unrecognised names map to `Role::Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let role = match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "teacher" => Role::Teacher,
            "student" => Role::Student,
            "parent" => Role::Parent,
            "staff" => Role::Staff,
            _ => Role::Unknown,
        };
        Ok(role)
    }
}

/// A user record as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    #[serde(rename = "user_id", alias = "id")]
    pub id: i64,
    pub username: String,
    /// Role name as sent by the server, see [`User::role`].
    pub role_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    /// Remaining profile fields, kept as sent by the server.
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub profile: Map<String, Value>,
}

impl User {
    pub fn role(&self) -> Role {
        self.role_type.parse().unwrap_or(Role::Unknown)
    }

    /// Shallow-merge `fields` over this user.
    ///
    /// Fields present in `fields` overwrite, everything else is kept. The
    /// merged record must still be a valid user, otherwise `self` is left
    /// untouched and the parse error is returned.
    pub fn merged_with(&self, fields: &Map<String, Value>) -> Result<User, serde_json::Error> {
        let mut base = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in fields {
            // `id` and `user_id` name the same field
            let key = if key == "id" { "user_id" } else { key.as_str() };
            base.insert(key.to_string(), value.clone());
        }
        serde_json::from_value(Value::Object(base))
    }
}

/// A signed-in session: bearer token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    pub fn role(&self) -> Role {
        self.user.role()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn admin() -> User {
        serde_json::from_value(json!({
            "id": 1,
            "username": "admin",
            "role_type": "admin"
        }))
        .expect("valid user")
    }

    #[test]
    fn test_role_parse_known_and_unknown() {
        assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert_eq!(" Staff ".parse::<Role>().unwrap(), Role::Staff);
        assert_eq!("principal".parse::<Role>().unwrap(), Role::Unknown);
    }

    #[test]
    fn test_unknown_role_deserializes() {
        let user: User = serde_json::from_value(json!({
            "user_id": 9,
            "username": "janitor",
            "role_type": "custodian"
        }))
        .unwrap();
        assert_eq!(user.role(), Role::Unknown);
    }

    #[test]
    fn test_unknown_role_name_survives_round_trip() {
        let user: User = serde_json::from_value(json!({
            "user_id": 9,
            "username": "janitor",
            "role_type": "custodian"
        }))
        .unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role_type"], json!("custodian"));

        let round: User = serde_json::from_value(json).unwrap();
        assert_eq!(round.role_type, "custodian");
        assert_eq!(round.role(), Role::Unknown);
    }

    #[test]
    fn test_user_accepts_id_alias_and_keeps_extra_fields() {
        let user: User = serde_json::from_value(json!({
            "user_id": 4,
            "username": "mrs.k",
            "role_type": "teacher",
            "department": "Science"
        }))
        .unwrap();
        assert_eq!(user.id, 4);
        assert_eq!(user.profile.get("department"), Some(&json!("Science")));

        let round: User = serde_json::from_str(&serde_json::to_string(&user).unwrap()).unwrap();
        assert_eq!(round, user);
    }

    #[test]
    fn test_merge_overwrites_and_retains() {
        let mut user = admin();
        user.email = Some("old@school.test".to_string());
        user.profile.insert("phone".to_string(), json!("555-0100"));

        let update = json!({ "email": "new@school.test", "avatar": "a.png" });
        let merged = user.merged_with(update.as_object().unwrap()).unwrap();

        assert_eq!(merged.email.as_deref(), Some("new@school.test"));
        assert_eq!(merged.avatar.as_deref(), Some("a.png"));
        assert_eq!(merged.username, "admin");
        assert_eq!(merged.profile.get("phone"), Some(&json!("555-0100")));
    }

    #[test]
    fn test_merge_rejects_invalid_result() {
        let user = admin();
        let update = json!({ "username": 42 });
        assert!(user.merged_with(update.as_object().unwrap()).is_err());
    }
}
