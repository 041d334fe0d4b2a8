//! Wire models for the captioning API.
//!
//! Older server revisions disagree on field names and on the shape of a
//! role (bare id, bare name, or object). Everything is normalized here,
//! once, so the rest of the crate only ever sees [`Role`] and [`User`].

use serde::{Deserialize, Deserializer, Serialize};

/// Reserved id of the admin role.
pub const ADMIN_ROLE_ID: u32 = 1;
/// Id of the default role assigned at signup.
pub const USER_ROLE_ID: u32 = 2;
/// Id given to role names this client does not know. Never admin.
pub const UNKNOWN_ROLE_ID: u32 = 0;

/// A named permission grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRole")]
pub struct Role {
    pub id: u32,
    #[serde(rename = "roleType")]
    pub name: String,
}

impl Role {
    pub fn admin() -> Self {
        Self::from_id(ADMIN_ROLE_ID)
    }

    pub fn user() -> Self {
        Self::from_id(USER_ROLE_ID)
    }

    /// Build a role from its id, naming the well-known ones.
    pub fn from_id(id: u32) -> Self {
        let name = match id {
            ADMIN_ROLE_ID => "admin".to_string(),
            USER_ROLE_ID => "user".to_string(),
            other => format!("role-{}", other),
        };
        Self { id, name }
    }

    /// Resolve a role name ("admin", "user", or a numeric string).
    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if let Ok(id) = trimmed.parse::<u32>() {
            return Some(Self::from_id(id));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "admin" => Some(Self::admin()),
            "user" => Some(Self::user()),
            _ => None,
        }
    }

    /// Resolve a name, keeping unrecognised ones as non-admin roles.
    /// Fails only for a blank name.
    pub fn from_any_name(name: &str) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("role name is empty".to_string());
        }
        Ok(Self::from_name(name).unwrap_or_else(|| Self {
            id: UNKNOWN_ROLE_ID,
            name: name.trim().to_string(),
        }))
    }

    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_ROLE_ID
    }
}

/// Every role shape the API has been seen to emit.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRole {
    Id(u32),
    Name(String),
    Object {
        #[serde(default, alias = "role_id", alias = "roleId")]
        id: Option<u32>,
        #[serde(default, alias = "roleType", alias = "role_type", alias = "type")]
        name: Option<String>,
    },
}

impl TryFrom<RawRole> for Role {
    type Error = String;

    fn try_from(raw: RawRole) -> Result<Self, Self::Error> {
        match raw {
            RawRole::Id(id) => Ok(Role::from_id(id)),
            RawRole::Name(name) => Role::from_any_name(&name),
            RawRole::Object { id: Some(id), name } => Ok(Role {
                id,
                name: name.unwrap_or_else(|| Role::from_id(id).name),
            }),
            RawRole::Object { id: None, name: Some(name) } => Role::from_any_name(&name),
            RawRole::Object { id: None, name: None } => {
                Err("role object has neither id nor name".to_string())
            }
        }
    }
}

/// An account on the captioning service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "userId", alias = "user_id")]
    pub id: u64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, alias = "role", deserialize_with = "one_or_many_roles")]
    pub roles: Vec<Role>,
    #[serde(default, rename = "apiCalls", alias = "api_calls")]
    pub api_calls: u64,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }

    /// Role names in server order.
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.name.clone()).collect()
    }
}

fn one_or_many_roles<'de, D>(deserializer: D) -> Result<Vec<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Role>),
        One(Role),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::Many(roles)) => roles,
        Some(OneOrMany::One(role)) => vec![role],
        None => Vec::new(),
    })
}

/// Call counter for one endpoint, as reported by the admin stats route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStat {
    pub method: String,
    pub endpoint: String,
    #[serde(rename = "requestCount", alias = "request_count", alias = "count")]
    pub request_count: u64,
}

/// Body of login, create and verify responses.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsResponse {
    #[serde(default)]
    pub stats: Vec<EndpointStat>,
}

/// Result of a caption request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Caption {
    pub caption: String,
    #[serde(default, rename = "apiCalls", alias = "api_calls")]
    pub api_calls: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignupRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_object() {
        let role: Role = serde_json::from_str(r#"{"id": 1, "roleType": "admin"}"#).unwrap();
        assert_eq!(role, Role::admin());
    }

    #[test]
    fn test_role_from_number() {
        let role: Role = serde_json::from_str("2").unwrap();
        assert_eq!(role.name, "user");
        assert!(!role.is_admin());
    }

    #[test]
    fn test_role_from_string() {
        let role: Role = serde_json::from_str(r#""ADMIN""#).unwrap();
        assert!(role.is_admin());

        let numeric: Role = serde_json::from_str(r#""1""#).unwrap();
        assert!(numeric.is_admin());
    }

    #[test]
    fn test_role_object_without_name() {
        let role: Role = serde_json::from_str(r#"{"role_id": 7}"#).unwrap();
        assert_eq!(role.id, 7);
        assert_eq!(role.name, "role-7");
    }

    #[test]
    fn test_role_unknown_name_kept_as_non_admin() {
        let role: Role = serde_json::from_str(r#""moderator""#).unwrap();
        assert_eq!(role.id, UNKNOWN_ROLE_ID);
        assert_eq!(role.name, "moderator");
        assert!(!role.is_admin());

        let role: Role = serde_json::from_str(r#"{"roleType": "editor"}"#).unwrap();
        assert_eq!(role.name, "editor");
        assert!(!role.is_admin());
    }

    #[test]
    fn test_role_without_id_or_name_rejected() {
        assert!(serde_json::from_str::<Role>("{}").is_err());
        assert!(serde_json::from_str::<Role>(r#""  ""#).is_err());
    }

    #[test]
    fn test_user_with_unknown_role_still_decodes() {
        let users: UsersResponse = serde_json::from_str(
            r#"{"users": [
                {"id": 2, "username": "bob", "roles": ["user"]},
                {"id": 9, "username": "mod", "roles": ["moderator"]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(users.users.len(), 2);
        assert_eq!(users.users[1].role_names(), vec!["moderator"]);
        assert!(!users.users[1].is_admin());
    }

    #[test]
    fn test_user_mixed_role_shapes() {
        let json = r#"{
            "id": 5,
            "username": "bob",
            "email": "bob@example.com",
            "roles": [2, {"id": 1, "roleType": "admin"}],
            "apiCalls": 12
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert!(user.is_admin());
        assert_eq!(user.role_names(), vec!["user", "admin"]);
        assert_eq!(user.api_calls, 12);
    }

    #[test]
    fn test_user_legacy_fields() {
        let json = r#"{"userId": 9, "username": "carol", "role": "user", "api_calls": 3}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 9);
        assert_eq!(user.roles, vec![Role::user()]);
        assert_eq!(user.api_calls, 3);
        assert!(user.email.is_none());
    }

    #[test]
    fn test_user_minimal() {
        let user: User = serde_json::from_str(r#"{"id":1,"username":"alice","roles":[]}"#).unwrap();
        assert!(!user.is_admin());
        assert_eq!(user.api_calls, 0);
    }

    #[test]
    fn test_user_null_roles() {
        let user: User =
            serde_json::from_str(r#"{"id":1,"username":"alice","roles":null}"#).unwrap();
        assert!(user.roles.is_empty());
    }

    #[test]
    fn test_user_serializes_role_objects() {
        let user = User {
            id: 3,
            username: "dave".to_string(),
            email: None,
            roles: vec![Role::admin()],
            api_calls: 1,
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["roles"][0]["roleType"], "admin");
        assert_eq!(value["apiCalls"], 1);

        let back: User = serde_json::from_value(value).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_endpoint_stat_aliases() {
        let stat: EndpointStat =
            serde_json::from_str(r#"{"method":"POST","endpoint":"/api/caption","count":4}"#)
                .unwrap();
        assert_eq!(stat.request_count, 4);
    }
}
