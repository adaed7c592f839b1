use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Application role, read from the token's `role` claim and falling back
    /// to `app_metadata.role` style metadata when the claim is the generic
    /// Supabase `authenticated`.
    pub fn caller_role(&self) -> CallerRole {
        let from_metadata = self
            .metadata
            .as_ref()
            .and_then(|m| m.get("role"))
            .and_then(|r| r.as_str());

        match self.role.as_deref() {
            Some(role) if role != "authenticated" => CallerRole::from_str_lossy(role),
            _ => from_metadata
                .map(CallerRole::from_str_lossy)
                .unwrap_or(CallerRole::Patient),
        }
    }
}

/// Who is asking. Identity lives outside the matcher; the role only widens
/// or narrows what the directory is allowed to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallerRole {
    Patient,
    Doctor,
    Admin,
}

impl CallerRole {
    pub fn from_str_lossy(role: &str) -> Self {
        match role.trim().to_lowercase().as_str() {
            "admin" => CallerRole::Admin,
            "doctor" => CallerRole::Doctor,
            _ => CallerRole::Patient,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, CallerRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(role: Option<&str>, metadata: Option<serde_json::Value>) -> User {
        User {
            id: "u1".to_string(),
            email: None,
            role: role.map(String::from),
            metadata,
            created_at: None,
        }
    }

    #[test]
    fn test_role_from_claim() {
        assert_eq!(user(Some("admin"), None).caller_role(), CallerRole::Admin);
        assert_eq!(user(Some("Doctor"), None).caller_role(), CallerRole::Doctor);
        assert_eq!(user(None, None).caller_role(), CallerRole::Patient);
    }

    #[test]
    fn test_role_from_metadata_when_generic_claim() {
        let u = user(Some("authenticated"), Some(json!({ "role": "admin" })));
        assert_eq!(u.caller_role(), CallerRole::Admin);
    }
}
