use std::fmt;

use serde::{Deserialize, Serialize};

/// The signed-in user as the backend describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// Passwords stay out of logs and panic messages.
impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterData {
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUserData {
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_image_url_is_optional() {
        let user: User = serde_json::from_str(r#"{"name":"A","email":"a@b.com"}"#).unwrap();
        assert!(user.image_url.is_none());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn debug_output_redacts_password() {
        let req = LoginRequest {
            email: "a@b.com".to_string(),
            password: "secret1".to_string(),
        };
        let shown = format!("{req:?}");
        assert!(shown.contains("a@b.com"));
        assert!(!shown.contains("secret1"));
    }
}
