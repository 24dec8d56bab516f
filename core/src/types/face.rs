use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a registered face relates to the household.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    Family,
    Friend,
    Employee,
    Neighbor,
    Other,
}

impl Relationship {
    pub const ALL: [Relationship; 5] = [
        Relationship::Family,
        Relationship::Friend,
        Relationship::Employee,
        Relationship::Neighbor,
        Relationship::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::Family => "family",
            Relationship::Friend => "friend",
            Relationship::Employee => "employee",
            Relationship::Neighbor => "neighbor",
            Relationship::Other => "other",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Relationship::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown relationship: {s}"))
    }
}

/// A face known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub is_authorized: bool,
}

/// `image` is a `data:image/...;base64,` URI produced by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFaceRequest {
    pub name: String,
    pub relationship: Relationship,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyFaceRequest {
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAuthorizationRequest {
    pub is_authorized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceData {
    pub face: Face,
}

/// `matched == false` is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyFaceData {
    #[serde(rename = "match")]
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<Face>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceList {
    #[serde(default)]
    pub faces: Vec<Face>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_parses_case_insensitively() {
        assert_eq!("Neighbor".parse::<Relationship>().unwrap(), Relationship::Neighbor);
        assert!("cousin".parse::<Relationship>().is_err());
    }

    #[test]
    fn relationship_rejects_values_outside_the_enumeration() {
        let result: Result<Face, _> =
            serde_json::from_str(r#"{"name":"Z","relationship":"cousin","is_authorized":true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn verify_data_uses_match_key() {
        let data: VerifyFaceData = serde_json::from_str(r#"{"match":false}"#).unwrap();
        assert!(!data.matched);
        assert!(data.face.is_none());
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["match"], false);
    }
}
