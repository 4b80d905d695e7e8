//! Resolvable entity kinds.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record identified by its reference URI.
///
/// The resolver merges batch responses by this field, not by the batch a
/// record arrived in.
pub trait Entity {
    fn uri(&self) -> &str;
}

/// A skill or knowledge concept referenced by URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competence {
    pub uri: String,
    #[serde(default)]
    pub preferred_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competence_type: Option<String>,
    /// Fields this crate does not model explicitly.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Competence {
    fn uri(&self) -> &str {
        &self.uri
    }
}

/// An occupation referenced by URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupation {
    pub uri: String,
    #[serde(default)]
    pub preferred_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Classification code (e.g. an ISCO group).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Occupation {
    fn uri(&self) -> &str {
        &self.uri
    }
}

/// Untyped passthrough: any JSON object with a string `uri` field.
///
/// Values without one report an empty URI and therefore never match a key.
impl Entity for Value {
    fn uri(&self) -> &str {
        self.get("uri").and_then(Value::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn competence_keeps_unknown_fields() {
        let c: Competence = serde_json::from_value(serde_json::json!({
            "uri": "http://data.europa.eu/esco/skill/abc",
            "preferredLabel": "welding",
            "skillReuseLevel": "cross-sector"
        }))
        .unwrap();
        assert_eq!(c.uri(), "http://data.europa.eu/esco/skill/abc");
        assert_eq!(c.preferred_label, "welding");
        assert!(c.description.is_none());
        assert_eq!(c.extra["skillReuseLevel"], "cross-sector");
    }

    #[test]
    fn occupation_code_is_optional() {
        let o: Occupation = serde_json::from_str(r#"{"uri":"u1","preferredLabel":"baker"}"#).unwrap();
        assert_eq!(o.uri(), "u1");
        assert!(o.code.is_none());
    }

    #[test]
    fn json_value_uri() {
        let v = serde_json::json!({ "uri": "u9", "x": 1 });
        assert_eq!(Entity::uri(&v), "u9");
        assert_eq!(Entity::uri(&serde_json::json!({ "id": 3 })), "");
    }
}
