//! Species catalogue and service health documents.

use serde::{Deserialize, Serialize};

/// Entry of `GET /api/species`.
///
/// The catalogue is sparsely populated server-side, so every field is
/// optional and unknown fields are preserved.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Species {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conservation_status: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// Document returned by `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

impl Health {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_species_keeps_unknown_fields() {
        let raw = json!({"common_name": "Leopard", "image_url": "https://x/leopard.jpg"});
        let species: Species = serde_json::from_value(raw).unwrap();
        assert_eq!(species.common_name.as_deref(), Some("Leopard"));
        assert_eq!(species.details["image_url"], "https://x/leopard.jpg");
    }

    #[test]
    fn test_health_ok() {
        let health: Health = serde_json::from_value(json!({"status": "ok"})).unwrap();
        assert!(health.is_ok());
    }
}
