//! Instance record type

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A bibliographic instance record as served by
/// `/instance-storage/instances`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrid: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instance_tolerates_missing_title() {
        let instance: Instance = serde_json::from_value(json!({
            "id": "inst-1",
            "hrid": "in00000001"
        }))
        .unwrap();
        assert!(instance.title.is_empty());
    }
}
