//! Holdings record type

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A holdings record as served by `/holdings-storage/holdings`.
///
/// A holdings record groups the items of one instance held at one
/// location. One with zero items referencing it is orphaned and
/// eligible for deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holdings {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrid: Option<String>,

    /// The instance this holdings record belongs to.
    pub instance_id: String,

    pub permanent_location_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_location_id: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Holdings {
    /// Body for a new holdings record at `location_id`, copying this
    /// record's non-location fields. The platform assigns `id` and
    /// `hrid` on create, so neither is included.
    pub fn template_at(&self, location_id: &str) -> Value {
        let mut body = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut body {
            map.remove("id");
            map.remove("hrid");
            map.insert(
                "permanentLocationId".to_string(),
                Value::String(location_id.to_string()),
            );
        }
        body
    }
}
