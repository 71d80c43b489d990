use serde::{Deserialize, Serialize};

/// One decoded line of a bulk operation result.
///
/// The payload is passed through untouched; no schema is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecodedRecord(serde_json::Value);

impl DecodedRecord {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// The record's `id` field, if it is a string.
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(serde_json::Value::as_str)
    }

    /// Lines of a nested connection point at their parent via `__parentId`.
    pub fn parent_id(&self) -> Option<&str> {
        self.0.get("__parentId").and_then(serde_json::Value::as_str)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for DecodedRecord {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exposes_id_and_parent() {
        let parent = DecodedRecord::new(json!({"id": "gid://shopify/Product/1", "title": "Hat"}));
        let child = DecodedRecord::new(json!({
            "id": "gid://shopify/ProductVariant/9",
            "__parentId": "gid://shopify/Product/1"
        }));

        assert_eq!(parent.id(), Some("gid://shopify/Product/1"));
        assert_eq!(parent.parent_id(), None);
        assert_eq!(child.parent_id(), parent.id());
    }

    #[test]
    fn non_object_records_pass_through() {
        let record = DecodedRecord::new(json!(42));
        assert_eq!(record.id(), None);
        assert_eq!(record.into_value(), json!(42));
    }
}
