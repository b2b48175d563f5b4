use serde::{Deserialize, Deserializer};
use serde_derive::Serialize;
use serde_json::Value;

/// Who the server says we are.
///
/// The backend hasn't been consistent about field names (`id` vs `_id`,
/// `name` vs `username`), so this is always built with
/// [`Identity::from_record()`], which never fails. Anything missing becomes
/// an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub email: String,
}

impl Identity {
    pub fn from_record(record: &Value) -> Self {
        Identity {
            id: text_field(record, &["id", "_id"]).unwrap_or_default(),
            display_name: text_field(record, &["name", "username"])
                .unwrap_or_default(),
            email: text_field(record, &["email"]).unwrap_or_default(),
        }
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let record = Value::deserialize(deserializer)?;
        Ok(Identity::from_record(&record))
    }
}

/// Get the first of `keys` holding a string or number. Nulls and other
/// types fall through to the next key.
pub(crate) fn text_field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
