//! Alert payloads pushed over the realtime channel

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A freshly raised alert. The payload is kept raw; accessors read the
/// common fields without forcing a schema on the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NewAlert {
    pub payload: Value,
}

impl NewAlert {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    pub fn id(&self) -> Option<String> {
        value_as_id(self.payload.get("id")?)
    }

    pub fn crossing_id(&self) -> Option<String> {
        self.payload
            .get("cruce")
            .or_else(|| self.payload.get("cruce_id"))
            .or_else(|| self.payload.get("crossing_id"))
            .and_then(value_as_id)
    }

    pub fn severity(&self) -> Option<&str> {
        self.payload
            .get("severity")
            .or_else(|| self.payload.get("severidad"))
            .and_then(Value::as_str)
    }

    pub fn message(&self) -> Option<&str> {
        self.payload
            .get("message")
            .or_else(|| self.payload.get("descripcion"))
            .and_then(Value::as_str)
    }
}

/// Resolution notice for a previously raised alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertResolved {
    #[serde(alias = "id", alias = "alertId", deserialize_with = "id_string")]
    pub alert_id: String,
    #[serde(default = "resolved_default")]
    pub resolved: bool,
}

/// Events the realtime channel delivers to alert subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AlertEvent {
    NewAlert(NewAlert),
    AlertResolved(AlertResolved),
}

impl AlertEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AlertEvent::NewAlert(_) => "new_alert",
            AlertEvent::AlertResolved(_) => "alert_resolved",
        }
    }
}

fn resolved_default() -> bool {
    true
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_as_id(&value).ok_or_else(|| serde::de::Error::custom("alert id must be string or number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_alert_accessors_read_common_fields() {
        let alert = NewAlert::new(json!({
            "id": 42,
            "cruce": "CR-017",
            "severidad": "critica",
            "descripcion": "Barrera no baja"
        }));
        assert_eq!(alert.id().as_deref(), Some("42"));
        assert_eq!(alert.crossing_id().as_deref(), Some("CR-017"));
        assert_eq!(alert.severity(), Some("critica"));
        assert_eq!(alert.message(), Some("Barrera no baja"));
    }

    #[test]
    fn alert_resolved_accepts_numeric_ids_and_aliases() {
        let resolved: AlertResolved = serde_json::from_value(json!({"id": 9})).unwrap();
        assert_eq!(resolved.alert_id, "9");
        assert!(resolved.resolved);

        let reopened: AlertResolved =
            serde_json::from_value(json!({"alert_id": "a-1", "resolved": false})).unwrap();
        assert_eq!(reopened.alert_id, "a-1");
        assert!(!reopened.resolved);
    }
}
