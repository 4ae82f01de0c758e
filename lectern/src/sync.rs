use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Discriminator carried by every slide-control message.
pub const SLIDE_CONTROLLER_SOURCE: &str = "slide-controller";

/// `{ "source": "slide-controller", "payload": { "newSlide": 4 } }`
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub struct SyncMessage {
    pub source: String,
    pub payload: SyncPayload,
}

#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub new_slide: u32,
}

/// Result of inspecting raw message data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Inbound {
    Slide(SyncMessage),
    /// Foreign or missing discriminator; left for other consumers.
    NotForUs,
    /// Our discriminator with a payload we cannot read.
    Malformed(String),
}

impl SyncMessage {
    pub fn new_slide(new_slide: u32) -> Self {
        Self {
            source: SLIDE_CONTROLLER_SOURCE.to_string(),
            payload: SyncPayload { new_slide },
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "source": self.source,
            "payload": { "newSlide": self.payload.new_slide },
        })
    }
}

/// Checks the discriminator before touching the payload.
pub fn classify(data: &Value) -> Inbound {
    let source = data.get("source").and_then(Value::as_str);
    if source != Some(SLIDE_CONTROLLER_SOURCE) {
        return Inbound::NotForUs;
    }

    match serde_json::from_value::<SyncMessage>(data.clone()) {
        Ok(message) => Inbound::Slide(message),
        Err(err) => Inbound::Malformed(err.to_string()),
    }
}

pub fn parse_message(message: &str) -> Result<Value, String> {
    serde_json::from_str(message)
        .map_err(|err| format!("invalid sync message '{}': {}", message, err))
}

pub fn to_message(message: &SyncMessage) -> Result<String, String> {
    serde_json::to_string(message)
        .map_err(|err| format!("failed to serialize sync message: {}", err))
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SlideNumber {
        Uint(u64),
        Int(i64),
        Float(f64),
        String(String),
    }

    fn out_of_range(value: impl fmt::Display) -> String {
        format!("slide number {} out of range", value)
    }

    match SlideNumber::deserialize(deserializer)? {
        SlideNumber::Uint(value) => u32::try_from(value)
            .map_err(|_| de::Error::custom(out_of_range(value))),
        SlideNumber::Int(value) => u32::try_from(value)
            .map_err(|_| de::Error::custom(out_of_range(value))),
        SlideNumber::Float(value) => {
            if value.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&value)
            {
                Ok(value as u32)
            } else {
                Err(de::Error::custom(out_of_range(value)))
            }
        }
        SlideNumber::String(value) => {
            value.trim().parse::<u32>().map_err(|_| {
                de::Error::custom(format!(
                    "slide number '{}' is not numeric",
                    value
                ))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encodes_envelope_with_numeric_slide() {
        let message = to_message(&SyncMessage::new_slide(4)).unwrap();
        let value: Value = serde_json::from_str(&message).unwrap();

        assert_eq!(
            value,
            json!({ "source": "slide-controller", "payload": { "newSlide": 4 } })
        );
        assert_eq!(SyncMessage::new_slide(4).to_value(), value);
    }

    #[test]
    fn accepts_number_or_numeric_string() {
        let numeric = json!({
            "source": "slide-controller",
            "payload": { "newSlide": 2 }
        });
        let text = json!({
            "source": "slide-controller",
            "payload": { "newSlide": "2" }
        });

        assert_eq!(classify(&numeric), Inbound::Slide(SyncMessage::new_slide(2)));
        assert_eq!(classify(&text), Inbound::Slide(SyncMessage::new_slide(2)));
    }

    #[test]
    fn foreign_or_missing_discriminator_is_not_for_us() {
        let other = json!({ "source": "other-widget", "payload": { "x": 1 } });
        assert_eq!(classify(&other), Inbound::NotForUs);
        assert_eq!(classify(&json!({ "payload": {} })), Inbound::NotForUs);
        assert_eq!(classify(&json!("hello")), Inbound::NotForUs);
        assert_eq!(classify(&Value::Null), Inbound::NotForUs);
    }

    #[test]
    fn our_discriminator_with_bad_payload_is_malformed() {
        let missing = json!({ "source": "slide-controller" });
        let wrong = json!({
            "source": "slide-controller",
            "payload": { "newSlide": "next" }
        });
        let negative = json!({
            "source": "slide-controller",
            "payload": { "newSlide": -1 }
        });

        assert!(matches!(classify(&missing), Inbound::Malformed(_)));
        assert!(matches!(classify(&wrong), Inbound::Malformed(_)));
        assert!(matches!(classify(&negative), Inbound::Malformed(_)));
    }

    #[test]
    fn parse_message_reports_bad_json() {
        let err = parse_message("{not json").unwrap_err();
        assert!(err.contains("invalid sync message"));
    }
}
