//! Telegram data-export parsing
//!
//! A data export carries the full chat list under `chats.list`. Only
//! channel-type chats matter here; the parser also accepts an
//! already-shaped channel array so clients can re-submit a previous
//! response unchanged.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TelegramError;

/// A channel as found in a data export or clustering request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportChannel {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<bool>,
}

/// Export ids come as numbers, clustering requests send strings
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct IdVisitor;

    impl de::Visitor<'_> for IdVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a string or integer id")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// Parse a Telegram data export (or a pre-shaped channel array) into the
/// channel list, skipping non-channel chats.
pub fn parse_export(bytes: &[u8]) -> Result<Vec<ExportChannel>, TelegramError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| TelegramError::Export(format!("invalid JSON: {e}")))?;

    let items = if let Some(list) = value.pointer("/chats/list").and_then(Value::as_array) {
        list.iter()
            .filter(|chat| {
                chat.get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t.contains("channel"))
            })
            .cloned()
            .collect::<Vec<_>>()
    } else if let Some(list) = value
        .get("channels")
        .and_then(Value::as_array)
        .or_else(|| value.as_array())
    {
        list.clone()
    } else {
        return Err(TelegramError::Export(
            "expected chats.list or a channel array".to_string(),
        ));
    };

    let mut channels = Vec::with_capacity(items.len());
    for item in items {
        let channel: ExportChannel = serde_json::from_value(item)
            .map_err(|e| TelegramError::Export(format!("malformed channel entry: {e}")))?;
        channels.push(channel);
    }

    Ok(channels)
}
