//! Response schemas handed to the structured model
//!
//! The schema narrows what the model emits; callers still re-validate the
//! parsed JSON, since schema enforcement upstream is best-effort.

use serde_json::{Value, json};

use crate::core::constants::MAX_TOPICS;

/// Schema for topic summarization responses
pub fn topics_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "topics": {
                "type": "array",
                "maxItems": MAX_TOPICS,
                "items": {
                    "type": "object",
                    "properties": {
                        "topic": { "type": "string" },
                        "metatopic": { "type": "string" },
                        "importance": { "type": "integer", "minimum": 1, "maximum": 10 },
                        "summary": { "type": "string" },
                        "message_ids": {
                            "type": "array",
                            "items": { "type": "integer" }
                        }
                    },
                    "required": ["topic", "metatopic", "importance", "summary", "message_ids"]
                }
            }
        },
        "required": ["topics"]
    })
}

/// Schema for channel clustering responses
pub fn clusters_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "topics": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "topic": { "type": "string" },
                        "language": {
                            "type": "string",
                            "description": "ISO-639-1 code of the group's dominant language"
                        },
                        "channel_ids": {
                            "type": "array",
                            "items": { "type": "string" }
                        }
                    },
                    "required": ["topic", "language", "channel_ids"]
                }
            }
        },
        "required": ["topics"]
    })
}

/// Schema for insight generation responses
pub fn insight_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "analysis_summary": { "type": "string" },
            "stance": {
                "type": "string",
                "enum": [
                    "long",
                    "short",
                    "long-neutral",
                    "short-neutral",
                    "neutral",
                    "no-actionable-insight"
                ]
            },
            "rationale_long": { "type": "string" },
            "rationale_short": { "type": "string" },
            "rationale_neutral": { "type": "string" },
            "risks_and_watchouts": { "type": "array", "items": { "type": "string" } },
            "key_questions_for_user": { "type": "array", "items": { "type": "string" } },
            "suggested_instruments_long": { "type": "array", "items": { "type": "string" } },
            "suggested_instruments_short": { "type": "array", "items": { "type": "string" } },
            "useful_resources": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "url": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["url", "description"]
                }
            }
        },
        "required": ["analysis_summary", "stance"]
    })
}
