//! Analysis data types shared across the summarizer, clusterer, and
//! insights generator

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::telegram::ExportChannel;

/// Summarization window length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneDay,
    TwoDays,
    OneWeek,
}

impl Period {
    pub fn duration(&self) -> chrono::Duration {
        match self {
            Period::OneDay => chrono::Duration::days(1),
            Period::TwoDays => chrono::Duration::days(2),
            Period::OneWeek => chrono::Duration::weeks(1),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Period::OneDay),
            "2d" => Ok(Period::TwoDays),
            "1w" => Ok(Period::OneWeek),
            other => Err(format!("Unknown period: {other} (expected 1d, 2d or 1w)")),
        }
    }
}

/// A model-produced grouping of messages with a label and importance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub topic: String,
    pub metatopic: String,
    pub importance: u8,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub message_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insight>,
}

/// Directional reading of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stance {
    Long,
    Short,
    LongNeutral,
    ShortNeutral,
    Neutral,
    NoActionableInsight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    pub description: String,
}

/// Structured analytical record attached to a topic.
///
/// Every list field is either absent or non-empty; absent means "not
/// applicable".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub analysis_summary: String,
    pub stance: Stance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale_long: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale_short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale_neutral: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risks_and_watchouts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_questions_for_user: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_instruments_long: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_instruments_short: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub useful_resources: Option<Vec<Resource>>,
}

impl Insight {
    /// Collapse empty strings and lists to absent fields
    pub fn normalize(&mut self) {
        fn drop_empty_text(field: &mut Option<String>) {
            if field.as_ref().is_some_and(|s| s.trim().is_empty()) {
                *field = None;
            }
        }
        fn drop_empty_list<T>(field: &mut Option<Vec<T>>) {
            if field.as_ref().is_some_and(Vec::is_empty) {
                *field = None;
            }
        }

        drop_empty_text(&mut self.rationale_long);
        drop_empty_text(&mut self.rationale_short);
        drop_empty_text(&mut self.rationale_neutral);
        drop_empty_list(&mut self.risks_and_watchouts);
        drop_empty_list(&mut self.key_questions_for_user);
        drop_empty_list(&mut self.suggested_instruments_long);
        drop_empty_list(&mut self.suggested_instruments_short);
        drop_empty_list(&mut self.useful_resources);
    }
}

/// A named group of channels with a detected language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelGroup {
    pub topic: String,
    pub language: String,
    pub channels: Vec<ExportChannel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parsing() {
        assert_eq!("1d".parse::<Period>().unwrap(), Period::OneDay);
        assert_eq!("2d".parse::<Period>().unwrap(), Period::TwoDays);
        assert_eq!("1w".parse::<Period>().unwrap(), Period::OneWeek);
        assert!("3d".parse::<Period>().is_err());
    }

    #[test]
    fn test_stance_wire_values() {
        for (stance, wire) in [
            (Stance::Long, "\"long\""),
            (Stance::Short, "\"short\""),
            (Stance::LongNeutral, "\"long-neutral\""),
            (Stance::ShortNeutral, "\"short-neutral\""),
            (Stance::Neutral, "\"neutral\""),
            (Stance::NoActionableInsight, "\"no-actionable-insight\""),
        ] {
            assert_eq!(serde_json::to_string(&stance).unwrap(), wire);
        }
        assert!(serde_json::from_str::<Stance>("\"bullish\"").is_err());
    }

    #[test]
    fn test_insight_normalize_drops_empty_fields() {
        let mut insight = Insight {
            analysis_summary: "summary".into(),
            stance: Stance::Neutral,
            rationale_long: Some("  ".into()),
            rationale_short: Some("kept".into()),
            rationale_neutral: None,
            risks_and_watchouts: Some(vec![]),
            key_questions_for_user: Some(vec!["q".into()]),
            suggested_instruments_long: Some(vec![]),
            suggested_instruments_short: None,
            useful_resources: Some(vec![]),
        };
        insight.normalize();

        assert!(insight.rationale_long.is_none());
        assert_eq!(insight.rationale_short.as_deref(), Some("kept"));
        assert!(insight.risks_and_watchouts.is_none());
        assert_eq!(insight.key_questions_for_user.unwrap().len(), 1);
        assert!(insight.suggested_instruments_long.is_none());
        assert!(insight.useful_resources.is_none());
    }

    #[test]
    fn test_topic_summary_accepts_model_shape() {
        let topic: TopicSummary = serde_json::from_str(
            r#"{"topic":"Rates","metatopic":"Macro","importance":8,"summary":"s","message_ids":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(topic.id, None);
        assert_eq!(topic.message_ids, vec![1, 2]);
        assert!(topic.insights.is_none());
    }
}
