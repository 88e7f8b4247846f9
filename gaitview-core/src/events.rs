//! Push events from the `/ws/dashboard` channel and the analytics payloads
//! they carry.
//!
//! Frames arrive as `{type, payload, timestamp}` envelopes. Decoding is two
//! step: the envelope first, then the payload according to its tag. Unknown
//! tags decode to [`PushEvent::Unknown`] so newer servers never break older
//! clients.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A labelled series, e.g. commits per weekday.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageShare {
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub percentages: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeveloperActivity {
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub commits: Vec<u64>,
}

/// Repository-level analytics aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(default)]
    pub total_commits: u64,
    #[serde(default)]
    pub active_developers: u64,
    #[serde(default)]
    pub code_quality_score: f64,
    /// Free-form: the server sends either a label ("Low") or a number.
    #[serde(default)]
    pub technical_debt: Value,
    #[serde(default)]
    pub commit_trends: Series,
    #[serde(default)]
    pub language_distribution: LanguageShare,
    #[serde(default)]
    pub developer_activity: DeveloperActivity,
}

impl Analytics {
    /// Human-readable technical-debt figure.
    pub fn technical_debt_label(&self) -> String {
        match &self.technical_debt {
            Value::Null => "n/a".to_owned(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A single generated insight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default, alias = "edges")]
    pub links: Vec<GraphLink>,
}

impl KnowledgeGraph {
    /// Label for a node id, falling back to the id itself.
    pub fn label_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.nodes
            .iter()
            .find(|n| n.id == id && !n.label.is_empty())
            .map_or(id, |n| n.label.as_str())
    }
}

/// Insight list plus the knowledge graph that accompanies it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "InsightsWire")]
pub struct InsightSet {
    pub insights: Vec<Insight>,
    pub knowledge_graph: Option<KnowledgeGraph>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightSetFields {
    #[serde(default)]
    insights: Vec<Insight>,
    #[serde(default)]
    knowledge_graph: Option<KnowledgeGraph>,
}

/// The push channel nests insights in an object, the REST endpoint may send a
/// bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum InsightsWire {
    List(Vec<Insight>),
    Fields(InsightSetFields),
}

impl From<InsightsWire> for InsightSet {
    fn from(wire: InsightsWire) -> Self {
        match wire {
            InsightsWire::List(insights) => Self { insights, knowledge_graph: None },
            InsightsWire::Fields(f) => Self { insights: f.insights, knowledge_graph: f.knowledge_graph },
        }
    }
}

/// Full dashboard payload: any section may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    #[serde(default)]
    pub analytics: Option<Analytics>,
    #[serde(default)]
    pub insights: Option<InsightSet>,
    #[serde(default)]
    pub semantics: Option<BTreeMap<String, f64>>,
    #[serde(default, alias = "knowledgeGraph")]
    pub knowledge_graph: Option<KnowledgeGraph>,
    #[serde(default)]
    pub patterns: Option<Value>,
}

impl DashboardSnapshot {
    fn is_empty(&self) -> bool {
        self.analytics.is_none()
            && self.insights.is_none()
            && self.semantics.is_none()
            && self.knowledge_graph.is_none()
            && self.patterns.is_none()
    }
}

/// A user-facing notification pushed by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// `info`, `success`, `warning` or `error`.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
}

/// A decoded push event.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A commit landed on the server.
    Commit { hash: String, message: String },
    /// A newly generated insight.
    Insight(Insight),
    /// Aggregate analytics (`analytics`, `update` and `initial_data` frames).
    Analytics(DashboardSnapshot),
    Notification(Notice),
    /// A tag this client does not understand. Ignored.
    Unknown(String),
}

/// An event with the server's timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PushFrame {
    pub event: PushEvent,
    pub timestamp: Option<DateTime<FixedOffset>>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    timestamp: Option<DateTime<FixedOffset>>,
}

#[derive(Deserialize)]
struct CommitPayload {
    hash: String,
    #[serde(default)]
    message: String,
}

impl PushFrame {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the envelope is malformed or the payload of
    /// a known tag does not have the expected shape.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let event = match envelope.kind.as_str() {
            "commit" => {
                let CommitPayload { hash, message } = serde_json::from_value(envelope.payload)?;
                PushEvent::Commit { hash, message }
            }
            "insight" => PushEvent::Insight(serde_json::from_value(envelope.payload)?),
            "analytics" | "update" | "initial_data" => {
                let snapshot: DashboardSnapshot = serde_json::from_value(envelope.payload.clone())?;
                if snapshot.is_empty() {
                    // A bare analytics object rather than a dashboard wrapper.
                    let analytics: Analytics = serde_json::from_value(envelope.payload)?;
                    PushEvent::Analytics(DashboardSnapshot {
                        analytics: Some(analytics),
                        ..DashboardSnapshot::default()
                    })
                } else {
                    PushEvent::Analytics(snapshot)
                }
            }
            "notification" => PushEvent::Notification(serde_json::from_value(envelope.payload)?),
            other => PushEvent::Unknown(other.to_owned()),
        };
        Ok(Self { event, timestamp: envelope.timestamp })
    }
}
