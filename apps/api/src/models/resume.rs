use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::storage::ArtifactRef;

/// The persisted unit of work for one ingestion + analysis attempt.
///
/// Stored as JSON under `resume_<id>`. The same slot is written twice: once as a
/// checkpoint with `feedback` pending, then again with the parsed feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: String,
    #[serde(rename = "resumePath")]
    pub resume_artifact: ArtifactRef,
    #[serde(rename = "imagePath")]
    pub preview_artifact: ArtifactRef,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub feedback: FeedbackState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ResumeRecord {
    pub fn is_complete(&self) -> bool {
        matches!(self.feedback, FeedbackState::Ready(_))
    }

    pub fn overall_score(&self) -> Option<f64> {
        match &self.feedback {
            FeedbackState::Ready(f) => Some(f.overall_score),
            _ => None,
        }
    }
}

/// Feedback slot of a record.
///
/// On the wire `Pending` is the empty string, `Raw` is any other string or
/// unrecognised JSON, and `Ready` is the structured object.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FeedbackState {
    #[default]
    Pending,
    Raw(String),
    Ready(Feedback),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedbackWire {
    Ready(Feedback),
    Text(String),
    Other(Value),
}

impl Serialize for FeedbackState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeedbackState::Pending => serializer.serialize_str(""),
            FeedbackState::Raw(text) => serializer.serialize_str(text),
            FeedbackState::Ready(feedback) => feedback.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FeedbackState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = Option::<FeedbackWire>::deserialize(deserializer)?;
        Ok(match wire {
            None => FeedbackState::Pending,
            Some(FeedbackWire::Ready(feedback)) => FeedbackState::Ready(feedback),
            Some(FeedbackWire::Text(text)) if text.is_empty() => FeedbackState::Pending,
            Some(FeedbackWire::Text(text)) => FeedbackState::Raw(text),
            Some(FeedbackWire::Other(value)) => FeedbackState::Raw(value.to_string()),
        })
    }
}

/// Structured result of the analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// 0 – 100
    pub overall_score: f64,
    #[serde(rename = "ATS", default, skip_serializing_if = "Option::is_none")]
    pub ats: Option<AtsAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone_and_style: Option<SectionAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<SectionAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<SectionAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<SectionAssessment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsAssessment {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionAssessment {
    pub score: f64,
    #[serde(default)]
    pub tips: Vec<DetailedTip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedTip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(default)]
    pub explanation: String,
}

/// Tip classification. Types other than `good`/`improve` keep their original
/// string so a rewritten record carries what the model sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TipKind {
    Good,
    Improve,
    Other(String),
}

impl From<String> for TipKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "good" => TipKind::Good,
            "improve" => TipKind::Improve,
            _ => TipKind::Other(value),
        }
    }
}

impl From<TipKind> for String {
    fn from(kind: TipKind) -> Self {
        match kind {
            TipKind::Good => "good".to_string(),
            TipKind::Improve => "improve".to_string(),
            TipKind::Other(value) => value,
        }
    }
}
