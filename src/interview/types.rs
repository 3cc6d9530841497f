//! Interview data model shared by the store, the machine and the gateway.

use serde::{Deserialize, Serialize};

use super::error::InterviewError;

/// Job title and description supplied by the recruiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    pub title: String,
    pub description: String,
}

impl RoleDescriptor {
    /// Builds a descriptor, trimming both fields and rejecting empty ones.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, InterviewError> {
        let role = Self {
            title: title.into().trim().to_string(),
            description: description.into().trim().to_string(),
        };
        role.validate()?;
        Ok(role)
    }

    pub fn validate(&self) -> Result<(), InterviewError> {
        if self.title.trim().is_empty() {
            return Err(InterviewError::InvalidRole("role title is empty".into()));
        }
        if self.description.trim().is_empty() {
            return Err(InterviewError::InvalidRole(
                "role description is empty".into(),
            ));
        }
        Ok(())
    }
}

/// Ordered interview questions. Never empty once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct QuestionSet(Vec<String>);

impl QuestionSet {
    /// Returns `None` for an empty list.
    pub fn new(questions: Vec<String>) -> Option<Self> {
        if questions.is_empty() {
            None
        } else {
            Some(Self(questions))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for QuestionSet {
    type Error = &'static str;

    fn try_from(questions: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(questions).ok_or("question list must not be empty")
    }
}

impl From<QuestionSet> for Vec<String> {
    fn from(set: QuestionSet) -> Self {
        set.0
    }
}

/// Spoken answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub question_index: usize,
    pub question_text: String,
    pub transcript_text: String,
}

/// Three-section recruiter assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub overall_summary: String,
    pub strengths: String,
    pub areas_for_improvement: String,
}

/// Spoken rendition of the introduction, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetingAudio {
    pub mime_type: String,
    pub data: String,
}

/// Where the interview stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewPhase {
    Empty,
    Active,
    Complete,
}

impl InterviewPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Active => "active",
            Self::Complete => "complete",
        }
    }
}

/// Question the candidate should answer next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentQuestion {
    Pending { index: usize, text: String },
    SessionComplete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_descriptor_trims_fields() {
        let role = RoleDescriptor::new("  Backend Engineer ", "Builds REST APIs\n").unwrap();
        assert_eq!(role.title, "Backend Engineer");
        assert_eq!(role.description, "Builds REST APIs");
    }

    #[test]
    fn test_role_descriptor_rejects_blank_fields() {
        assert!(matches!(
            RoleDescriptor::new("   ", "desc"),
            Err(InterviewError::InvalidRole(_))
        ));
        assert!(matches!(
            RoleDescriptor::new("title", ""),
            Err(InterviewError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_question_set_rejects_empty() {
        assert!(QuestionSet::new(Vec::new()).is_none());

        let set = QuestionSet::new(vec!["Q1".into(), "Q2".into()]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1), Some("Q2"));
        assert_eq!(set.get(2), None);
        assert!(!set.is_empty());
    }

    #[test]
    fn test_question_set_deserialize_keeps_non_empty() {
        let set: QuestionSet = serde_json::from_str(r#"["Q1", "Q2"]"#).unwrap();
        assert_eq!(set.as_slice(), ["Q1", "Q2"]);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["Q1","Q2"]"#);

        assert!(serde_json::from_str::<QuestionSet>("[]").is_err());
    }

    #[test]
    fn test_phase_serialization() {
        assert_eq!(serde_json::to_string(&InterviewPhase::Active).unwrap(), "\"active\"");
        assert_eq!(InterviewPhase::Complete.as_str(), "complete");
    }
}
