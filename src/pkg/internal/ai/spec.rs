use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{fetch, read::mime_for};
use crate::pkg::internal::error::VerifyError;

/// Structured evaluation of one resume, as returned by the scoring model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    pub score: u32,
    pub strengths: Vec<String>,
    pub risk_flags: Vec<String>,
    pub role_relevance: String,
    pub experience_level: String,
}

/// An uploaded resume file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    pub content: Bytes,
}

impl Document {
    pub fn new(file_name: &str, content: impl Into<Bytes>) -> Self {
        Document {
            file_name: file_name.to_string(),
            mime_type: mime_for(file_name).to_string(),
            content: content.into(),
        }
    }

    pub fn with_mime(file_name: &str, mime_type: &str, content: impl Into<Bytes>) -> Self {
        Document {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            content: content.into(),
        }
    }

    pub async fn read(path: &Path) -> Result<Self, VerifyError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| VerifyError::Digest(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("resume")
            .to_string();
        Ok(Document::new(&file_name, data))
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// The job posting a resume is scored against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobContext {
    pub title: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl JobContext {
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty()
            && self.role.as_deref().map_or(true, |r| r.trim().is_empty())
            && self.description.trim().is_empty()
            && self.skills.is_empty()
    }

    /// Swaps a posting URL in `description` for the text of the page.
    pub async fn resolve(mut self) -> Self {
        if self.description.starts_with("http://") || self.description.starts_with("https://") {
            self.description = fetch::process(&self.description).await;
        }
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!("Title: {}\n", self.title);
        if let Some(role) = self.role.as_deref().filter(|r| !r.trim().is_empty()) {
            out.push_str(&format!("Role: {}\n", role));
        }
        if !self.skills.is_empty() {
            out.push_str(&format!("Required skills: {}\n", self.skills.join(", ")));
        }
        if !self.description.trim().is_empty() {
            out.push_str(&format!("Description: {}\n", self.description.trim()));
        }
        out
    }
}

/// Splits a comma separated skill list, dropping blanks.
pub fn parse_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Output schema handed to the scoring model.
pub fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "score": {
                "type": "number",
                "description": "A score from 0 to 100 based on resume quality and impact."
            },
            "strengths": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Key technical strengths and skills."
            },
            "risk_flags": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Potential red flags like lack of quantified data."
            },
            "role_relevance": {
                "type": "string",
                "description": "Main domain relevance (e.g., DevOps, Cloud)."
            },
            "experience_level": {
                "type": "string",
                "description": "Estimated seniority (Junior, Mid, Senior)."
            }
        },
        "required": ["score", "strengths", "risk_flags", "role_relevance", "experience_level"]
    })
}
