use std::{sync::Arc, time::Duration};

use ai::{
    chat_completions::{ChatCompletion, ChatCompletionMessage, ChatCompletionRequestBuilder},
    clients::openai::Client,
};
use serde_json::{Map, Value};

use super::{
    read::extract_text,
    spec::{Document, JobContext, ResumeAnalysis, analysis_schema},
};
use crate::pkg::internal::error::VerifyError;

/// Turns a resume (and optionally the job it targets) into a structured
/// evaluation. Implementations make a single attempt per call.
#[async_trait::async_trait]
pub trait MeritScorer: Send + Sync {
    async fn score(
        &self,
        document: &Document,
        job: Option<&JobContext>,
    ) -> Result<ResumeAnalysis, VerifyError>;
}

/// Scorer backed by an OpenAI compatible chat completion endpoint.
pub struct AiScorer {
    client: Arc<Client>,
    model: String,
    timeout: Duration,
}

impl AiScorer {
    pub fn new(client: Arc<Client>, model: &str, timeout: Duration) -> Self {
        AiScorer {
            client,
            model: model.to_string(),
            timeout,
        }
    }

    pub fn from_url(key: &str, endpoint: &str, model: &str, timeout: Duration) -> Result<Self, VerifyError> {
        let client = Client::from_url(key, endpoint)
            .map_err(|_| VerifyError::Scoring(format!("could not build ai client for {}", endpoint)))?;
        Ok(AiScorer::new(Arc::new(client), model, timeout))
    }

    async fn direct_query(&self, prompt: String) -> Result<String, VerifyError> {
        let request = ChatCompletionRequestBuilder::default()
            .model(&self.model)
            .messages(vec![ChatCompletionMessage::User(prompt.into())])
            .build()
            .map_err(|e| VerifyError::Scoring(e.to_string()))?;
        let response = tokio::time::timeout(self.timeout, self.client.chat_completions(&request))
            .await
            .map_err(|_| VerifyError::Scoring(format!("no answer within {:?}", self.timeout)))?
            .map_err(|e| VerifyError::Scoring(e.to_string()))?;
        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| VerifyError::Scoring("empty completion".into()))
    }
}

#[async_trait::async_trait]
impl MeritScorer for AiScorer {
    async fn score(
        &self,
        document: &Document,
        job: Option<&JobContext>,
    ) -> Result<ResumeAnalysis, VerifyError> {
        let content = extract_text(document)?;
        tracing::debug!(
            "scoring {} ({} chars of text) with {}",
            &document.file_name,
            content.len(),
            &self.model
        );
        let res = self.direct_query(build_prompt(&content, job)).await?;
        tracing::debug!("ai result: \n {}", &res);
        parse_analysis(&res)
    }
}

pub fn build_prompt(resume: &str, job: Option<&JobContext>) -> String {
    let schema = serde_json::to_string_pretty(&analysis_schema()).unwrap_or_default();
    let job_section = match job.filter(|j| !j.is_empty()) {
        Some(job) => format!("\nJOB DESCRIPTION:\n{}\n", job.render()),
        None => String::new(),
    };
    format!(
        r#"
You are an expert technical recruiter. You score resumes fairly based on real-world hiring standards.
Analyze this resume and provide a structured JSON scoring. Focus on technical skills, impact, and clarity.
{}
RESUME:
{}

Return ONLY a JSON object matching this JSON schema, never markdown, never text explanations:
{}
"#,
        job_section, resume, schema
    )
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn mismatch(field: &str, expected: &str) -> VerifyError {
    VerifyError::Scoring(format!("field `{}` must be {}", field, expected))
}

fn text_field(obj: &Map<String, Value>, field: &str) -> Result<String, VerifyError> {
    match obj.get(field).and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(mismatch(field, "a non-empty string")),
    }
}

fn tag_list(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>, VerifyError> {
    let items = obj
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| mismatch(field, "an array of strings"))?;
    items
        .iter()
        .map(|item| match item.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => Ok(s.to_string()),
            _ => Err(mismatch(field, "an array of non-empty strings")),
        })
        .collect()
}

/// Parses and validates a model answer against the analysis schema.
pub fn parse_analysis(raw: &str) -> Result<ResumeAnalysis, VerifyError> {
    let value: Value = serde_json::from_str(strip_fences(raw))
        .map_err(|e| VerifyError::Scoring(format!("malformed json: {}", e)))?;
    let obj = value
        .as_object()
        .ok_or_else(|| VerifyError::Scoring("answer is not a json object".into()))?;
    let score = obj
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| mismatch("score", "a number"))?;
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(mismatch("score", "between 0 and 100"));
    }
    Ok(ResumeAnalysis {
        score: score.round() as u32,
        strengths: tag_list(obj, "strengths")?,
        risk_flags: tag_list(obj, "risk_flags")?,
        role_relevance: text_field(obj, "role_relevance")?,
        experience_level: text_field(obj, "experience_level")?,
    })
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;

    const VALID: &str = r#"{
        "score": 87,
        "strengths": ["Kubernetes", "Terraform"],
        "risk_flags": ["No quantified impact"],
        "role_relevance": "DevOps",
        "experience_level": "Senior"
    }"#;

    #[test]
    fn test_parse_valid_answer() {
        let analysis = parse_analysis(VALID).unwrap();
        assert_eq!(analysis.score, 87);
        assert_eq!(analysis.strengths, vec!["Kubernetes", "Terraform"]);
        assert_eq!(analysis.risk_flags.len(), 1);
        assert_eq!(analysis.role_relevance, "DevOps");
        assert_eq!(analysis.experience_level, "Senior");
    }

    #[test]
    fn test_parse_fenced_answer_and_round() {
        let raw = format!("```json\n{}\n```", VALID.replace("87", "74.6"));
        assert_eq!(parse_analysis(&raw).unwrap().score, 75);
    }

    #[test]
    fn test_malformed_json_is_scoring_failure() {
        let err = parse_analysis("{\"score\": 87, \"strengths\": [").unwrap_err();
        assert!(matches!(err, VerifyError::Scoring(_)));
    }

    #[test]
    fn test_schema_mismatches_rejected() {
        let cases = [
            VALID.replace("87", "\"87\""),
            VALID.replace("87", "140"),
            VALID.replace("87", "-1"),
            VALID.replace("\"DevOps\"", "\"  \""),
            VALID.replace("[\"No quantified impact\"]", "\"No quantified impact\""),
            VALID.replace("\"Terraform\"", "42"),
            VALID.replace("\"experience_level\": \"Senior\"", "\"level\": \"Senior\""),
            "[1, 2, 3]".to_string(),
        ];
        for raw in cases {
            assert!(
                matches!(parse_analysis(&raw), Err(VerifyError::Scoring(_))),
                "accepted: {raw}"
            );
        }
    }

    #[test]
    fn test_empty_lists_are_valid() {
        let raw = VALID.replace("[\"No quantified impact\"]", "[]");
        assert!(parse_analysis(&raw).unwrap().risk_flags.is_empty());
    }

    #[test]
    fn test_prompt_contains_schema_and_job() {
        let job = JobContext {
            title: "Cloud Engineer".into(),
            role: Some("Cloud".into()),
            ..Default::default()
        };
        let prompt = build_prompt("Jane Doe", Some(&job));
        assert!(prompt.contains("JOB DESCRIPTION"));
        assert!(prompt.contains("Cloud Engineer"));
        assert!(prompt.contains("\"risk_flags\""));
        assert!(prompt.contains("Jane Doe"));
        assert!(!build_prompt("Jane Doe", None).contains("JOB DESCRIPTION"));
    }

    /// Serves `body` with `status` on `/v1/chat/completions` after `delay`
    /// and returns the base url.
    async fn completion_endpoint(status: StatusCode, body: Value, delay: Duration) -> String {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || {
                let body = body.clone();
                async move {
                    tokio::time::sleep(delay).await;
                    (status, Json(body))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/v1")
    }

    fn completion(choices: Value) -> Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "test-model",
            "choices": choices,
            "usage": { "prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2 }
        })
    }

    async fn score_against(status: StatusCode, body: Value, delay: Duration) -> Result<ResumeAnalysis, VerifyError> {
        let url = completion_endpoint(status, body, delay).await;
        let scorer = AiScorer::from_url("key", &url, "test-model", Duration::from_millis(200)).unwrap();
        let resume = Document::new("cv.txt", b"Jane Doe, Platform Engineer".to_vec());
        scorer.score(&resume, None).await
    }

    #[tokio::test]
    #[traced_test]
    async fn test_scorer_reads_first_choice() {
        let answer = completion(json!([{
            "index": 0,
            "message": { "role": "assistant", "content": VALID },
            "finish_reason": "stop"
        }]));
        let analysis = score_against(StatusCode::OK, answer, Duration::ZERO).await.unwrap();
        assert_eq!(analysis.score, 87);
        assert_eq!(analysis.experience_level, "Senior");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_slow_endpoint_times_out() {
        let err = score_against(StatusCode::OK, completion(json!([])), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(&err, VerifyError::Scoring(d) if d.starts_with("no answer within")), "{err}");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_no_choices_is_scoring_failure() {
        let err = score_against(StatusCode::OK, completion(json!([])), Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err, VerifyError::Scoring("empty completion".into()));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_server_error_is_scoring_failure() {
        let err = score_against(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "overloaded" }),
            Duration::ZERO,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, VerifyError::Scoring(_)));
    }
}
