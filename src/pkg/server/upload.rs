use axum::{extract::Multipart, http::StatusCode};
use standard_error::{Interpolate, StandardError, Status};

use crate::{
    pkg::internal::ai::{
        read::{is_supported, mime_for},
        spec::{Document, JobContext, parse_skills},
    },
    prelude::Result,
};

/// Resume file plus the optional job posting fields of a multipart form.
pub struct ResumeUpload {
    pub document: Document,
    pub job: Option<JobContext>,
}

fn malformed(e: impl ToString) -> StandardError {
    StandardError::new("ERR-UPLOAD-001")
        .interpolate_err(e.to_string())
        .code(StatusCode::BAD_REQUEST)
}

pub async fn read_upload(multipart: &mut Multipart, max_bytes: usize) -> Result<ResumeUpload> {
    let mut document = None;
    let mut job = JobContext::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "resume" => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                if !is_supported(&file_name) {
                    return Err(StandardError::new("ERR-UPLOAD-002").code(StatusCode::BAD_REQUEST));
                }
                let mime_type = mime_for(&file_name);
                let data = field.bytes().await.map_err(malformed)?;
                if data.len() > max_bytes {
                    return Err(StandardError::new("ERR-UPLOAD-003")
                        .interpolate_err(format!("{} bytes, limit is {}", data.len(), max_bytes))
                        .code(StatusCode::PAYLOAD_TOO_LARGE));
                }
                tracing::debug!("received {} ({}, {} bytes)", &file_name, mime_type, data.len());
                document = Some(Document::with_mime(&file_name, mime_type, data));
            }
            "title" => job.title = field.text().await.map_err(malformed)?,
            "role" => job.role = Some(field.text().await.map_err(malformed)?),
            "description" => job.description = field.text().await.map_err(malformed)?,
            "skills" => job.skills = parse_skills(&field.text().await.map_err(malformed)?),
            _ => {
                let _ = field.bytes().await.map_err(malformed)?;
            }
        }
    }
    let document = document
        .ok_or_else(|| StandardError::new("ERR-UPLOAD-004").code(StatusCode::BAD_REQUEST))?;
    let job = if job.is_empty() { None } else { Some(job) };
    Ok(ResumeUpload { document, job })
}
