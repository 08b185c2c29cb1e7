use std::io::Cursor;
use std::path::Path;

use super::spec::Document;
use crate::pkg::internal::error::VerifyError;

pub const PDF: &str = "application/pdf";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const DOC: &str = "application/msword";
pub const TEXT: &str = "text/plain";
pub const MARKDOWN: &str = "text/markdown";

const SUPPORTED_EXTENSIONS: [&str; 5] = ["pdf", "docx", "doc", "txt", "md"];

fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn mime_for(file_name: &str) -> &'static str {
    match extension(file_name).as_str() {
        "pdf" => PDF,
        "docx" => DOCX,
        "doc" => DOC,
        "txt" => TEXT,
        "md" => MARKDOWN,
        _ => "application/octet-stream",
    }
}

pub fn is_supported(file_name: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&extension(file_name).as_str())
}

/// Media type without parameters, so `text/plain; charset=utf-8` is `text/plain`.
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Plain text of a resume for the scoring prompt.
pub fn extract_text(document: &Document) -> Result<String, VerifyError> {
    let text = match essence(&document.mime_type).as_str() {
        PDF => extract_text_from_pdf(&document.content)?,
        DOCX => extract_text_from_docx(&document.content)?,
        TEXT | MARKDOWN => String::from_utf8(document.content.to_vec())
            .map_err(|e| VerifyError::Scoring(format!("resume is not valid utf-8: {}", e)))?,
        DOC => {
            return Err(VerifyError::Scoring(
                "legacy .doc files are not supported, convert to docx or pdf".into(),
            ));
        }
        other => {
            return Err(VerifyError::Scoring(format!("unsupported content type {}", other)));
        }
    };
    if text.trim().is_empty() {
        return Err(VerifyError::Scoring(format!(
            "no text extracted from {}",
            document.file_name
        )));
    }
    Ok(text.trim().to_string())
}

fn extract_text_from_pdf(data: &[u8]) -> Result<String, VerifyError> {
    use lopdf::Document;
    let doc = Document::load_from(Cursor::new(data))
        .map_err(|e| VerifyError::Scoring(format!("unreadable pdf: {}", e)))?;

    let mut text = String::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push(' ');
            }
            Err(e) => {
                tracing::warn!("failed to extract text from page {}: {}", page_num, e);
            }
        }
    }
    Ok(text)
}

fn extract_text_from_docx(data: &[u8]) -> Result<String, VerifyError> {
    use docx_rs::read_docx;
    let docx = read_docx(data).map_err(|e| VerifyError::Scoring(format!("unreadable docx: {}", e)))?;
    let mut text = String::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for run_child in run.children {
                        if let docx_rs::RunChild::Text(t) = run_child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_mapping() {
        assert_eq!(mime_for("resume.pdf"), PDF);
        assert_eq!(mime_for("resume.DOCX"), DOCX);
        assert_eq!(mime_for("notes.md"), MARKDOWN);
        assert_eq!(mime_for("archive.zip"), "application/octet-stream");
        assert!(is_supported("a.txt"));
        assert!(!is_supported("a.exe"));
        assert!(!is_supported("noextension"));
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        let doc = Document::new("cv.txt", b"  Jane Doe, SRE  \n".to_vec());
        assert_eq!(extract_text(&doc).unwrap(), "Jane Doe, SRE");
    }

    #[test]
    fn test_blank_text_fails_scoring() {
        let doc = Document::new("cv.txt", b"   \n".to_vec());
        assert!(matches!(extract_text(&doc), Err(VerifyError::Scoring(_))));
    }

    #[test]
    fn test_doc_and_garbage_pdf_fail() {
        let doc = Document::new("cv.doc", b"binary".to_vec());
        assert!(matches!(extract_text(&doc), Err(VerifyError::Scoring(_))));
        let pdf = Document::new("cv.pdf", b"not a pdf".to_vec());
        assert!(matches!(extract_text(&pdf), Err(VerifyError::Scoring(_))));
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        let doc = Document::with_mime("cv.txt", "text/plain; charset=utf-8", b"Jane Doe".to_vec());
        assert_eq!(extract_text(&doc).unwrap(), "Jane Doe");
        let doc = Document::with_mime("cv.md", " Text/Markdown ;charset=UTF-8", b"# Jane".to_vec());
        assert_eq!(extract_text(&doc).unwrap(), "# Jane");
    }
}
