use reqwest::Url;
use scraper::{Html, Selector};

/// Text of the page behind a job posting URL, or the input itself when it
/// is not a URL or the page cannot be fetched.
pub async fn process(url: &str) -> String {
    if Url::parse(url).is_err() {
        return url.into();
    }
    match fetch_and_extract(url).await {
        Ok(text) if !text.is_empty() => text,
        Ok(_) => url.into(),
        Err(e) => {
            tracing::warn!("could not fetch job posting {}: {}", url, e);
            url.into()
        }
    }
}

async fn fetch_and_extract(url: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    tracing::debug!("fetching job posting: {}", url);

    let client = reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36")
        .build()?;

    let response = client.get(url).send().await?;
    let status = response.status();
    tracing::debug!("job posting response status: {}", status);
    if status.as_u16() == 999 {
        return Err("bot detection - 999 status code".into());
    }
    if !status.is_success() {
        return Err(format!("unexpected status {}", status).into());
    }
    let html_content = response.text().await?;
    Ok(page_text(&html_content))
}

fn page_text(html_content: &str) -> String {
    let document = Html::parse_document(html_content);
    let mut text_parts = Vec::new();
    if let Ok(body) = Selector::parse("body") {
        for element in document.select(&body) {
            let text = element
                .text()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if !text.is_empty() {
                text_parts.push(text);
            }
        }
    }
    // body can be empty for fragment-only pages
    if text_parts.is_empty() {
        let all_text = document
            .root_element()
            .text()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !all_text.is_empty() {
            text_parts.push(all_text);
        }
    }
    tracing::debug!("extracted {} text parts from job posting", text_parts.len());
    text_parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_non_url_passthrough() {
        assert_eq!(process("Run our Kubernetes fleet").await, "Run our Kubernetes fleet");
    }

    #[test]
    fn test_page_text_collects_body() {
        let html = "<html><head><title>x</title></head><body><h1>Cloud Engineer</h1><p> AWS, Terraform </p></body></html>";
        assert_eq!(page_text(html), "Cloud Engineer AWS, Terraform");
    }
}
