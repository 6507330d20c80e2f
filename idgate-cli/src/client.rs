use reqwest::header::{HeaderMap, AUTHORIZATION};
use serde::Deserialize;

/// Build an HTTP client with optional Bearer token default header.
pub fn build_client(token: &Option<String>) -> anyhow::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(tok) = token {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", tok).parse()?);
        builder = builder.default_headers(headers);
    }
    Ok(builder.build()?)
}

/// API 错误响应体 `{code, message}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Normalize non-2xx responses into errors while returning the response on success.
pub async fn handle_error(resp: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    Err(anyhow::anyhow!("request failed {}: {}", status, describe_error(&text)))
}

fn describe_error(text: &str) -> String {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => format!("[{}] {}", body.code, body.message),
        Err(_) if text.is_empty() => "unknown error".to_string(),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_is_summarised() {
        assert_eq!(
            describe_error(r#"{"code":"code_expired","message":"code_expired"}"#),
            "[code_expired] code_expired"
        );
        assert_eq!(describe_error(""), "unknown error");
        assert_eq!(describe_error("bad gateway"), "bad gateway");
    }

    #[test]
    fn client_builds_with_and_without_token() {
        assert!(build_client(&None).is_ok());
        assert!(build_client(&Some("abc".into())).is_ok());
    }
}
