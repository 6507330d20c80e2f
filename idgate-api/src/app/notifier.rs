//! 通过 HTTP webhook 发送模板邮件（对接外部通知服务）

use async_trait::async_trait;
use idgate_core::{Notifier, NotifyError, SendEmailRequest};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// 把 `SendEmailRequest` 以 JSON POST 到配置的地址；非 2xx 视为发送失败
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, NotifyError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NotifyError::InvalidConfig(format!(
                "unsupported notify url scheme: {}",
                url.scheme()
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::InvalidConfig(e.to_string()))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, request), fields(to = %request.to, template = %request.template))]
    async fn send_email(&self, request: SendEmailRequest) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::SendFailed(format!(
                "notification service responded with {status}"
            )));
        }
        debug!("email request accepted");
        Ok(())
    }
}
