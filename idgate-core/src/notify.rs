//! 通知发送：核心只依赖“发送模板邮件”这一个能力。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

pub const VERIFICATION_SUBJECT: &str = "Verification email";
pub const VERIFICATION_TEMPLATE: &str = "verification_email";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to send email: {0}")]
    SendFailed(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// 发送模板邮件请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    /// 模板变量
    pub body: BTreeMap<String, String>,
    /// 模板/类型标识
    #[serde(rename = "type")]
    pub template: String,
}

impl SendEmailRequest {
    /// 验证码邮件
    pub fn verification(to: &str, code: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: VERIFICATION_SUBJECT.to_string(),
            body: BTreeMap::from([("code".to_string(), code.to_string())]),
            template: VERIFICATION_TEMPLATE.to_string(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, request: SendEmailRequest) -> Result<(), NotifyError>;
}

/// 只写日志的实现（未配置通知服务时使用）
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email(&self, request: SendEmailRequest) -> Result<(), NotifyError> {
        info!(
            to = %request.to,
            template = %request.template,
            "email dispatch skipped: no notification service configured"
        );
        Ok(())
    }
}

/// 记录所有请求的内存实现，用于测试与本地运行
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<SendEmailRequest>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<SendEmailRequest> {
        self.sent.lock().await.clone()
    }

    /// 最近一次发给 `to` 的请求
    pub async fn last_sent_to(&self, to: &str) -> Option<SendEmailRequest> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|r| r.to == to)
            .cloned()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send_email(&self, request: SendEmailRequest) -> Result<(), NotifyError> {
        self.sent.lock().await.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_request_shape() {
        let req = SendEmailRequest::verification("ann@x.com", "123456");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["to"], "ann@x.com");
        assert_eq!(json["subject"], "Verification email");
        assert_eq!(json["body"]["code"], "123456");
        assert_eq!(json["type"], "verification_email");
    }

    #[tokio::test]
    async fn memory_notifier_records_latest() {
        let notifier = MemoryNotifier::new();
        notifier
            .send_email(SendEmailRequest::verification("a@x.com", "111111"))
            .await
            .unwrap();
        notifier
            .send_email(SendEmailRequest::verification("a@x.com", "222222"))
            .await
            .unwrap();
        let last = notifier.last_sent_to("a@x.com").await.unwrap();
        assert_eq!(last.body["code"], "222222");
        assert_eq!(notifier.sent().await.len(), 2);
        assert!(notifier.last_sent_to("b@x.com").await.is_none());
    }
}
