mod app;

use app::{app_router, AppState, RateLimiter, WebhookNotifier};
use dotenvy::dotenv;
use idgate_core::{
    AuthConfig, AuthService, FilePermissionStore, FileUserStore, LogNotifier, MemoryCache,
    Notifier,
};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

#[derive(Debug, Clone)]
struct ApiConfig {
    bind: SocketAddr,
    data_dir: PathBuf,
    /// JWT 签名密钥
    jwt_secret: String,
    /// JWT iss
    jwt_issuer: String,
    /// JWT aud
    jwt_audience: String,
    /// 通知服务 webhook；未配置时只写日志
    notify_url: Option<Url>,
    /// CORS 允许的来源列表（空则允许所有）
    cors_origins: Vec<String>,
    /// 限流时是否采用代理头中的客户端 IP
    trust_proxy_headers: bool,
}

impl ApiConfig {
    fn from_env() -> anyhow::Result<Self> {
        let bind = match env::var("IDG_BIND") {
            Ok(s) => s.parse()?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let data_dir = env::var("IDG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let jwt_secret = env::var("IDG_JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                info!("IDG_JWT_SECRET not set; generating a random secret for this run");
                uuid::Uuid::new_v4().to_string()
            });
        let jwt_issuer = env::var("IDG_JWT_ISSUER").unwrap_or_else(|_| "idgate-api".into());
        let jwt_audience =
            env::var("IDG_JWT_AUDIENCE").unwrap_or_else(|_| "idgate-clients".into());

        let notify_url = match env::var("IDG_NOTIFY_URL") {
            Ok(s) if !s.trim().is_empty() => Some(Url::parse(s.trim())?),
            _ => None,
        };

        // 逗号分隔；空或 "*" 表示允许所有
        let cors_origins = env::var("IDG_CORS_ORIGINS")
            .ok()
            .map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed == "*" {
                    vec![]
                } else {
                    trimmed
                        .split(',')
                        .filter(|t| !t.trim().is_empty())
                        .map(|t| t.trim().to_string())
                        .collect()
                }
            })
            .unwrap_or_default();

        let trust_proxy_headers = env::var("IDG_TRUST_PROXY_HEADERS")
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            bind,
            data_dir,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            notify_url,
            cors_origins,
            trust_proxy_headers,
        })
    }

    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.jwt_secret.clone())
            .with_claims_context(self.jwt_issuer.clone(), self.jwt_audience.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 优先读取 .env（若存在）
    let _ = dotenv();
    // 日志格式需要在读取其余配置前确定
    let json_logs = env::var("IDG_LOG_FORMAT")
        .map(|s| s.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    init_tracing(json_logs);

    let config = ApiConfig::from_env()?;
    info!(bind = %config.bind, data_dir = %config.data_dir.display(), "starting API");

    let users = FileUserStore::new(config.data_dir.clone());
    users.ensure_dirs().await?;
    let permissions = FilePermissionStore::load(&config.data_dir).await?;

    let notifier: Arc<dyn Notifier> = match &config.notify_url {
        Some(url) => {
            info!(url = %url, "verification emails dispatched via webhook");
            Arc::new(WebhookNotifier::new(url.clone(), Duration::from_secs(10))?)
        }
        None => Arc::new(LogNotifier),
    };

    let auth = Arc::new(AuthService::new(
        &config.auth_config(),
        Arc::new(users),
        Arc::new(permissions),
        Arc::new(MemoryCache::new()),
        notifier,
    ));

    let state = AppState {
        auth,
        login_limiter: Arc::new(RateLimiter::new(10, Duration::from_secs(60))),
        register_limiter: Arc::new(RateLimiter::new(5, Duration::from_secs(60))),
        trust_proxy_headers: config.trust_proxy_headers,
    };

    let app = app_router(state, config.cors_origins.clone());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
