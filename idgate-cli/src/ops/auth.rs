//! 注册、验证、登录与 token 校验

use super::output::print_json;
use super::ui::{print_header, print_hint, print_kv, print_kv_flag, print_section, print_success};
use super::OutputFormat;
use crate::client::handle_error;
use crossterm::style::Stylize;
use idgate_core::{AuthSession, UserSummary};
use reqwest::Client;
use serde_json::{json, Value};

/// 提交注册信息；验证码由服务端异步发送
pub async fn register(
    client: &Client,
    base: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/auth/register", base);
    let resp = client
        .post(&url)
        .json(&json!({
            "first_name": first_name,
            "last_name": last_name,
            "email": email,
            "password": password
        }))
        .send()
        .await?;
    handle_error(resp).await?;

    if !print_json(&json!({ "status": "pending", "email": email }), output)? {
        print_success(&format!("注册已提交，验证码将发送到 {}", email));
        print_hint(&format!(
            "收到验证码后执行: idgate-cli verify --email {} --code <code>",
            email
        ));
    }
    Ok(())
}

/// 提交验证码完成注册
pub async fn verify(
    client: &Client,
    base: &str,
    email: &str,
    code: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/auth/verify", base);
    let resp = client
        .post(&url)
        .json(&json!({ "email": email, "code": code }))
        .send()
        .await?;
    let session: AuthSession = handle_error(resp).await?.json().await?;
    print_session("✅ 注册完成", &session, output)
}

/// 用户登录
pub async fn login(
    client: &Client,
    base: &str,
    email: &str,
    password: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/auth/login", base);
    let resp = client
        .post(&url)
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    let session: AuthSession = handle_error(resp).await?.json().await?;
    print_session("🔐 登录成功", &session, output)
}

fn print_session(title: &str, session: &AuthSession, output: OutputFormat) -> anyhow::Result<()> {
    if print_json(session, output)? {
        return Ok(());
    }
    print_header(title);
    print_kv("User ID", &session.user.id.to_string());
    print_kv("Email", &session.user.email);
    print_kv("Type", session.user.user_type.as_str());
    print_kv("Token ID", &session.token.token_id);
    print_kv("Expires At", &session.token.expires_at.to_rfc3339());
    print_section("Access Token");
    println!("  {}", session.token.access_token);
    println!();
    print_hint(&format!(
        "设置环境变量以使用此 token: {}",
        "IDG_TOKEN=<access_token>".cyan()
    ));
    Ok(())
}

/// 校验 token 并查询 (资源, 动作) 权限
pub async fn verify_token(
    client: &Client,
    base: &str,
    access_token: &str,
    resource: &str,
    action: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/auth/verify-token", base);
    let resp = client
        .post(&url)
        .json(&json!({
            "access_token": access_token,
            "resource": resource,
            "action": action
        }))
        .send()
        .await?;
    let check: Value = handle_error(resp).await?.json().await?;
    if print_json(&check, output)? {
        return Ok(());
    }

    let field = |key: &str| match &check[key] {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    };
    print_header("🔎 Token 校验");
    print_kv("User ID", &field("user_id"));
    print_kv("Email", &field("email"));
    print_kv("Type", &field("user_type"));
    print_kv("Token ID", &field("token_id"));
    print_kv("Issued At", &field("issued_at"));
    print_kv("Expires At", &field("expires_at"));
    print_kv_flag(
        &format!("{}:{}", resource, action),
        check["has_permission"].as_bool().unwrap_or(false),
    );
    println!();
    Ok(())
}

/// 当前 token 对应的用户
pub async fn me(client: &Client, base: &str, output: OutputFormat) -> anyhow::Result<()> {
    let url = format!("{}/me", base);
    let resp = client.get(&url).send().await?;
    let user: UserSummary = handle_error(resp).await?.json().await?;
    super::users::print_user(&user, output)
}
