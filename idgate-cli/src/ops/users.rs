//! 用户管理 CLI 操作（需要管理员 token）

use super::output::print_json;
use super::ui::{
    or_dash, print_empty, print_header, print_kv, print_success, print_table_header,
    print_table_row,
};
use super::OutputFormat;
use crate::client::handle_error;
use idgate_core::{UserSummary, UserType};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 分页结果（从 API 返回）
#[derive(Debug, Serialize, Deserialize)]
struct UserList {
    users: Vec<UserSummary>,
    count: u64,
}

/// 创建用户参数
#[derive(Debug, Clone, Serialize)]
pub struct NewUserArgs {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub user_type: UserType,
}

pub(super) fn print_user(user: &UserSummary, output: OutputFormat) -> anyhow::Result<()> {
    if print_json(user, output)? {
        return Ok(());
    }
    print_header(&format!("👤 {} {}", user.first_name, user.last_name));
    print_kv("ID", &user.id.to_string());
    print_kv("Email", &user.email);
    print_kv("Type", user.user_type.as_str());
    print_kv("Username", or_dash(user.username.as_deref()));
    print_kv("Phone", or_dash(user.phone_number.as_deref()));
    print_kv("Gender", or_dash(user.gender.as_deref()));
    print_kv("Avatar", or_dash(user.profile_image_url.as_deref()));
    print_kv("Created", &user.created_at.to_rfc3339());
    println!();
    Ok(())
}

/// 分页列出用户
pub async fn list_users(
    client: &Client,
    base: &str,
    page: u32,
    limit: u32,
    search: Option<&str>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/users", base);
    let mut query = vec![("page", page.to_string()), ("limit", limit.to_string())];
    if let Some(search) = search {
        query.push(("search", search.to_string()));
    }
    let resp = client.get(&url).query(&query).send().await?;
    let list: UserList = handle_error(resp).await?.json().await?;

    if print_json(&list, output)? {
        return Ok(());
    }
    print_header(&format!("👥 用户列表 ({} total)", list.count));
    if list.users.is_empty() {
        print_empty("暂无用户");
        return Ok(());
    }
    print_table_header(&[("ID", 8), ("EMAIL", 28), ("NAME", 24), ("TYPE", 6)]);
    for user in &list.users {
        let id = user.id.to_string();
        let name = format!("{} {}", user.first_name, user.last_name);
        print_table_row(&[
            (&id, 8),
            (&user.email, 28),
            (&name, 24),
            (user.user_type.as_str(), 6),
        ]);
    }
    println!();
    Ok(())
}

/// 获取用户详情
pub async fn get_user(
    client: &Client,
    base: &str,
    id: i64,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/users/{}", base, id);
    let resp = client.get(&url).send().await?;
    let user: UserSummary = handle_error(resp).await?.json().await?;
    print_user(&user, output)
}

/// 直接创建用户（跳过邮箱验证）
pub async fn create_user(
    client: &Client,
    base: &str,
    args: &NewUserArgs,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let url = format!("{}/users", base);
    let resp = client.post(&url).json(args).send().await?;
    let user: UserSummary = handle_error(resp).await?.json().await?;
    if output == OutputFormat::Table {
        print_success(&format!("用户已创建: {}", user.email));
    }
    print_user(&user, output)
}

/// 更新资料；`Some("")` 表示清空可选字段
pub async fn update_user(
    client: &Client,
    base: &str,
    id: i64,
    fields: &[(&str, Option<String>)],
    output: OutputFormat,
) -> anyhow::Result<()> {
    let body = update_body(fields);
    if body.is_empty() {
        anyhow::bail!("nothing to update; pass at least one field");
    }
    let url = format!("{}/users/{}", base, id);
    let resp = client.put(&url).json(&body).send().await?;
    let user: UserSummary = handle_error(resp).await?.json().await?;
    print_user(&user, output)
}

fn update_body(fields: &[(&str, Option<String>)]) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|(key, value)| {
            let value = value.as_ref()?;
            let json = if value.is_empty() {
                Value::Null
            } else {
                Value::String(value.clone())
            };
            Some((key.to_string(), json))
        })
        .collect()
}

/// 删除用户
pub async fn delete_user(client: &Client, base: &str, id: i64) -> anyhow::Result<()> {
    let url = format!("{}/users/{}", base, id);
    let resp = client.delete(&url).send().await?;
    handle_error(resp).await?;
    print_success(&format!("用户 {} 已删除", id));
    Ok(())
}
