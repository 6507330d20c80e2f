//! 请求体、路径与查询参数提取器，解析失败统一返回 `{code, message}`

use axum::extract::{FromRequest, FromRequestParts};

use super::error::ApiError;

/// JSON 请求体
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// 路径参数
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// 查询参数
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);
