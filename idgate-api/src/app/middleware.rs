use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use idgate_core::{TokenClaims, UserType};

use super::error::ApiError;
use super::state::AppState;

/// 认证信息扩展
#[derive(Debug, Clone)]
pub struct AuthInfo {
	pub claims: TokenClaims,
}

impl AuthInfo {
	/// 检查是否是管理员
	pub fn is_admin(&self) -> bool {
		self.claims.user_type == UserType::Admin
	}
}

impl<S: Send + Sync> FromRequestParts<S> for AuthInfo {
	type Rejection = ApiError;

	fn from_request_parts<'a, 'b, 'c>(
		parts: &'a mut Parts,
		_state: &'b S,
	) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'c>>
	where
		'a: 'c,
		'b: 'c,
	{
		Box::pin(async move {
			parts
				.extensions
				.get::<AuthInfo>()
				.cloned()
				.ok_or_else(ApiError::unauthorized)
		})
	}
}

/// 要求管理员权限的 Extractor
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthInfo);

impl<S: Send + Sync> FromRequestParts<S> for RequireAdmin {
	type Rejection = ApiError;

	fn from_request_parts<'a, 'b, 'c>(
		parts: &'a mut Parts,
		state: &'b S,
	) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'c>>
	where
		'a: 'c,
		'b: 'c,
	{
		Box::pin(async move {
			let auth = AuthInfo::from_request_parts(parts, state).await?;
			if !auth.is_admin() {
				return Err(ApiError::forbidden("admin access required"));
			}
			Ok(RequireAdmin(auth))
		})
	}
}

/// 客户端 IP（限流 key）
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
	type Rejection = ApiError;

	fn from_request_parts<'a, 'b, 'c>(
		parts: &'a mut Parts,
		state: &'b AppState,
	) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'c>>
	where
		'a: 'c,
		'b: 'c,
	{
		Box::pin(async move {
			let socket = parts
				.extensions
				.get::<ConnectInfo<SocketAddr>>()
				.map(|ci| ci.0);
			Ok(ClientIp(extract_client_ip(
				&parts.headers,
				socket,
				state.trust_proxy_headers,
			)))
		})
	}
}

/// 不需要认证的路径
const PUBLIC_PATHS: &[&str] = &[
	"/health",
	"/auth/register",
	"/auth/verify",
	"/auth/login",
	"/auth/verify-token",
];

/// 从 Authorization header 提取 Bearer token
fn extract_token(request: &Request<Body>) -> Option<&str> {
	request
		.headers()
		.get(axum::http::header::AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.strip_prefix("Bearer "))
		.map(str::trim)
		.filter(|t| !t.is_empty())
}

/// 提取客户端 IP
/// 仅在信任反向代理时读取 X-Real-IP > X-Forwarded-For（第一个），否则只用 Socket Address
fn extract_client_ip(headers: &HeaderMap, socket: Option<SocketAddr>, trust_proxy: bool) -> String {
	if trust_proxy {
		if let Some(real_ip) = headers.get("X-Real-IP").and_then(|v| v.to_str().ok()) {
			let real_ip = real_ip.trim();
			if !real_ip.is_empty() {
				return real_ip.to_string();
			}
		}

		if let Some(forwarded) = headers
			.get("X-Forwarded-For")
			.and_then(|v| v.to_str().ok())
		{
			if let Some(first_ip) = forwarded.split(',').next().map(|s| s.trim()) {
				if !first_ip.is_empty() {
					return first_ip.to_string();
				}
			}
		}
	}

	socket
		.map(|addr| addr.ip().to_string())
		.unwrap_or_else(|| "unknown".to_string())
}

pub async fn auth_middleware(
	State(state): State<AppState>,
	mut request: Request<Body>,
	next: Next,
) -> Result<Response, ApiError> {
	// 公开端点不需要认证
	if PUBLIC_PATHS.iter().any(|p| request.uri().path() == *p) {
		return Ok(next.run(request).await);
	}

	let token = extract_token(&request).ok_or_else(ApiError::unauthorized)?;
	let claims = state.auth.authenticate(token)?;

	request.extensions_mut().insert(AuthInfo { claims });
	Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn client_ip_prefers_proxy_headers_when_trusted() {
		let socket: SocketAddr = "10.0.0.1:5000".parse().unwrap();
		let mut headers = HeaderMap::new();
		assert_eq!(extract_client_ip(&headers, Some(socket), true), "10.0.0.1");
		assert_eq!(extract_client_ip(&headers, None, true), "unknown");

		headers.insert("X-Forwarded-For", "1.1.1.1, 2.2.2.2".parse().unwrap());
		assert_eq!(extract_client_ip(&headers, Some(socket), true), "1.1.1.1");

		headers.insert("X-Real-IP", "3.3.3.3".parse().unwrap());
		assert_eq!(extract_client_ip(&headers, Some(socket), true), "3.3.3.3");
	}

	#[test]
	fn client_ip_ignores_proxy_headers_by_default() {
		let socket: SocketAddr = "10.0.0.1:5000".parse().unwrap();
		let mut headers = HeaderMap::new();
		headers.insert("X-Forwarded-For", "1.1.1.1".parse().unwrap());
		headers.insert("X-Real-IP", "3.3.3.3".parse().unwrap());
		assert_eq!(extract_client_ip(&headers, Some(socket), false), "10.0.0.1");
		assert_eq!(extract_client_ip(&headers, None, false), "unknown");
	}
}
