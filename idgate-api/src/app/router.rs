use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    change_my_password, create_user, delete_user, get_me, get_user, handler_404, health,
    list_users, login, register, update_user, verify, verify_token,
};
use super::middleware::auth_middleware;
use super::state::AppState;

/// 根据配置的来源列表构建 CorsLayer
fn build_cors_layer(cors_origins: Vec<String>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if cors_origins.is_empty() {
        tracing::warn!(
            "IDG_CORS_ORIGINS not configured, allowing all origins. \
             Set IDG_CORS_ORIGINS in production."
        );
        base.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .into_iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        base.allow_origin(origins).allow_credentials(true)
    }
}

/// Build the router with routes and middleware wired.
pub fn app_router(state: AppState, cors_origins: Vec<String>) -> Router {
    // 公开端点（不需要认证）
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/verify", post(verify))
        .route("/auth/login", post(login))
        .route("/auth/verify-token", post(verify_token));

    // 当前登录用户
    let me_routes = Router::new()
        .route("/me", get(get_me))
        .route("/me/password", post(change_my_password));

    // 用户管理端点（由 handler 中的 RequireAdmin extractor 检查）
    let admin_routes = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        );

    Router::new()
        .merge(public_routes)
        .merge(me_routes)
        .merge(admin_routes)
        .fallback(handler_404)
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(cors_origins))
        .with_state(state)
}
