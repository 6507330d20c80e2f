use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use idgate_core::IdentityError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
    status: StatusCode,
}

impl ApiError {
    pub fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new("unauthenticated", StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("forbidden", StatusCode::FORBIDDEN, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new("too_many_requests", StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        let status = match &err {
            IdentityError::Validation(_) | IdentityError::IncorrectCode => StatusCode::BAD_REQUEST,
            IdentityError::NotFound(_) => StatusCode::NOT_FOUND,
            IdentityError::CodeExpired => StatusCode::GONE,
            IdentityError::InvalidCredentials | IdentityError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            IdentityError::Forbidden(_) => StatusCode::FORBIDDEN,
            IdentityError::Conflict(_) => StatusCode::CONFLICT,
            IdentityError::Internal(_) | IdentityError::Io(_) | IdentityError::Serde(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        // 内部错误只记日志，不把细节返回给客户端
        let message = if err.is_internal() {
            tracing::error!(error = %err, "internal error");
            "internal error".to_string()
        } else {
            err.to_string()
        };
        ApiError::new(err.category(), status, message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new("validation", StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::new("validation", StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new("validation", StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}
