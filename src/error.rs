use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, RuntimeErr, SqlErr};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Exhausted: {0}")]
    Exhausted(String),

    #[error("Expired: {0}")]
    Expired(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Ledger failure: {0}")]
    LedgerFailure(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        // 唯一约束冲突 = 并发请求已经占用了该资源
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            log::warn!("Unique constraint violation: {detail}");
            return AppError::Conflict("Resource was modified by a concurrent request".to_string());
        }
        // 死锁 / 串行化失败 / 锁等待失败: 事务已回滚, 调用方可重试
        if let Some(code) = sqlstate(&err)
            && is_lock_contention(&code)
        {
            log::warn!("Lock contention ({code}): {err}");
            return AppError::Conflict("Concurrent request conflict, please retry".to_string());
        }
        AppError::DatabaseError(err)
    }
}

fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|c| c.into_owned()),
        _ => None,
    }
}

/// 40P01 deadlock_detected, 40001 serialization_failure, 55P03 lock_not_available
fn is_lock_contention(sqlstate: &str) -> bool {
    matches!(sqlstate, "40P01" | "40001" | "55P03")
}

impl AppError {
    /// 稳定的机器可读错误码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) | AppError::JwtError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::Exhausted(_) => "EXHAUSTED",
            AppError::Expired(_) => "EXPIRED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::LedgerFailure(_) => "LEDGER_FAILURE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ConfigError(_) | AppError::InternalError(_) | AppError::SerdeJsonError(_) => {
                "INTERNAL_ERROR"
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_) | AppError::Exhausted(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Expired(_) => StatusCode::GONE,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::LedgerFailure(_) => StatusCode::PAYMENT_REQUIRED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidTransition(msg)
            | AppError::Exhausted(msg)
            | AppError::Expired(msg)
            | AppError::Conflict(msg)
            | AppError::LedgerFailure(msg) => msg.clone(),
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                msg.clone()
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                "Invalid token".to_string()
            }
            AppError::Unauthorized(msg) => {
                log::warn!("Unauthorized access: {msg}");
                msg.clone()
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                "Database error".to_string()
            }
            _ => {
                log::error!("Internal error: {self}");
                "Internal server error".to_string()
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn database_detail_does_not_leak() {
        let err = AppError::DatabaseError(DbErr::Custom("relation tickets is locked".into()));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["error"]["code"], "DATABASE_ERROR");
        assert_eq!(v["error"]["message"], "Database error");
    }

    #[test]
    fn lock_contention_states_are_retryable() {
        assert!(is_lock_contention("40P01"));
        assert!(is_lock_contention("40001"));
        assert!(is_lock_contention("55P03"));
        assert!(!is_lock_contention("23505"));
        assert!(!is_lock_contention("42P01"));
        assert!(matches!(
            AppError::from(DbErr::Custom("deadlock detected".into())),
            AppError::DatabaseError(_)
        ));
    }

    #[test]
    fn engine_kinds_have_stable_codes() {
        assert_eq!(AppError::Exhausted("x".into()).code(), "EXHAUSTED");
        assert_eq!(AppError::Expired("x".into()).code(), "EXPIRED");
        assert_eq!(AppError::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(AppError::LedgerFailure("x".into()).code(), "LEDGER_FAILURE");
        assert_eq!(
            AppError::InvalidTransition("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
