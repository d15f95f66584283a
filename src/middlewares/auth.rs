use crate::error::AppError;
use crate::utils::JwtService;
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

/// 已认证的调用方, 由中间件注入请求扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Unauthorized("Admin privileges required".to_string()))
        }
    }

    /// 资源所有者或管理员
    pub fn require_owner_or_admin(&self, owner_id: i64) -> Result<(), AppError> {
        if self.is_admin || self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Unauthorized(
                "Caller does not own this resource".to_string(),
            ))
        }
    }
}

// 公开路径配置
struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            // 完全匹配的公开路径
            exact_paths: vec![
                "/swagger-ui",
                "/swagger-ui/",
                "/api-docs/openapi.json",
                "/api/v1/raffles",
            ],
            // 前缀匹配的公开路径
            prefix_paths: vec!["/swagger-ui/", "/api-docs/"],
        }
    }

    fn is_public_path(&self, method: &Method, path: &str) -> bool {
        if self.exact_paths.contains(&path) && (path != "/api/v1/raffles" || method == Method::GET)
        {
            return true;
        }

        self.prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行所有 CORS 预检请求
        if req.method() == Method::OPTIONS {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        if self.public_paths.is_public_path(req.method(), req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned);

        let Some(token) = token else {
            let error = AppError::AuthError("Missing access token".to_string());
            return Box::pin(async move { Err(error.into()) });
        };

        let caller = self
            .jwt_service
            .verify_access_token(&token)
            .and_then(|claims| {
                let user_id = claims
                    .sub
                    .parse::<i64>()
                    .map_err(|_| AppError::AuthError("Invalid subject claim".to_string()))?;
                Ok(Caller {
                    user_id,
                    is_admin: claims.is_admin,
                })
            });

        match caller {
            Ok(caller) => {
                req.extensions_mut().insert(caller);
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Err(_) => {
                let error = AppError::AuthError("Invalid access token".to_string());
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}

/// 从请求扩展中获取调用方（中间件在鉴权后注入）
pub fn get_caller(req: &HttpRequest) -> Result<Caller, AppError> {
    req.extensions()
        .get::<Caller>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::jwt::sign_for_test;
    use actix_web::test as actix_test;
    use actix_web::{App, HttpResponse, web};

    async fn whoami(req: HttpRequest) -> HttpResponse {
        match get_caller(&req) {
            Ok(caller) => HttpResponse::Ok().json(serde_json::json!({
                "user_id": caller.user_id,
                "is_admin": caller.is_admin,
            })),
            Err(e) => actix_web::ResponseError::error_response(&e),
        }
    }

    #[actix_web::test]
    async fn injects_caller_from_bearer_token() {
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(JwtService::new("secret")))
                .route("/api/v1/me", web::get().to(whoami)),
        )
        .await;

        let token = sign_for_test("secret", 9, true, "access");
        let req = actix_test::TestRequest::get()
            .uri("/api/v1/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user_id"], 9);
        assert_eq!(body["is_admin"], true);
    }

    #[actix_web::test]
    async fn rejects_missing_token() {
        let app = actix_test::init_service(
            App::new()
                .wrap(AuthMiddleware::new(JwtService::new("secret")))
                .route("/api/v1/me", web::get().to(whoami)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/v1/me").to_request();
        let resp = actix_test::try_call_service(&app, req).await;
        let err = resp.err().unwrap();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn raffle_listing_is_public_only_for_get() {
        let paths = PublicPaths::new();
        assert!(paths.is_public_path(&Method::GET, "/api/v1/raffles"));
        assert!(!paths.is_public_path(&Method::POST, "/api/v1/raffles"));
        assert!(paths.is_public_path(&Method::GET, "/swagger-ui/index.html"));
        assert!(!paths.is_public_path(&Method::GET, "/api/v1/tickets/mine"));
    }

    #[test]
    fn owner_or_admin_rule() {
        assert!(Caller::user(1).require_owner_or_admin(1).is_ok());
        assert!(Caller::admin(2).require_owner_or_admin(1).is_ok());
        assert!(matches!(
            Caller::user(2).require_owner_or_admin(1),
            Err(AppError::Unauthorized(_))
        ));
        assert!(Caller::user(1).require_admin().is_err());
    }
}
