use crate::middlewares::get_caller;
use crate::models::*;
use crate::services::LedgerService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/credits/balance",
    tag = "credit",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "当前余额", body = CreditBalanceResponse))
)]
pub async fn my_balance(
    ledger_service: web::Data<LedgerService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match ledger_service.balance(caller.user_id).await {
        Ok(balance) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": balance
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/credits/transactions",
    tag = "credit",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "余额流水"))
)]
pub async fn my_transactions(
    ledger_service: web::Data<LedgerService>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match ledger_service
        .transactions(&caller, caller.user_id, &query)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn credit_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/credits")
            .route("/balance", web::get().to(my_balance))
            .route("/transactions", web::get().to(my_transactions)),
    );
}
