use crate::middlewares::get_caller;
use crate::models::*;
use crate::services::{
    ClaimService, LedgerService, PurchaseLimitService, RaffleService, ReservationService,
};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/admin/sweeps/reservations",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "过期预留已释放", body = SweepResponse),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn expire_reservations(
    reservation_service: web::Data<ReservationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    get_caller(&req)?.require_admin()?;
    match reservation_service.expire_stale_reservations().await {
        Ok(affected) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SweepResponse { affected }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/sweeps/claims",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "过期兑奖单已处理", body = SweepResponse),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn expire_claims(
    claim_service: web::Data<ClaimService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    get_caller(&req)?.require_admin()?;
    match claim_service.expire_stale_claims().await {
        Ok(affected) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SweepResponse { affected }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/sweeps/raffles",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "已结束的活动已关闭", body = SweepResponse),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn close_raffles(
    raffle_service: web::Data<RaffleService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    get_caller(&req)?.require_admin()?;
    match raffle_service.close_ended_raffles().await {
        Ok(affected) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SweepResponse { affected }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/purchase-counts/repair",
    tag = "admin",
    request_body = RepairPurchaseCountsRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "购票计数已校正", body = RepairReport),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn repair_purchase_counts(
    limit_service: web::Data<PurchaseLimitService>,
    req: HttpRequest,
    request: web::Json<RepairPurchaseCountsRequest>,
) -> Result<HttpResponse> {
    get_caller(&req)?.require_admin()?;
    match limit_service.repair_purchase_counts(request.raffle_id).await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": report
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/credits/adjust",
    tag = "admin",
    request_body = AdjustBalanceRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "余额已调整", body = CreditTransactionResponse),
        (status = 402, description = "调整后余额为负")
    )
)]
pub async fn adjust_balance(
    ledger_service: web::Data<LedgerService>,
    req: HttpRequest,
    request: web::Json<AdjustBalanceRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match ledger_service
        .adjust_balance(&caller, request.user_id, request.amount_cents, &request.note)
        .await
    {
        Ok(tx) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": tx
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/credits/{user_id}/transactions",
    tag = "admin",
    params(
        ("user_id" = i64, Path, description = "用户ID"),
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "用户余额流水"))
)]
pub async fn user_transactions(
    ledger_service: web::Data<LedgerService>,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match ledger_service
        .transactions(&caller, path.into_inner(), &query)
        .await
    {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/credits/{user_id}/verify",
    tag = "admin",
    params(("user_id" = i64, Path, description = "用户ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "账户流水核对结果", body = AccountVerificationResponse))
)]
pub async fn verify_account(
    ledger_service: web::Data<LedgerService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    get_caller(&req)?.require_admin()?;
    match ledger_service.verify_account(path.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/sweeps/reservations", web::post().to(expire_reservations))
            .route("/sweeps/claims", web::post().to(expire_claims))
            .route("/sweeps/raffles", web::post().to(close_raffles))
            .route("/purchase-counts/repair", web::post().to(repair_purchase_counts))
            .route("/credits/adjust", web::post().to(adjust_balance))
            .route("/credits/{user_id}/transactions", web::get().to(user_transactions))
            .route("/credits/{user_id}/verify", web::get().to(verify_account)),
    );
}
