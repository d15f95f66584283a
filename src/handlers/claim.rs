use crate::middlewares::get_caller;
use crate::models::*;
use crate::services::ClaimService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/claims",
    tag = "claim",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "我的中奖记录"))
)]
pub async fn my_claims(
    claim_service: web::Data<ClaimService>,
    req: HttpRequest,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match claim_service.user_allocations(&caller, &query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/claims/{id}",
    tag = "claim",
    params(("id" = Uuid, Path, description = "兑奖单ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "兑奖单详情", body = ClaimAllocationResponse),
        (status = 404, description = "兑奖单不存在")
    )
)]
pub async fn get_claim(
    claim_service: web::Data<ClaimService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match claim_service.get_allocation(&caller, path.into_inner()).await {
        Ok(claim) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": claim
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/claims/{id}/initiate",
    tag = "claim",
    params(("id" = Uuid, Path, description = "兑奖单ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "已进入审核通过状态", body = ClaimAllocationResponse),
        (status = 409, description = "已发起过兑奖"),
        (status = 410, description = "已过兑奖期限")
    )
)]
pub async fn initiate_claim(
    claim_service: web::Data<ClaimService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match claim_service.initiate_claim(&caller, path.into_inner()).await {
        Ok(claim) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": claim
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/claims/{id}/complete",
    tag = "claim",
    params(("id" = Uuid, Path, description = "兑奖单ID")),
    request_body = CompleteClaimRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "兑奖完成", body = ClaimReceipt),
        (status = 409, description = "已兑奖"),
        (status = 410, description = "已过兑奖期限")
    )
)]
pub async fn complete_claim(
    claim_service: web::Data<ClaimService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<CompleteClaimRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match claim_service
        .complete_claim(&caller, path.into_inner(), request.into_inner())
        .await
    {
        Ok(receipt) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": receipt
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/claims/{id}/cancel",
    tag = "claim",
    params(("id" = Uuid, Path, description = "兑奖单ID")),
    request_body = CancelAllocationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "已作废", body = ClaimAllocationResponse),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn cancel_claim(
    claim_service: web::Data<ClaimService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<CancelAllocationRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match claim_service
        .cancel_allocation(&caller, path.into_inner(), &request.reason)
        .await
    {
        Ok(claim) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": claim
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn claim_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/claims")
            .route("", web::get().to(my_claims))
            .route("/{id}", web::get().to(get_claim))
            .route("/{id}/initiate", web::post().to(initiate_claim))
            .route("/{id}/complete", web::post().to(complete_claim))
            .route("/{id}/cancel", web::post().to(cancel_claim)),
    );
}
