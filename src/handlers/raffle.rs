use crate::middlewares::get_caller;
use crate::models::*;
use crate::services::{
    ClaimService, DrawService, InstantWinService, PurchaseLimitService, RaffleService,
    TicketService,
};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/raffles",
    tag = "raffle",
    params(
        ("status" = Option<String>, Query, description = "状态过滤"),
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    responses(
        (status = 200, description = "活动列表")
    )
)]
pub async fn list_raffles(
    raffle_service: web::Data<RaffleService>,
    query: web::Query<RaffleListQuery>,
) -> Result<HttpResponse> {
    match raffle_service.list_raffles(&query).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/raffles",
    tag = "raffle",
    request_body = CreateRaffleRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "创建成功", body = RaffleResponse),
        (status = 400, description = "参数错误"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn create_raffle(
    raffle_service: web::Data<RaffleService>,
    req: HttpRequest,
    request: web::Json<CreateRaffleRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match raffle_service.create_raffle(&caller, request.into_inner()).await {
        Ok(raffle) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": raffle
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}",
    tag = "raffle",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "活动详情", body = RaffleResponse),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_raffle(
    raffle_service: web::Data<RaffleService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match raffle_service.get_raffle(path.into_inner()).await {
        Ok(raffle) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": raffle
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/raffles/{id}",
    tag = "raffle",
    params(("id" = Uuid, Path, description = "活动ID")),
    request_body = UpdateRaffleRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "更新成功", body = RaffleResponse),
        (status = 422, description = "当前状态不可编辑")
    )
)]
pub async fn update_raffle(
    raffle_service: web::Data<RaffleService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<UpdateRaffleRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match raffle_service
        .update_raffle(&caller, path.into_inner(), request.into_inner())
        .await
    {
        Ok(raffle) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": raffle
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/raffles/{id}/status",
    tag = "raffle",
    params(("id" = Uuid, Path, description = "活动ID")),
    request_body = ChangeRaffleStatusRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "状态已变更", body = RaffleResponse),
        (status = 422, description = "非法状态迁移")
    )
)]
pub async fn change_status(
    raffle_service: web::Data<RaffleService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<ChangeRaffleStatusRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    let request = request.into_inner();
    match raffle_service
        .change_status(&caller, path.into_inner(), request.status, request.reason)
        .await
    {
        Ok(raffle) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": raffle
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/history",
    tag = "raffle",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "状态变更记录"))
)]
pub async fn status_history(
    raffle_service: web::Data<RaffleService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match raffle_service.status_history(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/raffles/{id}/prizes",
    tag = "raffle",
    params(("id" = Uuid, Path, description = "活动ID")),
    request_body = ConfigurePrizesRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "奖品已配置"),
        (status = 422, description = "仅草稿状态可配置")
    )
)]
pub async fn configure_prizes(
    raffle_service: web::Data<RaffleService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<ConfigurePrizesRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match raffle_service
        .configure_prizes(&caller, path.into_inner(), request.into_inner())
        .await
    {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/prizes",
    tag = "raffle",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "奖品列表"))
)]
pub async fn list_prizes(
    raffle_service: web::Data<RaffleService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match raffle_service.list_prizes(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/prizes/validate",
    tag = "raffle",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "奖品配置校验结果", body = PrizeValidationResponse))
)]
pub async fn validate_prizes(
    raffle_service: web::Data<RaffleService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match raffle_service
        .validate_prize_configuration(path.into_inner())
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/raffles/{id}/instant-wins",
    tag = "instant_win",
    params(("id" = Uuid, Path, description = "活动ID")),
    request_body = AllocateInstantWinsRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "分配成功"),
        (status = 409, description = "已分配过"),
        (status = 422, description = "仅草稿状态可分配")
    )
)]
pub async fn allocate_instant_wins(
    instant_win_service: web::Data<InstantWinService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<AllocateInstantWinsRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match instant_win_service
        .allocate_instant_wins(&caller, path.into_inner(), request.count)
        .await
    {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/instant-wins",
    tag = "instant_win",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "即开奖列表"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn list_instant_wins(
    instant_win_service: web::Data<InstantWinService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match instant_win_service
        .list_instant_wins(&caller, path.into_inner())
        .await
    {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/instant-wins/stats",
    tag = "instant_win",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "即开奖统计", body = InstantWinStatsResponse))
)]
pub async fn instant_win_stats(
    instant_win_service: web::Data<InstantWinService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match instant_win_service.instant_win_stats(path.into_inner()).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/raffles/{id}/draw",
    tag = "draw",
    params(("id" = Uuid, Path, description = "活动ID")),
    request_body = ExecuteDrawRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "开奖结果"),
        (status = 422, description = "活动未结束")
    )
)]
pub async fn execute_draw(
    draw_service: web::Data<DrawService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<ExecuteDrawRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match draw_service
        .execute_draw(&caller, path.into_inner(), request.draw_count)
        .await
    {
        Ok(results) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": results
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/draw",
    tag = "draw",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "开奖结果"))
)]
pub async fn draw_results(
    draw_service: web::Data<DrawService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match draw_service.draw_results(path.into_inner()).await {
        Ok(results) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": results
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/statistics",
    tag = "raffle",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "票务统计", body = RaffleStatisticsResponse))
)]
pub async fn raffle_statistics(
    ticket_service: web::Data<TicketService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match ticket_service.raffle_statistics(path.into_inner()).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/claims/statistics",
    tag = "claim",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "兑奖统计", body = ClaimStatisticsResponse))
)]
pub async fn claim_statistics(
    claim_service: web::Data<ClaimService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match claim_service.claim_statistics(path.into_inner()).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/tickets/{number}",
    tag = "ticket",
    params(
        ("id" = Uuid, Path, description = "活动ID"),
        ("number" = String, Path, description = "票号")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "票详情", body = TicketResponse),
        (status = 404, description = "票不存在")
    )
)]
pub async fn ticket_by_number(
    ticket_service: web::Data<TicketService>,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse> {
    let (raffle_id, number) = path.into_inner();
    match ticket_service.ticket_by_number(raffle_id, &number).await {
        Ok(ticket) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ticket
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/purchase-limit",
    tag = "raffle",
    params(
        ("id" = Uuid, Path, description = "活动ID"),
        ("quantity" = Option<i32>, Query, description = "计划购买数量 (默认 1)")
    ),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "限购检查结果", body = PurchaseLimitResponse))
)]
pub async fn check_purchase_limit(
    limit_service: web::Data<PurchaseLimitService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<PurchaseLimitQuery>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match limit_service
        .check_purchase_limit(&caller, path.into_inner(), query.quantity.unwrap_or(1))
        .await
    {
        Ok(result) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": result
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/raffles/{id}/my-stats",
    tag = "raffle",
    params(("id" = Uuid, Path, description = "活动ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "当前用户购票统计", body = UserRaffleStatsResponse))
)]
pub async fn my_stats(
    limit_service: web::Data<PurchaseLimitService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match limit_service.user_stats(&caller, path.into_inner()).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn raffle_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/raffles")
            .route("", web::get().to(list_raffles))
            .route("", web::post().to(create_raffle))
            .route("/{id}", web::get().to(get_raffle))
            .route("/{id}", web::put().to(update_raffle))
            .route("/{id}/status", web::post().to(change_status))
            .route("/{id}/history", web::get().to(status_history))
            .route("/{id}/prizes", web::put().to(configure_prizes))
            .route("/{id}/prizes", web::get().to(list_prizes))
            .route("/{id}/prizes/validate", web::get().to(validate_prizes))
            .route("/{id}/instant-wins", web::post().to(allocate_instant_wins))
            .route("/{id}/instant-wins", web::get().to(list_instant_wins))
            .route("/{id}/instant-wins/stats", web::get().to(instant_win_stats))
            .route("/{id}/draw", web::post().to(execute_draw))
            .route("/{id}/draw", web::get().to(draw_results))
            .route("/{id}/statistics", web::get().to(raffle_statistics))
            .route("/{id}/claims/statistics", web::get().to(claim_statistics))
            .route("/{id}/tickets/{number}", web::get().to(ticket_by_number))
            .route("/{id}/purchase-limit", web::get().to(check_purchase_limit))
            .route("/{id}/my-stats", web::get().to(my_stats)),
    );
}
