use crate::middlewares::get_caller;
use crate::models::*;
use crate::services::{InstantWinService, TicketService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/tickets",
    tag = "ticket",
    params(("raffle_id" = Option<Uuid>, Query, description = "活动ID过滤")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "我的票"))
)]
pub async fn my_tickets(
    ticket_service: web::Data<TicketService>,
    req: HttpRequest,
    query: web::Query<UserTicketsQuery>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match ticket_service.user_tickets(&caller, &query).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": list
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/tickets/reveal",
    tag = "ticket",
    request_body = RevealTicketsRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "揭晓结果"),
        (status = 403, description = "不是票的持有人"),
        (status = 422, description = "票未售出或已揭晓")
    )
)]
pub async fn reveal_tickets(
    ticket_service: web::Data<TicketService>,
    req: HttpRequest,
    request: web::Json<RevealTicketsRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match ticket_service
        .reveal_tickets(&caller, request.into_inner())
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
    post,
    path = "/tickets/{id}/discover",
    tag = "instant_win",
    params(("id" = Uuid, Path, description = "票ID")),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "即开奖 (未中奖时 data 为 null)"))
)]
pub async fn discover(
    instant_win_service: web::Data<InstantWinService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match instant_win_service
        .discover(&caller, path.into_inner())
        .await
    {
        Ok(win) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": win
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/tickets/{id}/void",
    tag = "ticket",
    params(("id" = Uuid, Path, description = "票ID")),
    request_body = VoidTicketRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "已作废", body = TicketResponse),
        (status = 409, description = "票被预留持有")
    )
)]
pub async fn void_ticket(
    ticket_service: web::Data<TicketService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<VoidTicketRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match ticket_service
        .void_ticket(&caller, path.into_inner(), &request.reason)
        .await
    {
        Ok(ticket) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ticket
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn ticket_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tickets")
            .route("", web::get().to(my_tickets))
            .route("/reveal", web::post().to(reveal_tickets))
            .route("/{id}/discover", web::post().to(discover))
            .route("/{id}/void", web::post().to(void_ticket)),
    );
}
