use crate::middlewares::get_caller;
use crate::models::*;
use crate::services::ReservationService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservation",
    request_body = CreateReservationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "预留成功", body = ReservationResponse),
        (status = 410, description = "活动即将结束"),
        (status = 422, description = "余票不足或超过限购")
    )
)]
pub async fn create_reservation(
    reservation_service: web::Data<ReservationService>,
    req: HttpRequest,
    request: web::Json<CreateReservationRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match reservation_service
        .reserve(&caller, request.raffle_id, request.quantity)
        .await
    {
        Ok(reservation) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": reservation
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservation",
    params(("id" = Uuid, Path, description = "预留单ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "预留单详情", body = ReservationResponse),
        (status = 404, description = "预留单不存在")
    )
)]
pub async fn get_reservation(
    reservation_service: web::Data<ReservationService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match reservation_service
        .get_reservation(&caller, path.into_inner())
        .await
    {
        Ok(reservation) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": reservation
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/reservations/{id}/confirm",
    tag = "reservation",
    params(("id" = Uuid, Path, description = "预留单ID")),
    request_body = ConfirmReservationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "购票成功", body = PurchaseConfirmation),
        (status = 402, description = "余额不足"),
        (status = 409, description = "重复确认"),
        (status = 410, description = "预留已过期")
    )
)]
pub async fn confirm_reservation(
    reservation_service: web::Data<ReservationService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<ConfirmReservationRequest>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match reservation_service
        .confirm(&caller, path.into_inner(), request.into_inner().payment)
        .await
    {
        Ok(confirmation) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": confirmation
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservation",
    params(("id" = Uuid, Path, description = "预留单ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "已取消", body = ReservationResponse),
        (status = 422, description = "预留单已结束")
    )
)]
pub async fn cancel_reservation(
    reservation_service: web::Data<ReservationService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let caller = get_caller(&req)?;
    match reservation_service
        .cancel_reservation(&caller, path.into_inner())
        .await
    {
        Ok(reservation) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": reservation
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn reservation_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reservations")
            .route("", web::post().to(create_reservation))
            .route("/{id}", web::get().to(get_reservation))
            .route("/{id}/confirm", web::post().to(confirm_reservation))
            .route("/{id}/cancel", web::post().to(cancel_reservation)),
    );
}
