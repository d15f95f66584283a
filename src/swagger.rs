use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    ClaimMethod, ClaimSource, ClaimStatus, CreditReferenceType, CreditTransactionType,
    InstantWinStatus, PrizeKind, RaffleStatus, ReservationStatus, TicketStatus,
};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::raffle::list_raffles,
        handlers::raffle::create_raffle,
        handlers::raffle::get_raffle,
        handlers::raffle::update_raffle,
        handlers::raffle::change_status,
        handlers::raffle::status_history,
        handlers::raffle::configure_prizes,
        handlers::raffle::list_prizes,
        handlers::raffle::validate_prizes,
        handlers::raffle::allocate_instant_wins,
        handlers::raffle::list_instant_wins,
        handlers::raffle::instant_win_stats,
        handlers::raffle::execute_draw,
        handlers::raffle::draw_results,
        handlers::raffle::raffle_statistics,
        handlers::raffle::claim_statistics,
        handlers::raffle::ticket_by_number,
        handlers::raffle::check_purchase_limit,
        handlers::raffle::my_stats,
        handlers::reservation::create_reservation,
        handlers::reservation::get_reservation,
        handlers::reservation::confirm_reservation,
        handlers::reservation::cancel_reservation,
        handlers::ticket::my_tickets,
        handlers::ticket::reveal_tickets,
        handlers::ticket::discover,
        handlers::ticket::void_ticket,
        handlers::claim::my_claims,
        handlers::claim::get_claim,
        handlers::claim::initiate_claim,
        handlers::claim::complete_claim,
        handlers::claim::cancel_claim,
        handlers::credit::my_balance,
        handlers::credit::my_transactions,
        handlers::admin::expire_reservations,
        handlers::admin::expire_claims,
        handlers::admin::close_raffles,
        handlers::admin::repair_purchase_counts,
        handlers::admin::adjust_balance,
        handlers::admin::user_transactions,
        handlers::admin::verify_account,
    ),
    components(
        schemas(
            RaffleStatus,
            TicketStatus,
            ReservationStatus,
            PrizeKind,
            InstantWinStatus,
            ClaimStatus,
            ClaimSource,
            ClaimMethod,
            CreditTransactionType,
            CreditReferenceType,
            CreateRaffleRequest,
            UpdateRaffleRequest,
            ChangeRaffleStatusRequest,
            RaffleResponse,
            RaffleStatusChangeResponse,
            PrizeInput,
            ConfigurePrizesRequest,
            PrizeResponse,
            PrizeValidationResponse,
            TicketResponse,
            RevealTicketsRequest,
            RevealedTicketResponse,
            VoidTicketRequest,
            RaffleStatisticsResponse,
            CreateReservationRequest,
            PaymentSource,
            ConfirmReservationRequest,
            ReservationResponse,
            PurchaseConfirmation,
            PurchaseLimitResponse,
            UserRaffleStatsResponse,
            RepairPurchaseCountsRequest,
            RepairReport,
            AllocateInstantWinsRequest,
            InstantWinResponse,
            InstantWinStatsResponse,
            ExecuteDrawRequest,
            DrawResultResponse,
            ClaimAllocationResponse,
            CompleteClaimRequest,
            CancelAllocationRequest,
            ClaimReceipt,
            ClaimStatisticsResponse,
            CreditBalanceResponse,
            CreditTransactionResponse,
            AdjustBalanceRequest,
            AccountVerificationResponse,
            SweepResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "raffle", description = "Raffle lifecycle and prize configuration API"),
        (name = "reservation", description = "Ticket reservation and purchase API"),
        (name = "ticket", description = "Ticket reveal and inventory API"),
        (name = "instant_win", description = "Instant-win allocation API"),
        (name = "draw", description = "Draw API"),
        (name = "claim", description = "Prize claim API"),
        (name = "credit", description = "Credit ledger API"),
        (name = "admin", description = "Maintenance API"),
    ),
    info(
        title = "Raffle Backend API",
        version = "1.0.0",
        description = "Raffle engine REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
