use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use raffle_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    // 数据库连接与迁移
    let pool = create_pool(&config.database)
        .await
        .context("Failed to create database connection pool")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let jwt_service = JwtService::new(&config.jwt.secret);

    // 创建服务
    let ledger_service = LedgerService::new(pool.clone());
    let raffle_service = RaffleService::new(pool.clone());
    let ticket_service = TicketService::new(pool.clone(), config.raffle.clone());
    let reservation_service =
        ReservationService::new(pool.clone(), ledger_service.clone(), config.raffle.clone());
    let limit_service = PurchaseLimitService::new(pool.clone());
    let instant_win_service = InstantWinService::new(pool.clone(), config.raffle.clone());
    let draw_service = DrawService::new(pool.clone(), config.raffle.clone());
    let claim_service = ClaimService::new(pool.clone(), ledger_service.clone());

    // 后台清理任务
    tasks::spawn_all(
        config.scheduler.clone(),
        reservation_service.clone(),
        claim_service.clone(),
        raffle_service.clone(),
        limit_service.clone(),
    );

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let allowed_origins = config.server.allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors(&allowed_origins))
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(ledger_service.clone()))
            .app_data(web::Data::new(raffle_service.clone()))
            .app_data(web::Data::new(ticket_service.clone()))
            .app_data(web::Data::new(reservation_service.clone()))
            .app_data(web::Data::new(limit_service.clone()))
            .app_data(web::Data::new(instant_win_service.clone()))
            .app_data(web::Data::new(draw_service.clone()))
            .app_data(web::Data::new(claim_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::raffle_config)
                    .configure(handlers::reservation_config)
                    .configure(handlers::ticket_config)
                    .configure(handlers::claim_config)
                    .configure(handlers::credit_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;
    Ok(())
}
