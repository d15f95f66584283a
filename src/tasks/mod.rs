//! Background sweeps.
//!
//! Every sweep is idempotent in its service, so the cadence only bounds how long stale
//! reservations and claims linger. Call `spawn_all` once during startup.

use crate::config::SchedulerConfig;
use crate::services::{ClaimService, PurchaseLimitService, RaffleService, ReservationService};
use std::time::Duration;

/// Spawn all background tasks. Detached via `tokio::spawn`; does not block.
pub fn spawn_all(
    config: SchedulerConfig,
    reservation_service: ReservationService,
    claim_service: ClaimService,
    raffle_service: RaffleService,
    limit_service: PurchaseLimitService,
) {
    // 释放过期预留
    {
        let svc = reservation_service;
        let every = Duration::from_secs(config.reservation_sweep_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.expire_stale_reservations().await {
                    Ok(n) if n > 0 => log::info!("Expired reservations released: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to expire reservations: {e:?}"),
                }
                tokio::time::sleep(every).await;
            }
        });
    }

    // 过期兑奖单 (仅 PENDING)
    {
        let svc = claim_service;
        let every = Duration::from_secs(config.claim_sweep_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.expire_stale_claims().await {
                    Ok(n) if n > 0 => log::info!("Expired prize claims: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to expire prize claims: {e:?}"),
                }
                tokio::time::sleep(every).await;
            }
        });
    }

    // 关闭已过结束时间的活动
    {
        let svc = raffle_service;
        let every = Duration::from_secs(config.raffle_close_sweep_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.close_ended_raffles().await {
                    Ok(n) if n > 0 => log::info!("Raffles closed after end time: {n}"),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to close ended raffles: {e:?}"),
                }
                tokio::time::sleep(every).await;
            }
        });
    }

    // 购票计数校正 (每天)
    {
        let svc = limit_service;
        let every = Duration::from_secs(config.purchase_count_repair_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(every).await;
                match svc.repair_purchase_counts(None).await {
                    Ok(r) if r.corrected > 0 => log::warn!(
                        "Purchase counters repaired: {} of {} rows corrected",
                        r.corrected,
                        r.checked
                    ),
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to repair purchase counters: {e:?}"),
                }
            }
        });
    }
}
