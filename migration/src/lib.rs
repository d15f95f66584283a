pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_raffles_and_tickets;
mod m20251001_000002_create_reservations;
mod m20251001_000003_create_instant_wins_and_claims;
mod m20251001_000004_create_credit_ledger;
mod m20251015_000005_add_reveal_sequence_index;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_raffles_and_tickets::Migration),
            Box::new(m20251001_000002_create_reservations::Migration),
            Box::new(m20251001_000003_create_instant_wins_and_claims::Migration),
            Box::new(m20251001_000004_create_credit_ledger::Migration),
            Box::new(m20251015_000005_add_reveal_sequence_index::Migration),
        ]
    }
}
