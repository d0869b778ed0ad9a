pub mod diesel_pool;
pub mod memory_store;
pub mod postgres_store;
pub mod store;

pub use diesel_pool::{
    check_diesel_health, create_diesel_pool, mask_connection_string, DieselConnection,
    DieselDatabaseConfig, DieselPool, MIGRATIONS,
};
pub use memory_store::MemoryStore;
pub use postgres_store::PgStore;
pub use store::{Found, JoinOutcome, MarketplaceStore, SeatClaim, StoreError};
