pub mod app_config;
pub mod database;
pub mod booking_repo;
pub mod memory;

pub use app_config::Config;
pub use database::DbClient;
pub use booking_repo::PgDocumentStore;
pub use memory::MemoryStore;
