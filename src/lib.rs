//! Phone status tracker backend.
//!
//! Stores phone-number entries in a single collection and exposes HTTP
//! routes to list, search, create, update, delete and export them.
//!
//! - [`store`]: the collection behind the [`store::PhoneStore`] trait
//! - [`schema`]: table layout and the pre-insert validation pass
//! - [`server`]: Axum router and handlers
//! - [`export`]: CSV rendering

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod schema;
pub mod server;
pub mod store;

pub use config::AppConfig;
pub use error::ApiError;
pub use model::{PhoneRecord, PhoneStatus, RecordId};
pub use server::{create_router, AppState};
pub use store::{MemoryStore, PgStore, PhoneStore, SharedStore, StoreError};
