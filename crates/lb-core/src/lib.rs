//! lifeblocks/crates/lb-core/src/lib.rs
//!
//! The life block content engine: domain models, ports, and the
//! schema / read / write components built on top of them.

pub mod error;
pub mod gateway;
pub mod models;
pub mod schema;
pub mod store;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use gateway::MutationGateway;
pub use models::*;
pub use store::ContentStore;
pub use traits::*;
