//! Infrastructure layer: collaborator implementations and DI container
//!
//! Storage, publishing and wiring of the application services.

pub mod di;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use di::ServiceContainer;
pub use error::{InfraError, InfraResult};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
