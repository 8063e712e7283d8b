pub mod database;
pub mod in_memory;
pub mod traits;

pub use database::DatabaseStore;
pub use in_memory::InMemoryStore;
pub use traits::{ProfileStore, UpsertOutcome};
