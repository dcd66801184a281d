pub mod cache;
pub mod inventory_store;
pub mod session_store;

pub use cache::{Cache, MemoryCache};
pub use inventory_store::{MemoryInventoryStore, PgInventoryStore, ScreenInventoryStore};
pub use session_store::{MemorySessionStore, PgSessionStore, SessionStore};
