//! Services shared by the HTTP handlers.

pub mod session_registry;

pub use session_registry::SessionRegistry;
