//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, seed-categories) and shared utilities (open_db)
//! - `serve` - Web server command
//! - `users` - User management commands (list, add)

pub mod core;
pub mod serve;
pub mod users;

// Re-export command functions for main.rs
pub use core::*;
pub use serve::*;
pub use users::*;
