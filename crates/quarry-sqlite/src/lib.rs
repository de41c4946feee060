//! SQLite persistence for Quarry
//!
//! This crate implements Quarry's persistence seams on top of `rusqlite`.
//!
//! ## Features
//!
//! - **SqliteSession**: identity map, pending-write queue and units of work
//! - **Schema**: tables generated from entity metadata, tracked in `schema_migrations`
//! - **WAL Mode**: write-ahead logging for file-backed databases
//! - **Thread Safety**: Arc<Mutex<Connection>> pattern for shared access
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quarry_query::{select_from, EntityStore};
//! use quarry_sqlite::{SqliteConfig, SqliteSession};
//!
//! let session = SqliteSession::open(SqliteConfig::new("./quarry.db"), &[&TEAM_META, &MEMBER_META])?;
//! session.insert(&mut team)?;
//!
//! let member = QMember::member();
//! let found = select_from(&member)
//!     .filter(member.username().eq("member1"))
//!     .fetch_one(&session)?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod schema;
pub mod session;

// Re-exports
pub use config::SqliteConfig;
pub use connection::SqlitePool;
pub use error::{SqliteError, SqliteResult};
pub use session::SqliteSession;
