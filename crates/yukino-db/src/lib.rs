//! Database layer for YukinoBot.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and query helpers. Every durable table the bot
//! uses is created through versioned migrations managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: the bot is a single process with human-paced
//!   writers (privileged commands); WAL allows concurrent readers with a
//!   single writer, which matches that access pattern exactly.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management, shared between command handlers and worker tasks.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, ensuring migrations ship with the bot and cannot drift
//!   from the code that depends on them.

mod migrations;
mod pool;

pub use migrations::run_migrations;
pub use pool::{create_pool, DbPool, DbRuntimeSettings};
