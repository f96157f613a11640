//! Paneglass Display Engine
//!
//! Draws a terminal multiplexer's panes onto pixel windows. Character writes
//! are batched into runs, scrolls coalesced into single area copies, the
//! cursor kept as a reversible overlay, and selections exchanged with other
//! clients. Each client window is one `DisplayConnection`:
//!
//! - `core`: cells, styles, geometry and the grid view the engine reads
//! - `native`: the windowing contract and an in-memory implementation
//! - `render`: colours, fonts, run and scroll buffers, cursor overlay
//! - `connection`: the per-client entry points and event pump
//! - `paste`: the paste exchange and selection serving
//! - `guard`: fatal-error propagation across connections on one link
//! - `app`: configuration and logging setup
//! - `script`: headless replay of scripted engine commands

pub mod app;
pub mod connection;
pub mod core;
pub mod error;
pub mod guard;
pub mod host;
pub mod native;
pub mod paste;
pub mod render;
pub mod script;

pub use connection::{DisplayConnection, TtyMode};
pub use error::{DisplayError, Result};
pub use guard::ConnectionRegistry;
