//! Development server for merge sites.
//!
//! Pages are merged on every request, other files are served as they are,
//! and a watcher tells open pages to reload when the site changes.

mod error;
pub mod live_reload;
mod server;
mod watcher;

pub use error::{ServerError, ServerResult};
pub use server::{DevServer, ServerConfig};
pub use watcher::{FileWatcher, WatcherError, WatcherResult};
