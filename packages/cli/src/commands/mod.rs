pub mod build;
pub mod watch;

pub use build::{build, BuildArgs};
pub use watch::{watch, WatchArgs};
