use crate::watcher::WatcherError;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Failed to bind {addr}: {error}")]
    Bind {
        addr: SocketAddr,
        error: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(std::io::Error),

    #[error(transparent)]
    Watch(#[from] WatcherError),
}
