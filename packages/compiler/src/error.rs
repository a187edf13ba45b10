use merge_engine::MergeError;
use merge_parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that can occur while compiling a file or directory
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Failed to read {}: {error}", path.display())]
    Read { path: PathBuf, error: std::io::Error },

    #[error("Failed to write {}: {error}", path.display())]
    Write { path: PathBuf, error: std::io::Error },

    #[error("Failed to parse {}: {error}", path.display())]
    Parse {
        path: PathBuf,
        error: ParseError,
        markup: String,
    },

    #[error("Failed to merge {}: {error}", path.display())]
    Merge { path: PathBuf, error: MergeError },

    #[error("Invalid state file {}: {message}", path.display())]
    State { path: PathBuf, message: String },

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

impl CompileError {
    /// Message with source context where the error points into markup
    pub fn pretty(&self) -> String {
        match self {
            CompileError::Parse {
                path,
                error,
                markup,
            } => {
                let file_name = path.display().to_string();
                merge_parser::error::pretty::format_error(error, &file_name, markup)
            }
            other => other.to_string(),
        }
    }
}
