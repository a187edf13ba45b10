mod compiler;
mod error;
mod fetch;
mod markdown;


pub use compiler::{is_html, BuildSummary, CompileOptions, CompiledFile, Compiler};
pub use error::{CompileError, CompileResult};
pub use fetch::CompilerFetch;
pub use markdown::CommonMarkRenderer;
