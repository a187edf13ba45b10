//! Declarative tree merging.
//!
//! A [`Merge`] owns a markup [`Document`](merge_parser::Document) and a data
//! context and resolves `merge-*` directive attributes in five fixed phases:
//! conditional, include, repeat, content and cleanup. Includes may suspend
//! on a [`FetchProvider`]; every other phase is synchronous.
//!
//! A pass does not revisit markup it generated itself. Directives inside
//! included fragments or repeated templates are resolved by the next pass.

pub mod directive;
pub mod error;
pub mod fetch;
pub mod interpolate;
pub mod merge;
pub mod path;
pub mod resolvers;
pub mod value;

#[cfg(test)]
mod tests_resolvers;

pub use directive::Phase;
pub use error::{FetchError, MergeError, MergeResult};
pub use fetch::{FetchProvider, FetchResponse, MarkdownRenderer, StaticFetch};
pub use interpolate::interpolate;
pub use merge::{BranchError, Merge, MergeBuilder, MergeStatus, PassReport, StateSource};
pub use path::resolve;
pub use resolvers::{apply, Applied, Resolution};
pub use value::{Mapping, Value};
