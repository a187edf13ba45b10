pub mod filesystem;
pub mod reporter;

pub use filesystem::*;
pub use reporter::*;
