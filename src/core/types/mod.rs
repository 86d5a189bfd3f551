pub mod config;
mod error;
mod run;
mod stats;
mod summary;

pub use error::*;
pub use run::*;
pub use stats::*;
pub use summary::*;
