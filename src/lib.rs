pub mod core;

// Re-export key items for easy importing in this crate
pub use core::types;

// Re-export key items for easy importing in other crates
pub use core::aggregate::{RunReader, fold_runs, summarize_experiment};
pub use core::main_shared::run_main;
pub use core::stats::{bernoulli_sample, compare};
