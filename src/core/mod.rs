pub mod aggregate;
pub mod cli;
pub mod cmds;
pub mod logging;
pub mod main_shared;
pub mod modules;
pub mod runner;
pub mod stats;
pub mod types;
