use genbench::run_main;
use log::{LevelFilter, error};

#[tokio::main]
async fn main() {
    if let Err(e) = run_main().await {
        // Configuration errors happen before the logger is installed
        if log::max_level() == LevelFilter::Off {
            eprintln!("Error: {e}");
        } else {
            error!("{e}");
        }
        std::process::exit(1);
    }
}
