use console::style;
use log::{Level, LevelFilter};

use crate::types::config::{colors_enabled, config};

/// Install the global logger. Info lines are printed bare to stdout so that
/// table output reads like plain text; warnings and errors go to stderr.
pub fn init_logging() {
    let level = config()
        .log()
        .level()
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);
    let colored = colors_enabled();

    let result = fern::Dispatch::new()
        .level(level)
        .format(move |out, message, record| {
            if record.level() == Level::Info {
                return out.finish(format_args!("{message}"));
            }
            let tag = format!("[{}]", record.level());
            let tag = match record.level() {
                Level::Error => style(tag).red().bold(),
                Level::Warn => style(tag).yellow(),
                Level::Debug => style(tag).cyan(),
                _ => style(tag).dim(),
            }
            .force_styling(colored);
            out.finish(format_args!("{tag} {message}"))
        })
        .chain(
            fern::Dispatch::new()
                .filter(|meta| meta.level() > Level::Warn)
                .chain(std::io::stdout()),
        )
        .chain(
            fern::Dispatch::new()
                .level(LevelFilter::Warn)
                .chain(std::io::stderr()),
        )
        .apply();

    // A logger may already be installed when running inside tests
    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {e}");
    }
}
