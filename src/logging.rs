use std::fmt::Display;

use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter};

/// Crates that log connection chatter at info and debug
const NOISY_DEPENDENCIES: [&str; 4] = ["hyper", "hyper_util", "reqwest", "rustls"];

/// Logs to stderr, so printed queues and identities stay clean on stdout.
pub fn init_logger(verbose: bool) {
    let local = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let dispatch = NOISY_DEPENDENCIES.into_iter().fold(
        fern::Dispatch::new()
            .level(LevelFilter::Warn)
            .level_for("cueline", local)
            .level_for("cueline_client", local)
            .level_for("cueline_core", local),
        |dispatch, name| dispatch.level_for(name, LevelFilter::Error),
    );

    dispatch
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {} {:<7} {}",
                badge(record.level()),
                chrono::Local::now().format("%H:%M:%S%.3f").to_string().bright_black(),
                Source::of(record.target()),
                message
            ))
        })
        .chain(std::io::stderr())
        .apply()
        .expect("logging is initialized")
}

/// Where a log line came from, by crate
#[derive(Debug, PartialEq, Eq)]
enum Source<'a> {
    Cli,
    Client,
    Core,
    Dependency(&'a str),
}

impl<'a> Source<'a> {
    fn of(target: &'a str) -> Self {
        match target.split("::").next().unwrap_or_default() {
            "cueline" => Self::Cli,
            "cueline_client" => Self::Client,
            "cueline_core" => Self::Core,
            other => Self::Dependency(other),
        }
    }
}

impl Display for Source<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Cli => "cli".green(),
            Self::Client => "client".purple(),
            Self::Core => "core".blue(),
            Self::Dependency(name) => name.dimmed(),
        };

        Display::fmt(&label, f)
    }
}

fn badge(level: Level) -> ColoredString {
    match level {
        Level::Error => "error".red().bold(),
        Level::Warn => " warn".yellow().bold(),
        Level::Info => " info".cyan(),
        Level::Debug => "debug".bright_black(),
        Level::Trace => "trace".bright_black().italic(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sources() {
        assert_eq!(Source::of("cueline_client::auth"), Source::Client);
        assert_eq!(Source::of("cueline"), Source::Cli);
        assert_eq!(Source::of("cueline_core::model"), Source::Core);
        assert_eq!(Source::of("reqwest::connect"), Source::Dependency("reqwest"));
    }

    #[test]
    fn test_noisy_dependencies_are_not_local() {
        for name in NOISY_DEPENDENCIES {
            assert!(matches!(Source::of(name), Source::Dependency(_)));
        }
    }
}
