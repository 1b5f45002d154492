use colored::Colorize;
use log::LevelFilter;

const LOG_ENV: &str = "CFDEV_LOG";

/// Route `log` records to stderr with colored level labels.
pub fn init_logging(verbose: bool) -> Result<(), fern::InitError> {
    let level = resolve_level(verbose, std::env::var(LOG_ENV).ok().as_deref());

    fern::Dispatch::new()
        .format(|out, message, record| {
            let label = match record.level() {
                log::Level::Error => "error".red().bold(),
                log::Level::Warn => "warn".yellow().bold(),
                log::Level::Info => "info".green(),
                log::Level::Debug => "debug".blue(),
                log::Level::Trace => "trace".dimmed(),
            };
            out.finish(format_args!("{} {}", label, message))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn resolve_level(verbose: bool, env_level: Option<&str>) -> LevelFilter {
    if verbose {
        return LevelFilter::Debug;
    }
    env_level
        .and_then(|value| value.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}
