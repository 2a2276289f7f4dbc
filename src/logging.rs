use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directives for the chosen verbosity
///
/// Targets are module paths under the binary's crate name (`krishi::...`).
fn filter_directives(debug: bool, quiet: bool) -> String {
    let level = if debug {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    format!("{crate_name}={level},tower_http={level}", crate_name = env!("CARGO_CRATE_NAME"))
}

/// Initialize logging to stderr, optionally mirrored to an ANSI-free file
pub fn init_logging(
    debug: bool,
    quiet: bool,
    log_file: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::new(filter_directives(debug, quiet));

    let (text_layer, json_layer) = if json {
        let layer = fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr);
        (None, Some(layer))
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_line_number(debug)
            .with_file(debug)
            .with_writer(std::io::stderr);
        (Some(layer), None)
    };

    let file_layer = match log_file {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)?;

            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}
