use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Log to stderr. `RUST_LOG` wins; otherwise `-v` raises the level from
/// `warn`. `PIECEWISE_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let builder = tracing_subscriber::registry().with(filter);

    match std::env::var("PIECEWISE_LOG_FORMAT").as_deref() {
        Ok("json") => {
            let _ = builder.with(fmt_layer.json().flatten_event(true)).try_init();
        }
        _ => {
            let _ = builder.with(fmt_layer.compact()).try_init();
        }
    }
}
