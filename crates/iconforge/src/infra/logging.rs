//! Tracing subscriber setup.

use tracing::Level;

/// Map `-v`/`-q` counts onto a max level. `0` is `INFO`.
pub fn level_for(verbosity: i8) -> Level {
    match verbosity {
        i8::MIN..=-2 => Level::ERROR,
        -1 => Level::WARN,
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global fmt subscriber. Later calls are ignored.
pub fn init(verbosity: i8) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
