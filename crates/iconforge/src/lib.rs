pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

/// Install logging for the given `-v`/`-q` balance.
pub fn init(verbosity: i8) {
    infra::logging::init(verbosity);
}
