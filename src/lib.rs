// Library surface for headless/integration tests and reuse.
// The terminal front end (ui, cli) stays in the binary.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod notify;
pub mod random;
pub mod runtime;
pub mod scramble;
pub mod session;
pub mod stats;
pub mod store;
pub mod util;
