use env_logger::Builder;
use log::LevelFilter;
pub use log::{debug, info, warn};

/// Init the logger from `RUST_LOG`, defaulting to `Info`.
/// Calling it more than once is harmless.
pub fn init() {
    let mut builder = Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter(None, LevelFilter::Info);
    }
    let _ = builder.is_test(cfg!(test)).try_init();
}
