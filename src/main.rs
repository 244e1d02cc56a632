use std::process::ExitCode;

use env_logger::{Builder, Env};
use log::{debug, error};

/// RUST_LOG wins; otherwise info for the library, warn for dependencies.
fn init_logger() {
    // Пример: RUST_LOG=StudentQR=debug ./studentqr serve
    Builder::from_env(Env::default().default_filter_or("warn,StudentQR=info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();
}

fn main() -> ExitCode {
    init_logger();
    debug!("studentqr {}", env!("CARGO_PKG_VERSION"));

    match StudentQR::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
