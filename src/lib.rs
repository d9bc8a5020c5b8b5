pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::error::{ErrorKind, LauncherError, LauncherResult};
pub use crate::core::install::{InstallRequest, InstallServices, InstallationOrchestrator};

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the default
/// filter; calling this more than once is harmless.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gamesync_lib=debug")),
        )
        .try_init();
}
