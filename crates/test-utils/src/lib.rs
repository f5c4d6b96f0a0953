pub mod backends;
pub mod builders;

use std::sync::{Arc, Once};

use tracing_subscriber::{EnvFilter, fmt};
use tsforge::config::{ResolvedConfig, UserOptions};
use tsforge::engine::{BackendFactory, BuildSession};
use tsforge::exec::CompileBackend;
use tsforge::fs::RealFileSystem;

pub use backends::{CountingCleaner, RecordingBackend, TranscribingBackend};
pub use builders::TestProject;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Session on the real filesystem where every config compiles with `backend`.
pub fn session_with<B>(user: UserOptions, backend: B) -> BuildSession
where
    B: CompileBackend + Clone + 'static,
{
    let factory: BackendFactory = Arc::new(move |_config: &ResolvedConfig| {
        Arc::new(backend.clone()) as Arc<dyn CompileBackend>
    });
    BuildSession::new(user, Arc::new(RealFileSystem), factory)
}
