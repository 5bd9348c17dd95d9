//! Shared helpers for intemp's integration tests.

pub mod builders;
pub mod fake_runner;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use intemp::logging::LOG_ENV;
use tracing_subscriber::{fmt, EnvFilter};

/// Upper bound for a single orchestrated run in tests.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Route intemp's logs into the test harness's captured output.
///
/// Takes the same `INTEMP_LOG` directives as the binary and stays quiet
/// (`warn`) without them.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        // Another harness may already own the global subscriber.
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
}

/// Await `f`, failing the test if it outlives [`RUN_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(RUN_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("run did not finish within {RUN_TIMEOUT:?}"),
    }
}
