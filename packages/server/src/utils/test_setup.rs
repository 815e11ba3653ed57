use dotenvy::dotenv;
use std::sync::Once;

static INIT: Once = Once::new();

/// Loads `.env` and routes `tracing` output through the test harness so it
/// only shows up for failing tests.
pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "werewolf_server=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}
