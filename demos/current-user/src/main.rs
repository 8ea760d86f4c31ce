//! Current-user example binary
//!
//! Loads the stored credential, fetches `/api/v1/me` through the
//! authenticated interceptor and prints the profile.
//!
//! ```text
//! TOKENFLOW_BASE_URL=http://localhost:8080 cargo run -p current-user
//! cargo run -p current-user -- logout
//! ```
//!
//! Environment:
//! - `TOKENFLOW_*`: interceptor configuration (see `InterceptorConfig::from_env`)
//! - `CREDENTIALS_FILE`: credential file (default `.tokenflow/credentials.json`)
//! - `METRICS_ADDR`: reported scrape address (default `127.0.0.1:9090`)

use anyhow::Context;
use current_user::{ProfileAction, ProfileReducer, ProfileState, fetch_current_user, log_out};
use std::sync::Arc;
use std::time::Duration;
use tokenflow_auth::{AuthenticatedInterceptor, FileStorage, InterceptorConfig, Navigator, ReqwestExecutor};
use tokenflow_runtime::Store;
use tokenflow_runtime::metrics::MetricsServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "current_user=info,tokenflow_auth=debug,tokenflow_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics_addr = std::env::var("METRICS_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:9090".to_string())
        .parse()
        .context("METRICS_ADDR must be a socket address")?;
    let mut metrics = MetricsServer::new(metrics_addr);
    metrics.start()?;

    let mut config = InterceptorConfig::from_env()?;
    if config.defaults.base_url.is_none() {
        config.defaults = config.defaults.with_base_url(DEFAULT_BASE_URL);
    }

    let credentials_file = std::env::var("CREDENTIALS_FILE")
        .unwrap_or_else(|_| ".tokenflow/credentials.json".to_string());
    let navigator: Arc<dyn Navigator> = Arc::new(|url: &str| {
        println!("Session ended. Sign in again at {url}");
    });

    let interceptor = AuthenticatedInterceptor::from_config(
        config,
        ReqwestExecutor::new(),
        Arc::new(FileStorage::new(&credentials_file)),
        navigator,
    )?;
    tracing::info!(
        file = %credentials_file,
        signed_in = interceptor.credentials().is_present(),
        "Credential loaded"
    );

    let store = Store::new(ProfileState::default(), ProfileReducer, ()).with_middleware(interceptor);

    if std::env::args().nth(1).as_deref() == Some("logout") {
        store.send(log_out()).await?;
        println!("Logged out.");
        return Ok(());
    }

    let outcome = store
        .send_and_wait_for(fetch_current_user(), ProfileAction::is_outcome, Duration::from_secs(30))
        .await;

    match outcome {
        Ok(ProfileAction::Success(profile)) => {
            println!("Signed in as {} ({})", profile.user.email, profile.user.id);
            for policy in &profile.policies {
                println!("  may {} on {}", policy.action, policy.resource);
            }
        },
        Ok(ProfileAction::Error(message)) => println!("Could not load profile: {message}"),
        Ok(_) => {},
        Err(error) => {
            // A rejected credential ends the session without an outcome action.
            tracing::warn!(error = %error, "No profile outcome");
        },
    }

    if let Some(rendered) = metrics.render() {
        tracing::debug!("Metrics:\n{rendered}");
    }

    store.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
