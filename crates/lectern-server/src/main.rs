use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use lectern_accounts::{AccountStore, MemoryAccountStore};
use lectern_core::plan::PlanName;
use lectern_pg::PgAccountStore;
use lectern_server::state::AppState;

/// `lectern health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$LECTERN_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("LECTERN_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Health-check subcommand — handled before tokio does any real work so
    // the binary stays fast when used as a Docker HEALTHCHECK probe.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Initialise structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lectern=info".parse()?),
        )
        .json()
        .init();

    let cfg = lectern_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let accounts: Arc<dyn AccountStore> = match &cfg.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            info!("Account store: PostgreSQL");
            Arc::new(PgAccountStore::new(pool))
        }
        None => {
            // No database configured — in-memory store with a seeded demo
            // account so the service is usable out of the box.
            let store = MemoryAccountStore::new();
            store.seed_account(&cfg.demo_account_id, PlanName::Free, None).await;
            info!(
                account = %cfg.demo_account_id,
                "Account store: in-memory (LECTERN_DATABASE_URL not set) — demo free account ready"
            );
            Arc::new(store)
        }
    };

    let state = Arc::new(AppState::new(accounts, cfg.clone()));

    let addr = format!("0.0.0.0:{}", cfg.port);
    let app = lectern_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, "Lectern usage service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
