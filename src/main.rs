use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use veritill::config::Config;
use veritill::db::{create_pool, init_audit_db, init_db, queries, AppState};
use veritill::events::EventSink;
use veritill::handlers;
use veritill::models::{CreateSimulatedReceipt, SimulatedItem};

#[derive(Parser, Debug)]
#[command(name = "veritill")]
#[command(about = "Receipt verification service for point-of-sale payments")]
struct Cli {
    /// Seed the database with a simulated demo receipt and share token
    #[arg(long)]
    seed: bool,

    /// Delete databases on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

fn seed_demo_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seed");

    let input = CreateSimulatedReceipt {
        amount: 42.49,
        currency: "usd".to_string(),
        items: vec![
            SimulatedItem {
                name: "Flat white".to_string(),
                unit_price: 4.50,
                quantity: 2,
            },
            SimulatedItem {
                name: "Lunch special".to_string(),
                unit_price: 33.49,
                quantity: 1,
            },
        ],
        demo_refunded: false,
        demo_disputed: false,
        demo_expired_qr: false,
    };

    let (receipt, items) = queries::create_simulated_receipt(&conn, &input)
        .expect("Failed to create demo receipt");

    let (share, _) = queries::create_or_get_share_token(&conn, &receipt.id, &Default::default())
        .expect("Failed to create demo share token");

    tracing::info!("Seeded demo receipt {} with {} items", receipt.id, items.len());
    tracing::info!("Demo verification link: {}/verify/{}", state.base_url, share.token);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "veritill=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    // Create database connection pools
    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    let audit_pool =
        create_pool(&config.audit_database_path).expect("Failed to create audit database pool");

    // Initialize database schemas
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }
    {
        let conn = audit_pool.get().expect("Failed to get audit connection");
        init_audit_db(&conn).expect("Failed to initialize audit database");
    }

    let state = AppState {
        db: db_pool,
        events: EventSink::new(audit_pool),
        base_url: config.base_url.clone(),
        processor_api_url: config.processor_api_url.clone(),
    };

    // Purge event log past the configured retention on startup
    {
        let conn = state.db.get().expect("Failed to get connection for purge");
        let retention_days = queries::get_retention_days(&conn)
            .expect("Failed to read retention setting");
        match state.events.purge_older_than(retention_days) {
            Ok(count) if count > 0 => {
                tracing::info!("Purged {} event log entries older than {} days", count, retention_days);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to purge old event log entries: {}", e);
            }
        }
    }

    // Seed demo data if --seed flag is passed (only in dev mode)
    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set VERITILL_ENV=dev)");
        } else {
            seed_demo_data(&state);
        }
    }

    // Build the application router
    let app = Router::new()
        // Public verification endpoints (no auth)
        .merge(handlers::public::router())
        // Payment processor webhooks
        .merge(handlers::webhooks::router())
        // Console endpoints (fronted by deployment auth)
        .merge(handlers::admin::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();
    let audit_path = config.audit_database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: databases will be deleted on exit");
    }

    tracing::info!("Veritill server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    // Cleanup on exit if ephemeral mode
    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral databases...");
        for path in [&db_path, &audit_path] {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("Failed to remove {}: {}", path, e);
            } else {
                tracing::info!("Removed {}", path);
            }
            let _ = std::fs::remove_file(format!("{}-wal", path));
            let _ = std::fs::remove_file(format!("{}-shm", path));
        }
        tracing::info!("Ephemeral cleanup complete");
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
