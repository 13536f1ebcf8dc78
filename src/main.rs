use std::net::SocketAddr;

use onepick::{
    config::Config, db, ledger::Ledger, logging, notify::Notifier, participants, rooms::RoomBook, AppState,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_tracing();

    let config = Config::from_env()?;

    let db_pool = db::connect(&config.database_url).await?;
    let notifier = Notifier::from_config(&config)?;
    info!(notifier = notifier.name(), "notifier selected");

    if config.allow_reset {
        warn!("POST /api/reset is mounted and unauthenticated; keep this instance off public networks");
    }

    let app_state = AppState {
        ledger: Ledger::new(db_pool.clone(), participants::from_config(&config.participants)),
        rooms: RoomBook::new(db_pool),
        notifier,
    };

    let app = onepick::router(app_state, config.allow_reset);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
