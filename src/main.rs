use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use log::{error, info};
use tokio::sync::mpsc;

use focus_time_tracker::{
    config::Config,
    db::connection::DbHandler,
    logger::Logger,
    platform,
    scheduler,
    service::ActivityService,
};

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(err) = result {
                            error!("Unable to listen for ctrl-c: {err}");
                            terminate.recv().await;
                        }
                    }
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                error!("Unable to listen for SIGTERM: {err}");
                if let Err(err) = tokio::signal::ctrl_c().await {
                    error!("Unable to listen for ctrl-c: {err}");
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::load().context("invalid configuration")?;
    Logger::initialize(config.log_level, &config.log_path());
    config.log_summary();

    let db_handler = DbHandler::new(config.db_path.clone())
        .with_context(|| format!("unable to open database at {}", config.db_path.display()))?;

    let service = ActivityService::new(Arc::new(db_handler), config.tracking_options());
    let poller = Arc::from(platform::detect(config.record_window_titles));

    let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        wait_for_termination().await;
        let _ = shutdown_tx.send(());
    });

    match scheduler::run(service, poller, config.schedule(), shutdown_rx).await {
        Ok(_) => {
            info!("Shutdown complete.");
            Ok(())
        }
        Err(err) => {
            error!("Activity data could not be saved before exit: {err}");
            std::process::exit(1);
        }
    }
}
