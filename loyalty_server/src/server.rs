use accrual_tools::AccrualApi;
use log::*;
use loyalty_engine::{AccrualFlowApi, LedgerStore, SqliteDatabase};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    accrual_worker::run_accrual_worker,
    config::ServerConfig,
    errors::ServerError,
    integrations::accrual::AccrualServiceSource,
};

/// Connects to the ledger and the accrual service, then reconciles orders until Ctrl-C is received or a cycle fails
/// fatally.
///
/// The request handlers that register users and accept order submissions are hosted separately and only share the
/// ledger database with this process.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let client = AccrualApi::new(config.accrual.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Using the accrual service at {}", config.accrual.base_url);
    let source = AccrualServiceSource::new(client);
    let mut api = AccrualFlowApi::new(db, source, config.reconciliation_options());

    let cancel = CancellationToken::new();
    let signal_listener = listen_for_shutdown(cancel.clone());
    let result = run_accrual_worker(&api, config.accrual_interval, cancel).await;
    signal_listener.abort();

    let closed = api.db_mut().close().await;
    result?;
    closed?;
    Ok(())
}

fn listen_for_shutdown(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("🚀️ Shutdown requested. Waiting for the current reconciliation cycle to finish");
                cancel.cancel();
            },
            Err(e) => error!("🚀️ Cannot listen for the shutdown signal. {e}"),
        }
    })
}
