use std::{env, time::Duration};

use accrual_tools::AccrualConfig;
use log::*;
use loyalty_common::helpers::env_or_default;
use loyalty_engine::{sqlite_db::db_url, ReconciliationOptions, DEFAULT_BATCH_SIZE, DEFAULT_WORKERS};

use crate::{cli::Arguments, errors::ServerError};

const DEFAULT_RUN_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACCRUAL_INTERVAL: Duration = Duration::from_secs(180);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// The `host:port` the request handlers bind to.
    pub run_address: String,
    pub database_url: String,
    pub max_connections: u32,
    /// Connection details for the external accrual service.
    pub accrual: AccrualConfig,
    /// The time between the start of one reconciliation cycle and the next, when cycles are faster than this.
    pub accrual_interval: Duration,
    /// The number of partitions (and concurrent lookups) per reconciliation cycle.
    pub workers: u32,
    /// The maximum number of orders a partition picks up per cycle.
    pub batch_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            run_address: DEFAULT_RUN_ADDRESS.to_string(),
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            accrual: AccrualConfig::default(),
            accrual_interval: DEFAULT_ACCRUAL_INTERVAL,
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        let run_address = env::var("LPS_RUN_ADDRESS").ok().unwrap_or_else(|| {
            info!("🪛️ LPS_RUN_ADDRESS is not set. Using the default value of {DEFAULT_RUN_ADDRESS}.");
            DEFAULT_RUN_ADDRESS.to_string()
        });
        let database_url = db_url();
        let max_connections = env_or_default("LPS_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let accrual = AccrualConfig::new_from_env_or_default();
        let accrual_interval =
            Duration::from_secs(env_or_default("LPS_ACCRUAL_INTERVAL", DEFAULT_ACCRUAL_INTERVAL.as_secs()));
        let workers = env_or_default("LPS_ACCRUAL_WORKERS", DEFAULT_WORKERS);
        let batch_size = env_or_default("LPS_ACCRUAL_BATCH_SIZE", DEFAULT_BATCH_SIZE);
        Self { run_address, database_url, max_connections, accrual, accrual_interval, workers, batch_size }
    }

    /// Command-line values take precedence over whatever came from the environment.
    pub fn with_overrides(mut self, args: &Arguments) -> Self {
        if let Some(address) = &args.run_address {
            debug!("🪛️ Run address overridden on the command line: {address}");
            self.run_address = address.clone();
        }
        if let Some(url) = &args.database_url {
            debug!("🪛️ Database URL overridden on the command line: {url}");
            self.database_url = url.clone();
        }
        if let Some(url) = &args.accrual_address {
            debug!("🪛️ Accrual service address overridden on the command line: {url}");
            self.accrual.base_url = url.clone();
        }
        self
    }

    pub fn reconciliation_options(&self) -> ReconciliationOptions {
        ReconciliationOptions::new(self.workers, self.batch_size)
    }

    /// Checks the configuration before anything is started. Every problem found is reported, not just the first.
    pub fn validate(&self) -> Result<(), ServerError> {
        let mut problems = Vec::new();
        if let Err(e) = validate_run_address(&self.run_address) {
            problems.push(e);
        }
        if let Err(e) = self.accrual.parse_base_url() {
            problems.push(e.to_string());
        }
        if self.database_url.trim().is_empty() {
            problems.push("The database URL is empty".to_string());
        }
        if self.max_connections == 0 {
            problems.push("The database needs at least one connection".to_string());
        }
        if self.accrual_interval.is_zero() {
            problems.push("The accrual interval must be at least one second".to_string());
        }
        if self.workers == 0 {
            problems.push("At least one accrual worker is required".to_string());
        }
        if self.batch_size == 0 {
            problems.push("The accrual batch size must be at least one".to_string());
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ServerError::ConfigurationError(problems.join(". ")))
        }
    }
}

fn validate_run_address(address: &str) -> Result<(), String> {
    let (host, port) =
        address.rsplit_once(':').ok_or_else(|| format!("The run address '{address}' is not of the form host:port"))?;
    if host.is_empty() {
        return Err(format!("The run address '{address}' has no host"));
    }
    port.parse::<u16>().map_err(|e| format!("The run address '{address}' has an invalid port. {e}"))?;
    Ok(())
}
