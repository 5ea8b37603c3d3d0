use clap::Parser;

/// Keeps customer loyalty balances in step with the external accrual service.
#[derive(Parser, Debug, Default)]
#[command(version, author)]
pub struct Arguments {
    /// The address the request handlers bind to, as host:port. Overrides LPS_RUN_ADDRESS.
    #[arg(short = 'a', long = "address")]
    pub run_address: Option<String>,
    /// The ledger database URL. Overrides LPS_DATABASE_URL.
    #[arg(short = 'd', long = "database")]
    pub database_url: Option<String>,
    /// The base URL of the accrual service. Overrides LPS_ACCRUAL_SYSTEM_ADDRESS.
    #[arg(short = 'r', long = "accrual")]
    pub accrual_address: Option<String>,
    /// Print the configuration environment variables and exit.
    #[arg(long = "show-env")]
    pub show_env: bool,
}

const DISPLAY_ENVS: [&str; 12] = [
    "RUST_LOG",
    "LPS_RUN_ADDRESS",
    "LPS_DATABASE_URL",
    "LPS_DB_MAX_CONNECTIONS",
    "LPS_ACCRUAL_SYSTEM_ADDRESS",
    "LPS_ACCRUAL_TIMEOUT",
    "LPS_ACCRUAL_RETRY_ATTEMPTS",
    "LPS_ACCRUAL_RETRY_MIN_DELAY_MS",
    "LPS_ACCRUAL_RETRY_MAX_DELAY_MS",
    "LPS_ACCRUAL_INTERVAL",
    "LPS_ACCRUAL_WORKERS",
    "LPS_ACCRUAL_BATCH_SIZE",
];

pub fn display_envs() {
    println!("Environment variables:");
    for key in DISPLAY_ENVS {
        let value = std::env::var(key).unwrap_or_else(|_| "<not set>".to_string());
        println!("{key}: {value}");
    }
}
