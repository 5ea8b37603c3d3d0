use clap::Parser;
use dotenvy::dotenv;
use log::*;
use loyalty_server::{
    cli::{display_envs, Arguments},
    config::ServerConfig,
    server::run_server,
};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    if args.show_env {
        display_envs();
        return;
    }
    let config = ServerConfig::from_env_or_default().with_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    info!("🚀️ Starting loyalty server. Request handlers bind to {}", config.run_address);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
    }
}
