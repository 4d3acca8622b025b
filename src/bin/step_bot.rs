//! Step-Martingale Trading Bot Binary
//!
//! Polls the last traded price for one symbol and runs the step-martingale
//! strategy against it until interrupted.
//!
//! ## Setup
//!
//! 1. Create a `.env` file in the project root:
//!    ```
//!    APP_API__API_KEY=your-key
//!    APP_API__API_SECRET=your-secret
//!    ```
//!
//! 2. Write a `config.toml`:
//!    ```toml
//!    [strategy]
//!    symbol = "ETHUSDT"
//!    mode = "long"
//!    base_price = 1500.0
//!    threshold_pct = 0.02
//!    poll_interval_secs = 5
//!    test_mode = true
//!    ```
//!
//! 3. Run the bot:
//!    ```bash
//!    cargo run --bin step_bot -- --config config.toml
//!    ```

use std::env;
use std::sync::Arc;

use log::{error, info, warn};

use step_martingale_bot::config::Settings;
use step_martingale_bot::engine::{CancelToken, Engine, JsonLogSink, TradingLoop};
use step_martingale_bot::market::BybitGateway;

#[tokio::main]
async fn main() {
    // Load .env file before anything reads the environment
    match dotenvy::dotenv() {
        Ok(path) => println!("Loaded environment from: {}", path.display()),
        Err(_) => println!("No .env file found, using system environment variables"),
    }

    // Parse arguments
    let args: Vec<String> = env::args().collect();
    let config_path = if args.len() > 2 && args[1] == "--config" {
        args[2].clone()
    } else {
        "config.toml".to_string()
    };

    let settings = match Settings::new(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load config '{}': {}", config_path, e);
            return;
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log.level.clone()),
    )
    .init();

    if let Err(e) = settings.strategy.validate() {
        error!("Invalid strategy configuration: {}", e);
        return;
    }

    if settings.api.api_key.is_empty() || settings.api.api_secret.is_empty() {
        error!(
            "API credentials missing! Set APP_API__API_KEY and APP_API__API_SECRET \
             in the environment or a .env file"
        );
        return;
    }

    let strategy = settings.strategy.clone();
    info!(
        "Starting step bot: {} {:?}, base price {}, threshold {}%, polling every {}s",
        strategy.symbol,
        strategy.mode,
        strategy.base_price,
        strategy.threshold_pct * 100.0,
        strategy.poll_interval_secs
    );
    if strategy.test_mode {
        info!("Using TESTNET");
    } else {
        warn!("Using MAINNET - real funds at risk!");
    }

    let gateway = match BybitGateway::new(&settings.api, strategy.test_mode) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!("Failed to create gateway: {}", e);
            return;
        }
    };

    let sink = Arc::new(JsonLogSink);
    let engine = Engine::new(strategy, sink.clone());
    let mut bot = TradingLoop::new(Arc::new(gateway), engine, sink);

    let cancel = CancelToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current tick");
            ctrl_c_cancel.cancel();
        }
    });

    bot.run(&cancel).await;
    info!("Bot stopped");
}
