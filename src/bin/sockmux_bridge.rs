use anyhow::Result;
use sockmux::TungsteniteTransport;
use sockmux_bridge::bin_common::{
    config_type_from_args, init_tracing_with_level, load_config_from_env, parse_args,
    BinaryRunner, BridgeApp, BridgeConfig,
};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    // Load config first (before logging is initialized)
    let args = parse_args();
    let config_path = load_config_from_env(config_type_from_args(&args));
    let config = BridgeConfig::load(&config_path)?;

    // Initialize logging with configured level
    init_tracing_with_level(&config.log_level);
    config.log();

    let mut app = BridgeApp::new(
        config,
        TungsteniteTransport::new(),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    app.shutdown_handle().spawn_signal_handler();

    app.execute().await
}
