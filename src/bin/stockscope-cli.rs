// =============================================================================
// StockScope — interactive command-line chart
// =============================================================================

use std::io;

use stockscope::chart::RenderTarget;
use stockscope::cli;
use stockscope::config::AppConfig;
use stockscope::logging::{init_logging, LogOutput};
use stockscope::market_data::YahooClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    init_logging(LogOutput::Stderr, "warn")?;

    let config = AppConfig::from_env();
    config.validate()?;
    let provider = YahooClient::new(&config.yahoo_base_url, config.request_timeout())?;
    let today = chrono::Local::now().date_naive();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    cli::run(
        &mut input,
        &mut output,
        &provider,
        &config,
        today,
        RenderTarget::Interactive,
    )
    .await?;
    Ok(())
}
