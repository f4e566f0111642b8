use chessroom::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    chessroom::logging::init(&config.logging)?;
    config.log_summary();

    chessroom::api::start_server(config).await
}
