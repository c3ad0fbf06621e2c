//! Chat backend binary: loads configuration, then runs the HTTP server until
//! Ctrl-C.

use config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    config::load_and_apply("chatcore", None::<&std::path::Path>).ok();

    let app_config = AppConfig::from_env("chatcore")?;
    init_logging(&app_config);

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    serve::run_serve(app_config, shutdown).await
}

fn init_logging(config: &AppConfig) {
    let default_level = if config.is_dev() { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
