use financas::config::Config;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    let config = Config::load();
    init_tracing();

    if let Err(e) = financas::api::run_http_server(config).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
