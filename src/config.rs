use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "financas",
    about = "Personal finance tracker HTTP backend (incomes, expenses, fixed amounts, investments)"
)]
pub struct Config {
    #[arg(long, env = "FINANCAS_LISTEN_ADDR", default_value = "127.0.0.1:5000")]
    pub listen_addr: SocketAddr,
    #[arg(
        long,
        env = "FINANCAS_DATA_FILE",
        default_value = "data/dados.json",
        help = "JSON document holding every record; created on first access"
    )]
    pub data_file: PathBuf,
    #[arg(
        long = "cors-allow-origins",
        env = "FINANCAS_CORS_ALLOW_ORIGINS",
        default_value = "*",
        value_delimiter = ',',
        help = "Comma separated list of allowed origins, or * for any"
    )]
    pub cors_allow: Vec<String>,
    #[arg(
        long,
        env = "FINANCAS_TEMPLATES_DIR",
        default_value = "templates",
        help = "Directory holding index.html, ganhos.html, gastos.html, investimentos.html and saldo.html"
    )]
    pub templates_dir: PathBuf,
    #[arg(long, env = "FINANCAS_STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,
}

impl Config {
    /// Command line first, then environment (including a `.env` file), then defaults.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_allow.iter().any(|origin| origin.trim() == "*")
    }
}
