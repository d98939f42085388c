use std::{path::PathBuf, time::Duration};

use crate::error::Result;
pub use clap::Parser;
use shelf_app::{
    favorites::{DEFAULT_MAX_FAVORITES, DEFAULT_MAX_RECOMMENDATIONS, FavoritesPolicy},
    state::AppConfig,
};

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about = "Book catalog server")]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "SHELF_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "SHELF_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "SHELF_DATABASE_URL",
        help = "Database URL e.g. sqlite://file.db, default is sqlite://[data-dir]/shelf.db, where data-dir is set by --data-dir"
    )]
    database_url: Option<String>,

    #[arg(
        long,
        env = "SHELF_DATA_DIR",
        help = "Data directory (database, token secret), default is system default like ~/.local/share/shelf",
        default_value_t = default_data_dir()
    )]
    data_dir: String,

    #[arg(
        long,
        env = "SHELF_SECRET",
        hide_env_values = true,
        help = "Secret for signing tokens, if not set random secret is generated and kept in data directory"
    )]
    pub secret: Option<String>,

    #[arg(
        long,
        env = "SHELF_TOKEN_VALIDITY",
        default_value = "1 day",
        help = "Token validity in human friendly format (e.g. 1d, 1h, 1m, 1s - or combined)",
        value_parser = humantime::parse_duration
    )]
    pub token_validity: Duration,

    #[arg(
        long,
        env = "SHELF_MAX_FAVORITES",
        default_value_t = DEFAULT_MAX_FAVORITES,
        help = "Maximum number of favorite books per user"
    )]
    pub max_favorites: usize,

    #[arg(
        long,
        env = "SHELF_MAX_RECOMMENDATIONS",
        default_value_t = DEFAULT_MAX_RECOMMENDATIONS,
        help = "Maximum number of recommended books"
    )]
    pub max_recommendations: usize,

    #[arg(
        long,
        env = "SHELF_DEFAULT_PAGE_SIZE",
        default_value = "100",
        help = "Page size when only page is requested"
    )]
    pub default_page_size: u32,

    #[arg(long, env = "SHELF_NO_CORS", help = "Disable CORS")]
    pub no_cors: bool,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("shelf"))
        .unwrap_or_else(|| PathBuf::from("shelf-data"))
        .to_string_lossy()
        .to_string()
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    /// Configuration for tests, data are kept in `data_dir`
    pub fn for_data_dir(data_dir: impl Into<PathBuf>, port: u16) -> Self {
        let data_dir: PathBuf = data_dir.into();
        ServerConfig {
            port,
            listen_address: "127.0.0.1".to_string(),
            database_url: None,
            data_dir: data_dir.to_string_lossy().to_string(),
            secret: None,
            token_validity: Duration::from_secs(24 * 3600),
            max_favorites: DEFAULT_MAX_FAVORITES,
            max_recommendations: DEFAULT_MAX_RECOMMENDATIONS,
            default_page_size: 100,
            no_cors: false,
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}/shelf.db", self.data_dir))
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            favorites: FavoritesPolicy {
                max_favorites: self.max_favorites,
                max_recommendations: self.max_recommendations,
            },
            default_page_size: self.default_page_size,
        }
    }
}
