//! Configuration for the Catalog API

/// Application configuration, read from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| eyre::eyre!("DATABASE_URL must be set"))?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| eyre::eyre!("PORT must be a valid port number"))?;

        Ok(Self {
            database_url,
            redis_url,
            host,
            port,
        })
    }
}
