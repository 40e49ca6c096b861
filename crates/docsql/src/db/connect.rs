use super::Db;
use crate::Config;

use docsql_core::{Error, Result, Schema};

use std::sync::Arc;
use url::Url;

impl Db {
    /// Connects to the database named by `config.url`, picking the driver
    /// from the URL scheme.
    pub async fn connect(config: Config, schema: impl Into<Arc<Schema>>) -> Result<Db> {
        let url = config.parsed_url()?;

        match url.scheme() {
            "postgresql" | "postgres" => connect_postgresql(&url, config, schema.into()).await,
            scheme => Err(Error::invalid_connection_url(format!(
                "unsupported database; scheme={scheme}; url={url}"
            ))),
        }
    }
}

#[cfg(feature = "postgresql")]
async fn connect_postgresql(url: &Url, config: Config, schema: Arc<Schema>) -> Result<Db> {
    use docsql_driver_postgresql::{parse_url, PoolConfig, PostgreSQL};

    let mut pool = PoolConfig::new();
    if let Some(max_size) = config.pool_max_size {
        pool = pool.max_size(max_size);
    }

    let driver = PostgreSQL::connect_with_config(parse_url(url.as_str())?, pool).await?;
    Ok(Db::with_config(driver, schema, config))
}

#[cfg(not(feature = "postgresql"))]
async fn connect_postgresql(_url: &Url, _config: Config, _schema: Arc<Schema>) -> Result<Db> {
    Err(Error::invalid_connection_url("`postgresql` feature not enabled"))
}
