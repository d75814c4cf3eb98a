use crate::config::get_config;
use crate::error::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;

pub async fn create_pool() -> Result<SqlitePool> {
    let config = get_config();
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(crate::error::Error::Database)?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect_with(options)
        .await?;
    Ok(pool)
}
