/// Database layer for gengate
///
/// This module provides PostgreSQL connection pooling for the credit store.
///
/// # Modules
///
/// - `pool`: connection pool management with a startup health check
///
/// # Example
///
/// ```no_run
/// use gengate_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     Ok(())
/// }
/// ```

pub mod pool;
