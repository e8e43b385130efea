/// Credit balance store and deduction logic
///
/// This module provides the credit ledger backing the generation gateway.
/// Every user has one row holding an integer balance; a generation costs a
/// fixed [`GENERATION_COST`] credits. The gateway reads the balance, gates
/// the upstream call on it, and deducts after a successful generation.
///
/// The deduction is a relative decrement (`credits = credits - n`), not an
/// absolute write. The balance check and the decrement are separate
/// statements with no transaction spanning them, so two concurrent requests
/// that both observe a sufficient balance will both deduct. The stored value
/// can go negative under that interleaving; callers treat the check as a
/// gate, not a reservation.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE credits (
///     user_id UUID PRIMARY KEY,
///     credits INTEGER NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Rows are created at signup by the account provisioning flow; this
/// service only ever reads and decrements them.
///
/// # Example
///
/// ```no_run
/// use gengate_shared::credits::{CreditStore, PgCreditStore, GENERATION_COST};
/// use gengate_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = PgCreditStore::new(pool);
///
/// let balance = store.fetch(user_id).await?;
/// if balance.can_afford(GENERATION_COST) {
///     // ... call the model ...
///     store.deduct(user_id, GENERATION_COST).await?;
/// }
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Fixed cost of one generation, in credits
pub const GENERATION_COST: i32 = 10;

/// Credit store error
#[derive(Debug, thiserror::Error)]
pub enum CreditError {
    /// No balance row exists for the user
    #[error("No credit balance found for user {0}")]
    NotFound(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One user's credit balance row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditBalance {
    /// Owning user ID (from the hosted auth service)
    pub user_id: Uuid,

    /// Current balance
    pub credits: i32,

    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl CreditBalance {
    /// Whether this balance covers a charge of `cost` credits
    pub fn can_afford(&self, cost: i32) -> bool {
        self.credits >= cost
    }
}

/// Credit store contract
///
/// The gateway talks to the ledger through this trait so tests can swap in
/// an in-memory store and assert on read/write counts.
#[async_trait]
pub trait CreditStore: Send + Sync {
    /// Reads the balance row for a user
    ///
    /// # Errors
    ///
    /// Returns [`CreditError::NotFound`] if no row exists for the user.
    async fn fetch(&self, user_id: Uuid) -> Result<CreditBalance, CreditError>;

    /// Decrements the stored balance by `amount` and returns the stored
    /// value after the write
    ///
    /// The decrement is relative: it applies on top of whatever the stored
    /// value is at write time, which may be lower than the value this
    /// request read earlier.
    ///
    /// # Errors
    ///
    /// Returns [`CreditError::NotFound`] if no row exists for the user.
    async fn deduct(&self, user_id: Uuid, amount: i32) -> Result<i32, CreditError>;

    /// Whether the backing store is reachable
    async fn healthy(&self) -> bool;
}

/// PostgreSQL-backed credit store
///
/// Holds the elevated-credential connection pool; this is the only
/// component that writes balances.
#[derive(Clone)]
pub struct PgCreditStore {
    pool: PgPool,
}

impl PgCreditStore {
    /// Creates a new store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        PgCreditStore { pool }
    }
}

#[async_trait]
impl CreditStore for PgCreditStore {
    async fn fetch(&self, user_id: Uuid) -> Result<CreditBalance, CreditError> {
        let balance = sqlx::query_as::<_, CreditBalance>(
            r#"
            SELECT user_id, credits, updated_at
            FROM credits
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        balance.ok_or(CreditError::NotFound(user_id))
    }

    async fn deduct(&self, user_id: Uuid, amount: i32) -> Result<i32, CreditError> {
        let remaining: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE credits
            SET credits = credits - $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING credits
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        let (remaining,) = remaining.ok_or(CreditError::NotFound(user_id))?;

        tracing::debug!(
            user_id = %user_id,
            amount,
            remaining,
            "Deducted credits"
        );

        Ok(remaining)
    }

    async fn healthy(&self) -> bool {
        crate::db::pool::health_check(&self.pool).await.is_ok()
    }
}
