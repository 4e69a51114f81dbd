use std::{future::Future, pin::Pin, sync::Arc};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::{
    ResultEngine,
    cache::{AggregateCache, CacheStore, CacheTtl, MemoryCache},
    ledger::Ledger,
};

mod access;
mod budgets;
mod expenses;
mod reports;
mod teams;

pub use budgets::{BudgetStatus, BudgetWrite};
pub use expenses::{ExpenseWrite, NewExpense};

type TxFuture<'a, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>;

/// Entry point for every expense, budget and report operation.
///
/// The engine owns the database connection, the ledger query engine built
/// on it and the aggregate cache. Writes run the invalidate-then-recompute
/// protocol before returning, so the next read of the same month never sees
/// an aggregate computed before the write.
#[derive(Clone)]
pub struct Engine {
    database: DatabaseConnection,
    ledger: Ledger,
    cache: AggregateCache,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Read-only aggregation over the expense ledger. Callers are expected to
    /// have authorized the scope already.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The aggregate cache, for callers that memoize their own values.
    pub fn cache(&self) -> &AggregateCache {
        &self.cache
    }

    /// Run `f` inside a DB transaction, committing on success and rolling
    /// back on error.
    async fn with_tx<T, F>(&self, f: F) -> ResultEngine<T>
    where
        T: Send,
        F: for<'a> FnOnce(&'a Engine, &'a DatabaseTransaction) -> TxFuture<'a, T>,
    {
        let db_tx = self.database.begin().await?;
        match f(self, &db_tx).await {
            Ok(value) => {
                db_tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = db_tx.rollback().await {
                    tracing::error!("rollback failed: {rollback}");
                }
                Err(err)
            }
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    cache_store: Option<Arc<dyn CacheStore>>,
    ttl: CacheTtl,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Pass the cache backend. Defaults to an in-process [`MemoryCache`].
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> EngineBuilder {
        self.cache_store = Some(store);
        self
    }

    /// Override the aggregate TTLs.
    pub fn ttl(mut self, ttl: CacheTtl) -> EngineBuilder {
        self.ttl = ttl;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let store = self
            .cache_store
            .unwrap_or_else(|| Arc::new(MemoryCache::new()));
        Ok(Engine {
            ledger: Ledger::new(self.database.clone()),
            cache: AggregateCache::new(store, self.ttl),
            database: self.database,
        })
    }
}
