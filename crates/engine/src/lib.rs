//! Expense ledger, monthly aggregates and budget alerts for personal and team
//! scopes.
//!
//! [`Engine`] is the entry point: it validates input, checks the actor's
//! access to the scope, writes the ledger and keeps the aggregate cache in
//! step with it. The building blocks are public too:
//!
//! - [`Ledger`]: aggregation straight from the `expenses` table.
//! - [`AggregateCache`] over a [`CacheStore`] ([`MemoryCache`], [`RedisCache`]).
//! - [`alert::evaluate`]: the pure budget alert rule.
//! - [`resolve_key`]: the cache-key namespace of a [`Scope`].

pub use alert::{Alert, CategoryBreach};
pub use budgets::{Budget, CategoryLimit};
pub use cache::{AggregateCache, CacheError, CacheStore, CacheTtl, MemoryCache, RedisCache};
pub use error::EngineError;
pub use expenses::{Expense, ExpensePatch, ValidPatch};
pub use ledger::{CategoryTotal, Ledger, MemberTotal, MonthlySummary};
pub use money::MoneyCents;
pub use month::MonthKey;
pub use ops::{BudgetStatus, BudgetWrite, Engine, EngineBuilder, ExpenseWrite, NewExpense};
pub use scope::{CacheKind, Scope, resolve_key};
pub use team_members::TeamRole;
pub use teams::Team;

pub mod alert;
mod budget_category_limits;
mod budgets;
pub mod cache;
mod error;
mod expenses;
mod ledger;
mod money;
mod month;
mod ops;
mod scope;
mod team_members;
mod teams;
mod users;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
