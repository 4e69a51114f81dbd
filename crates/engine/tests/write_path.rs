use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Alert, CacheKind, CacheStore, Engine, EngineError, ExpensePatch, MemoryCache, MoneyCents,
    MonthKey, MonthlySummary, NewExpense, Scope,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_cache() -> (Engine, DatabaseConnection, Arc<MemoryCache>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let cache = Arc::new(MemoryCache::new());
    let engine = Engine::builder()
        .database(db.clone())
        .cache_store(cache.clone())
        .build()
        .await
        .unwrap();
    engine.create_user("alice", "password").await.unwrap();
    (engine, db, cache)
}

fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn june() -> MonthKey {
    "2024-06".parse().unwrap()
}

fn alice() -> Scope {
    Scope::User("alice".to_string())
}

fn expense(cents: i64, when: &str) -> NewExpense {
    NewExpense {
        title: "Groceries".to_string(),
        amount: MoneyCents::new(cents),
        category: "Food".to_string(),
        occurred_at: at(when),
        notes: None,
    }
}

/// Writes a ledger row behind the engine's back, so only a recomputation can
/// see it.
async fn insert_raw(db: &DatabaseConnection, cents: i64, when: &str) {
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO expenses (id, scope_kind, scope_id, title, amount_minor, category, occurred_at, notes, created_by) \
         VALUES (?, 'user', 'alice', 'raw', ?, 'Food', ?, NULL, 'alice')",
        vec![
            Uuid::new_v4().to_string().into(),
            cents.into(),
            at(when).into(),
        ],
    ))
    .await
    .unwrap();
}

async fn cached<T: serde::de::DeserializeOwned>(cache: &MemoryCache, key: &str) -> Option<T> {
    cache
        .get(key)
        .await
        .unwrap()
        .map(|raw| serde_json::from_str(&raw).unwrap())
}

#[tokio::test]
async fn budget_then_expense_breaches_and_caches_the_alert() {
    let (engine, db, cache) = engine_with_cache().await;

    let written = engine
        .set_budget(&alice(), june(), MoneyCents::new(500), Vec::new(), "alice")
        .await
        .unwrap();
    assert_eq!(written.budget.limit, MoneyCents::new(500));
    assert!(!written.alert.breached);
    assert_eq!(written.alert.total_spent, MoneyCents::ZERO);

    let written = engine
        .create_expense(&alice(), "alice", expense(600, "2024-06-10T12:00:00Z"))
        .await
        .unwrap();
    assert_eq!(written.total_spent, MoneyCents::new(600));
    assert_eq!(
        written.alert,
        Alert {
            month: june(),
            total_spent: MoneyCents::new(600),
            limit: MoneyCents::new(500),
            breached: true,
            category_breaches: Vec::new(),
        }
    );

    let key = alice().cache_key(CacheKind::Alert, june());
    assert_eq!(cached::<Alert>(&cache, &key).await, Some(written.alert.clone()));

    // A row the engine does not know about stays invisible until the next
    // invalidation: the read is served from the cache.
    insert_raw(&db, 1, "2024-06-11T12:00:00Z").await;
    let alert = engine.budget_alert(&alice(), june(), "alice").await.unwrap();
    assert_eq!(alert, written.alert);
}

#[tokio::test]
async fn missing_budget_reads_as_a_zero_limit() {
    let (engine, _db, _cache) = engine_with_cache().await;

    let alert = engine.budget_alert(&alice(), june(), "alice").await.unwrap();
    assert_eq!(alert.limit, MoneyCents::ZERO);
    assert_eq!(alert.total_spent, MoneyCents::ZERO);
    assert!(alert.breached);

    let written = engine
        .create_expense(&alice(), "alice", expense(1, "2024-06-10T12:00:00Z"))
        .await
        .unwrap();
    assert!(written.budget.is_none());
    assert!(written.alert.breached);
}

#[tokio::test]
async fn summary_is_computed_once_until_a_write() {
    let (engine, db, cache) = engine_with_cache().await;
    engine
        .create_expense(&alice(), "alice", expense(100, "2024-06-10T12:00:00Z"))
        .await
        .unwrap();

    let first = engine.monthly_summary(&alice(), june(), "alice").await.unwrap();
    let key = alice().cache_key(CacheKind::Report, june());
    assert_eq!(cached::<MonthlySummary>(&cache, &key).await, Some(first.clone()));

    insert_raw(&db, 5, "2024-06-12T12:00:00Z").await;
    let second = engine.monthly_summary(&alice(), june(), "alice").await.unwrap();
    assert_eq!(first, second);

    // Any write to the month drops the cached summary.
    engine
        .create_expense(&alice(), "alice", expense(10, "2024-06-13T12:00:00Z"))
        .await
        .unwrap();
    assert!(cache.get(&key).await.unwrap().is_none());
    let third = engine.monthly_summary(&alice(), june(), "alice").await.unwrap();
    assert_eq!(third.total_spent, MoneyCents::new(115));
}

#[tokio::test]
async fn writes_to_another_month_leave_the_cache_alone() {
    let (engine, _db, cache) = engine_with_cache().await;
    engine.monthly_summary(&alice(), june(), "alice").await.unwrap();

    engine
        .create_expense(&alice(), "alice", expense(10, "2024-07-01T00:00:00Z"))
        .await
        .unwrap();

    let key = alice().cache_key(CacheKind::Report, june());
    assert!(cache.get(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn moving_an_expense_refreshes_both_months() {
    let (engine, _db, cache) = engine_with_cache().await;
    let july: MonthKey = "2024-07".parse().unwrap();
    let written = engine
        .create_expense(&alice(), "alice", expense(300, "2024-06-30T23:00:00Z"))
        .await
        .unwrap();
    engine.monthly_summary(&alice(), june(), "alice").await.unwrap();

    let moved = engine
        .update_expense(
            &alice(),
            "alice",
            written.expense.id,
            ExpensePatch {
                occurred_at: Some(at("2024-07-02T08:00:00Z")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.alert.month, july);
    assert_eq!(moved.total_spent, MoneyCents::new(300));

    assert!(
        cache
            .get(&alice().cache_key(CacheKind::Report, june()))
            .await
            .unwrap()
            .is_none()
    );
    let june_alert: Alert = cached(&cache, &alice().cache_key(CacheKind::Alert, june()))
        .await
        .unwrap();
    assert_eq!(june_alert.total_spent, MoneyCents::ZERO);
}

#[tokio::test]
async fn delete_recomputes_the_alert() {
    let (engine, _db, _cache) = engine_with_cache().await;
    engine
        .set_budget(&alice(), june(), MoneyCents::new(100), Vec::new(), "alice")
        .await
        .unwrap();
    let written = engine
        .create_expense(&alice(), "alice", expense(150, "2024-06-10T12:00:00Z"))
        .await
        .unwrap();
    assert!(written.alert.breached);

    let alert = engine
        .delete_expense(&alice(), "alice", written.expense.id)
        .await
        .unwrap();
    assert!(!alert.breached);
    assert_eq!(alert.total_spent, MoneyCents::ZERO);

    let again = engine.delete_expense(&alice(), "alice", written.expense.id).await;
    assert!(matches!(again, Err(EngineError::KeyNotFound(_))));
}

#[tokio::test]
async fn cache_outage_never_fails_reads_or_writes() {
    let (engine, _db, cache) = engine_with_cache().await;
    cache.close().await;

    engine
        .set_budget(&alice(), june(), MoneyCents::new(1000), Vec::new(), "alice")
        .await
        .unwrap();
    let written = engine
        .create_expense(&alice(), "alice", expense(250, "2024-06-10T12:00:00Z"))
        .await
        .unwrap();
    assert_eq!(written.total_spent, MoneyCents::new(250));

    let summary = engine.monthly_summary(&alice(), june(), "alice").await.unwrap();
    assert_eq!(summary.total_spent, MoneyCents::new(250));
    let alert = engine.budget_alert(&alice(), june(), "alice").await.unwrap();
    assert!(!alert.breached);
}

#[tokio::test]
async fn budget_is_replaced_not_duplicated() {
    let (engine, _db, _cache) = engine_with_cache().await;
    let first = engine
        .set_budget(&alice(), june(), MoneyCents::new(100), Vec::new(), "alice")
        .await
        .unwrap();
    let second = engine
        .set_budget(&alice(), june(), MoneyCents::new(200), Vec::new(), "alice")
        .await
        .unwrap();
    assert_eq!(first.budget.id, second.budget.id);

    let status = engine.budget(&alice(), june(), "alice").await.unwrap();
    assert_eq!(status.budget.unwrap().limit, MoneyCents::new(200));
    assert_eq!(status.total_spent, MoneyCents::ZERO);
}

#[tokio::test]
async fn validation_errors_come_before_any_write() {
    let (engine, _db, cache) = engine_with_cache().await;

    let negative = engine
        .set_budget(&alice(), june(), MoneyCents::new(-1), Vec::new(), "alice")
        .await;
    assert!(matches!(negative, Err(EngineError::InvalidAmount(_))));

    let blank = engine
        .create_expense(
            &alice(),
            "alice",
            NewExpense {
                category: "  ".to_string(),
                ..expense(10, "2024-06-10T12:00:00Z")
            },
        )
        .await;
    assert!(matches!(blank, Err(EngineError::InvalidInput(_))));

    assert!(cache.is_empty().await);
    assert!(engine.list_expenses(&alice(), "alice", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn other_users_cannot_touch_a_personal_scope() {
    let (engine, _db, _cache) = engine_with_cache().await;
    engine.create_user("mallory", "password").await.unwrap();
    let written = engine
        .create_expense(&alice(), "alice", expense(10, "2024-06-10T12:00:00Z"))
        .await
        .unwrap();

    let forbidden = |r: Result<_, EngineError>| matches!(r, Err(EngineError::Forbidden(_)));
    assert!(forbidden(
        engine.monthly_summary(&alice(), june(), "mallory").await.map(|_| ())
    ));
    assert!(forbidden(
        engine
            .create_expense(&alice(), "mallory", expense(1, "2024-06-10T12:00:00Z"))
            .await
            .map(|_| ())
    ));
    assert!(forbidden(
        engine
            .delete_expense(&alice(), "mallory", written.expense.id)
            .await
            .map(|_| ())
    ));
}

#[tokio::test]
async fn oversized_amounts_are_rejected_before_any_write() {
    let (engine, _db, cache) = engine_with_cache().await;

    let too_big = engine
        .create_expense(
            &alice(),
            "alice",
            expense(MoneyCents::MAX.cents() + 1, "2024-06-10T12:00:00Z"),
        )
        .await;
    assert!(matches!(too_big, Err(EngineError::InvalidAmount(_))));
    let limit = engine
        .set_budget(&alice(), june(), MoneyCents::new(i64::MAX), Vec::new(), "alice")
        .await;
    assert!(matches!(limit, Err(EngineError::InvalidAmount(_))));
    assert!(cache.is_empty().await);
    assert!(engine.list_expenses(&alice(), "alice", None).await.unwrap().is_empty());

    for day in ["2024-06-10T12:00:00Z", "2024-06-11T12:00:00Z"] {
        engine
            .create_expense(&alice(), "alice", expense(MoneyCents::MAX.cents(), day))
            .await
            .unwrap();
    }
    let summary = engine.monthly_summary(&alice(), june(), "alice").await.unwrap();
    assert_eq!(summary.total_spent, MoneyCents::new(2 * MoneyCents::MAX.cents()));
}

#[tokio::test]
async fn write_that_would_overflow_the_month_total_is_not_stored() {
    let (engine, db, _cache) = engine_with_cache().await;
    insert_raw(&db, i64::MAX - 10, "2024-06-11T12:00:00Z").await;

    let overflow = engine
        .create_expense(&alice(), "alice", expense(100, "2024-06-12T12:00:00Z"))
        .await;
    assert!(matches!(overflow, Err(EngineError::InvalidAmount(_))));
    assert_eq!(
        engine.list_expenses(&alice(), "alice", Some(june())).await.unwrap().len(),
        1
    );

    // Other months are unaffected.
    engine
        .create_expense(&alice(), "alice", expense(100, "2024-07-12T12:00:00Z"))
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_patch_is_rejected_before_the_expense_is_looked_up() {
    let (engine, _db, _cache) = engine_with_cache().await;

    let negative = engine
        .update_expense(
            &alice(),
            "alice",
            Uuid::new_v4(),
            ExpensePatch {
                amount: Some(MoneyCents::new(-1)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(negative, Err(EngineError::InvalidAmount(_))));

    let blank = engine
        .update_expense(
            &alice(),
            "mallory",
            Uuid::new_v4(),
            ExpensePatch {
                category: Some(" ".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(blank, Err(EngineError::InvalidInput(_))));
}

#[tokio::test]
async fn concurrent_first_budgets_for_a_month_converge_on_one_row() {
    let (engine, _db, _cache) = engine_with_cache().await;

    let (scope_a, scope_b) = (alice(), alice());
    let (first, second) = tokio::join!(
        engine.set_budget(&scope_a, june(), MoneyCents::new(100), Vec::new(), "alice"),
        engine.set_budget(&scope_b, june(), MoneyCents::new(200), Vec::new(), "alice"),
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first.budget.id, second.budget.id);

    let status = engine.budget(&alice(), june(), "alice").await.unwrap();
    let stored = status.budget.unwrap();
    assert_eq!(stored.id, first.budget.id);
    assert!([MoneyCents::new(100), MoneyCents::new(200)].contains(&stored.limit));
}
