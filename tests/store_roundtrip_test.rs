//! Integration tests for the record runtime and the query executor
//!
//! These run against the PostgreSQL database named by `DATABASE_URL` and are
//! skipped when it is not set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::postgres::PgPoolOptions;
use store_object::model;
use weblog::migration::auto_migrate;
use weblog::prelude::*;

fn stamp() -> SqlValue {
    SqlValue::Float(1_234.5)
}

model! {
    pub struct Gadget in "it_gadgets" {
        id: String => string.primary_key().ddl("varchar(50)"),
        label: String => string,
        active: bool => boolean,
        stock: i64 => integer.default_value(5),
        weight: f64 => float.default_with(stamp),
        notes: String => text.column("gadget_notes"),
    }
}

model! {
    pub struct Counter in "it_counters" {
        id: String => string.primary_key().ddl("varchar(50)"),
        qty: i64 => integer,
    }
}

model! {
    pub struct Reading in "it_readings" {
        id: String => string.primary_key().ddl("varchar(50)"),
        flag: bool => boolean.no_default(),
        qty: i64 => integer.no_default(),
        ratio: f64 => float.no_default(),
    }
}

async fn executor(max_connections: u32) -> Option<QueryExecutor> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&url)
        .await
        .expect("failed to connect to DATABASE_URL");
    Some(QueryExecutor::from_pool(pool))
}

#[tokio::test]
async fn test_save_then_find_round_trip() {
    let Some(executor) = executor(4).await else {
        return;
    };
    auto_migrate::<Gadget>(&executor, true).await.unwrap();
    let store = ModelStore::<Gadget>::new(executor.clone());

    let mut gadget = Gadget::new();
    gadget.set("id", "g1").unwrap();
    gadget.set("label", "lamp").unwrap();
    gadget.set("stock", 0i64).unwrap();
    gadget.set("notes", "fragile").unwrap();
    assert_eq!(store.save(&mut gadget).await.unwrap(), 1);

    let found = store.find("g1").await.unwrap().expect("saved record");
    assert_eq!(found.label().map(String::as_str), Some("lamp"));
    assert_eq!(found.notes().map(String::as_str), Some("fragile"));
    // present zero kept, absent fields take their defaults
    assert_eq!(found.stock(), Some(&0));
    assert_eq!(found.active(), Some(&false));
    assert_eq!(found.weight(), Some(&1_234.5));

    assert!(store.find("missing").await.unwrap().is_none());
    executor.close().await;
}

#[tokio::test]
async fn test_update_remove_and_listing() {
    let Some(executor) = executor(4).await else {
        return;
    };
    auto_migrate::<Counter>(&executor, true).await.unwrap();
    let store = ModelStore::<Counter>::new(executor.clone());

    for (id, qty) in [("a", 1i64), ("b", 2), ("c", 3)] {
        let mut counter = Counter::new();
        counter.set("id", id).unwrap();
        counter.set("qty", qty).unwrap();
        store.save(&mut counter).await.unwrap();
    }

    let number = store
        .find_number("count(\"id\")", Some("\"qty\">?"), vec![SqlValue::Int(1)])
        .await
        .unwrap();
    assert_eq!(number, Some(SqlValue::Int(2)));

    let page = store
        .find_all(
            FindQuery::new()
                .order_by("\"qty\" DESC")
                .limit(Limit::Window { offset: 1, count: 1 }),
        )
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id().map(String::as_str), Some("b"));

    let mut b = page.into_iter().next().unwrap();
    b.set("qty", 20i64).unwrap();
    assert_eq!(store.update(&b).await.unwrap(), 1);
    assert_eq!(store.find("b").await.unwrap().unwrap().qty(), Some(&20));

    assert_eq!(store.remove(&b).await.unwrap(), 1);
    // soft check: removing again affects nothing but is not an error
    assert_eq!(store.remove(&b).await.unwrap(), 0);
    executor.close().await;
}

#[tokio::test]
async fn test_unset_non_text_fields_save_and_update_as_null() {
    let Some(executor) = executor(2).await else {
        return;
    };
    auto_migrate::<Reading>(&executor, true).await.unwrap();
    let store = ModelStore::<Reading>::new(executor.clone());

    let mut reading = Reading::new();
    reading.set("id", "r1").unwrap();
    assert_eq!(store.save(&mut reading).await.unwrap(), 1);

    let mut loaded = store.find("r1").await.unwrap().expect("saved record");
    assert_eq!(loaded.flag(), None);
    assert_eq!(loaded.qty(), None);
    assert_eq!(loaded.ratio(), None);

    // flag and ratio are still NULL and get written back as NULL
    loaded.set("qty", 7i64).unwrap();
    assert_eq!(store.update(&loaded).await.unwrap(), 1);
    let reloaded = store.find("r1").await.unwrap().unwrap();
    assert_eq!(reloaded.qty(), Some(&7));
    assert_eq!(reloaded.flag(), None);

    let inserted = executor
        .execute(
            "INSERT INTO \"it_readings\" (\"flag\", \"qty\", \"id\") VALUES (?, ?, ?)",
            &[SqlValue::Bool(true), SqlValue::Null, SqlValue::from("r2")],
            false,
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);
    let rows = executor
        .select(
            "SELECT \"qty\" FROM \"it_readings\" WHERE \"id\"=? AND \"flag\"=?",
            &[SqlValue::from("r2"), SqlValue::Bool(true)],
            None,
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("qty"), Some(&SqlValue::Null));

    let none = executor
        .select("SELECT \"id\" FROM \"it_readings\"", &[], Some(0))
        .await
        .unwrap();
    assert!(none.is_empty());
    executor.close().await;
}

#[tokio::test]
async fn test_failed_transactional_execute_rolls_back() {
    let Some(executor) = executor(2).await else {
        return;
    };
    executor
        .execute("DROP TABLE IF EXISTS \"it_ledger\"", &[], false)
        .await
        .unwrap();
    executor
        .execute(
            "CREATE TABLE \"it_ledger\" (\"id\" varchar(10) PRIMARY KEY, \"qty\" bigint)",
            &[],
            false,
        )
        .await
        .unwrap();
    for (id, qty) in [("a", 4i64), ("b", 2), ("c", 8)] {
        executor
            .execute(
                "INSERT INTO \"it_ledger\" (\"id\", \"qty\") VALUES (?, ?)",
                &[SqlValue::from(id), SqlValue::Int(qty)],
                false,
            )
            .await
            .unwrap();
    }

    // division by zero on row "b" aborts the statement part way
    let result = executor
        .execute(
            "UPDATE \"it_ledger\" SET \"qty\" = 100 / (\"qty\" - ?)",
            &[SqlValue::Int(2)],
            true,
        )
        .await;
    assert!(matches!(result, Err(StoreError::Database(_))));

    let rows = executor
        .select(
            "SELECT \"id\", \"qty\" FROM \"it_ledger\" ORDER BY \"id\"",
            &[],
            None,
        )
        .await
        .unwrap();
    let quantities: Vec<Option<i64>> = rows
        .iter()
        .map(|row| row.get("qty").and_then(SqlValue::as_i64))
        .collect();
    assert_eq!(quantities, vec![Some(4), Some(2), Some(8)]);
    executor.close().await;
}

#[tokio::test]
async fn test_pool_bounds_concurrent_operations() {
    const MAX: u32 = 2;
    const TASKS: usize = 8;
    let Some(executor) = executor(MAX).await else {
        return;
    };
    let executor = Arc::new(executor);

    // warm the pool so connection setup doesn't count
    executor.select("SELECT 1 AS \"one\"", &[], None).await.unwrap();

    let started = Instant::now();
    let mut handles = Vec::with_capacity(TASKS);
    for _ in 0..TASKS {
        let executor = Arc::clone(&executor);
        handles.push(tokio::spawn(async move {
            let rows = executor
                .select("SELECT 1 AS \"one\" FROM pg_sleep(0.05)", &[], None)
                .await?;
            Ok::<_, StoreError>((rows.len(), executor.open_connections()))
        }));
    }

    for handle in handles {
        let (rows, open) = handle.await.unwrap().unwrap();
        assert_eq!(rows, 1);
        assert!(open <= MAX, "{} connections open, pool max is {}", open, MAX);
    }
    assert!(executor.open_connections() <= MAX);

    // each sleep holds a connection, so at most MAX run at once
    let floor = Duration::from_millis(50) * (TASKS as u32 / MAX);
    let elapsed = started.elapsed();
    assert!(
        elapsed >= floor,
        "{} sleeps finished in {:?}; queueing behind {} connections needs {:?}",
        TASKS,
        elapsed,
        MAX,
        floor
    );
    executor.close().await;
}

#[tokio::test]
async fn test_parameter_count_checked_before_execution() {
    let Some(executor) = executor(1).await else {
        return;
    };
    let err = executor
        .execute("DELETE FROM \"it_missing\" WHERE \"id\"=?", &[], false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::ParameterCountMismatch {
            expected: 1,
            given: 0
        }
    ));
    executor.close().await;
}
