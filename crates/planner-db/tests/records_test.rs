//! Integration tests for the `plan_records` queries.
//!
//! These need a PostgreSQL server (Docker via testcontainers, or
//! `PLANNER_TEST_PG_URL`), so they are ignored by default:
//! `cargo test -p planner-db -- --ignored`.

use serde_json::json;

use planner_db::pool;
use planner_db::queries::records;
use planner_test_utils::{create_test_db, drop_test_db};

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn upsert_then_get_returns_value() {
    let (pool, db_name) = create_test_db().await;

    let value = json!({"id": "abc", "name": "Warehouse move"});
    records::upsert_record(&pool, "plan:abc", &value)
        .await
        .expect("upsert should succeed");

    let fetched = records::get_record(&pool, "plan:abc")
        .await
        .expect("get should succeed");
    assert_eq!(fetched, Some(value));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn upsert_replaces_existing_value() {
    let (pool, db_name) = create_test_db().await;

    records::upsert_record(&pool, "plan:1", &json!({"v": 1}))
        .await
        .unwrap();
    records::upsert_record(&pool, "plan:1", &json!({"v": 2}))
        .await
        .unwrap();

    let fetched = records::get_record(&pool, "plan:1").await.unwrap();
    assert_eq!(fetched, Some(json!({"v": 2})));
    assert_eq!(pool::record_count(&pool).await.unwrap(), 1);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn get_missing_returns_none() {
    let (pool, db_name) = create_test_db().await;

    let fetched = records::get_record(&pool, "plan:nope").await.unwrap();
    assert!(fetched.is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn delete_reports_whether_row_existed() {
    let (pool, db_name) = create_test_db().await;

    records::upsert_record(&pool, "plan:x", &json!({})).await.unwrap();
    assert!(records::delete_record(&pool, "plan:x").await.unwrap());
    assert!(!records::delete_record(&pool, "plan:x").await.unwrap());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn list_keys_filters_by_literal_prefix() {
    let (pool, db_name) = create_test_db().await;

    for key in ["plan:b", "plan:a", "other:c", "plan_x"] {
        records::upsert_record(&pool, key, &json!({})).await.unwrap();
    }

    let keys = records::list_keys(&pool, "plan:").await.unwrap();
    assert_eq!(keys, vec!["plan:a".to_string(), "plan:b".to_string()]);

    // `_` in the prefix must not act as a wildcard.
    let keys = records::list_keys(&pool, "plan_").await.unwrap();
    assert_eq!(keys, vec!["plan_x".to_string()]);

    pool.close().await;
    drop_test_db(&db_name).await;
}
