mod common;

use common::{CallLog, Hook, employee_definition, hire};
use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use strata_odm::{
    Collection, Filter, MemoryBackend, Odm, OdmConfig, OdmError, OdmResult, OperationType,
    OperationWhen, SortDirection, StorageError,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn staffed(rows: usize, batch: usize) -> (Arc<MemoryBackend>, Odm, Collection) {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let config = OdmConfig {
        cursor_batch_size: batch,
        ..OdmConfig::default()
    };
    let odm = Odm::with_config(backend.clone(), config);
    let employees = odm.define_collection(employee_definition()).await.unwrap();
    for i in 0..rows {
        hire(&employees, &format!("e{i}"), i as i64).await;
    }
    (backend, odm, employees)
}

fn sorted(collection: &Collection) -> strata_odm::Query {
    collection.find(Filter::new()).sort("salary", SortDirection::Asc)
}

// ── Release ──────────────────────────────────────────────────────

#[tokio::test]
async fn exhausting_the_cursor_releases_once() {
    let (backend, _odm, employees) = staffed(5, 2).await;

    let records = sorted(&employees).to_vec().await.unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[4].get("salary"), Some(&json!(4)));
    assert_eq!(backend.cursors_opened(), 1);
    assert_eq!(backend.cursors_released(), 1);
    assert_eq!(backend.open_cursors(), 0);
}

#[tokio::test]
async fn batch_boundary_exhaustion_releases_once() {
    let (backend, _odm, employees) = staffed(4, 2).await;

    let mut cursor = sorted(&employees).cursor().await.unwrap();
    let mut seen = 0;
    while cursor.next().await.unwrap().is_some() {
        seen += 1;
    }
    assert_eq!(seen, 4);
    assert!(cursor.is_released());
    assert!(cursor.next().await.unwrap().is_none());
    drop(cursor);
    assert_eq!(backend.cursors_released(), 1);
}

#[tokio::test]
async fn stopping_early_releases_on_drop() {
    let (backend, _odm, employees) = staffed(5, 2).await;

    let mut cursor = sorted(&employees).cursor().await.unwrap();
    let first = cursor.next().await.unwrap().unwrap();
    assert_eq!(first.get("name"), Some(&json!("e0")));
    assert!(!cursor.is_released());
    assert_eq!(backend.open_cursors(), 1);

    drop(cursor);
    assert_eq!(backend.cursors_released(), 1);
    assert_eq!(backend.open_cursors(), 0);
}

#[tokio::test]
async fn explicit_release_is_idempotent() {
    let (backend, _odm, employees) = staffed(3, 1).await;

    let mut cursor = sorted(&employees).cursor().await.unwrap();
    cursor.next().await.unwrap();
    cursor.release();
    cursor.release();
    assert!(cursor.is_released());
    assert!(cursor.next().await.unwrap().is_none());
    drop(cursor);
    assert_eq!(backend.cursors_released(), 1);
}

async fn first_two_names(collection: &Collection) -> OdmResult<Vec<String>> {
    let mut cursor = sorted(collection).cursor().await?;
    let mut names = Vec::new();
    while let Some(record) = cursor.next().await? {
        let name = record.get("name").and_then(|v| v.as_str()).unwrap_or_default();
        if names.len() == 1 {
            // The consumer gives up midway with its own error.
            return Err(OdmError::CollectionNotFound(name.to_string()));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

#[tokio::test]
async fn consumer_error_still_releases() {
    let (backend, _odm, employees) = staffed(5, 2).await;

    assert!(first_two_names(&employees).await.is_err());
    assert_eq!(backend.cursors_opened(), 1);
    assert_eq!(backend.cursors_released(), 1);
}

#[tokio::test]
async fn connection_drop_midway_is_reported_and_released() {
    let (backend, _odm, employees) = staffed(5, 1).await;
    backend.fail_reads_after(2);

    let mut cursor = sorted(&employees).cursor().await.unwrap();
    assert!(cursor.next().await.unwrap().is_some());
    assert!(cursor.next().await.unwrap().is_some());
    let err = cursor.next().await.unwrap_err();
    assert!(matches!(err, OdmError::Storage(StorageError::Connection(_))));
    assert!(cursor.is_released());
    assert!(cursor.next().await.unwrap().is_none());

    drop(cursor);
    assert_eq!(backend.cursors_released(), 1);
    backend.clear_read_failure();
}

#[tokio::test]
async fn interceptor_error_midway_still_releases() {
    let (backend, odm, employees) = staffed(5, 2).await;
    let log = CallLog::new();
    odm.add_interceptor(Hook::new("picky", 0, &log, |op, when, records, _| {
        let bad = records.iter().any(|r| r.get("name") == Some(&json!("e2")));
        if op == OperationType::Select && when == OperationWhen::After && bad {
            anyhow::bail!("cannot show e2");
        }
        Ok(Some(records))
    }));

    let err = sorted(&employees).to_vec().await.unwrap_err();
    assert!(matches!(err, OdmError::Interceptor { ref name, .. } if name == "picky"));
    assert_eq!(backend.cursors_released(), 1);
    assert_eq!(backend.open_cursors(), 0);
}

// ── Per-record interception ──────────────────────────────────────

#[tokio::test]
async fn after_select_runs_once_per_record() {
    let (_backend, odm, employees) = staffed(7, 3).await;
    let log = CallLog::new();
    let sizes = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&sizes);
    odm.add_interceptor(Hook::new("count", 0, &log, move |_, when, records, _| {
        if when == OperationWhen::After {
            sink.lock().unwrap().push(records.len());
        }
        Ok(Some(records))
    }));

    let records = sorted(&employees).to_vec().await.unwrap();
    assert_eq!(records.len(), 7);
    assert_eq!(*sizes.lock().unwrap(), vec![1; 7]);
}

#[tokio::test]
async fn after_select_may_expand_a_record() {
    let (_backend, odm, employees) = staffed(2, 5).await;
    let log = CallLog::new();
    odm.add_interceptor(Hook::new("twice", 0, &log, |_, when, records, _| {
        if when == OperationWhen::After {
            let mut doubled = records.clone();
            doubled.extend(records);
            return Ok(Some(doubled));
        }
        Ok(Some(records))
    }));

    assert_eq!(sorted(&employees).to_vec().await.unwrap().len(), 4);
}

// ── Streams ──────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_every_record_then_releases() {
    let (backend, _odm, employees) = staffed(4, 3).await;

    let cursor = sorted(&employees).cursor().await.unwrap();
    let records: Vec<_> = cursor.into_stream().try_collect().await.unwrap();
    let salaries: Vec<_> = records.iter().map(|r| r.get("salary").cloned()).collect();
    assert_eq!(
        salaries,
        vec![Some(json!(0)), Some(json!(1)), Some(json!(2)), Some(json!(3))]
    );
    assert_eq!(backend.cursors_released(), 1);
}

#[tokio::test]
async fn dropping_a_partial_stream_releases() {
    let (backend, _odm, employees) = staffed(6, 2).await;

    let cursor = sorted(&employees).cursor().await.unwrap();
    let first: Vec<_> = cursor.into_stream().take(1).collect().await;
    assert_eq!(first.len(), 1);
    assert!(first[0].is_ok());
    assert_eq!(backend.cursors_released(), 1);
    assert_eq!(backend.open_cursors(), 0);
}

#[tokio::test]
async fn stream_ends_after_an_error() {
    let (backend, _odm, employees) = staffed(4, 1).await;
    backend.fail_reads_after(1);

    let cursor = sorted(&employees).cursor().await.unwrap();
    let items: Vec<_> = cursor.into_stream().collect().await;
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(items[1].is_err());
    assert_eq!(backend.cursors_released(), 1);
}

#[tokio::test]
async fn zero_batch_size_still_makes_progress() {
    let (backend, _odm, employees) = staffed(3, 0).await;
    assert_eq!(sorted(&employees).to_vec().await.unwrap().len(), 3);
    assert_eq!(backend.cursors_released(), 1);
}
