use std::sync::Arc;
use std::time::Duration;

use clutchdb::{EngineConfig, Error, QueryDispatcher};
use tempfile::tempdir;

fn open(dir: &std::path::Path) -> Arc<QueryDispatcher> {
    let config = EngineConfig::new()
        .data_dir(dir)
        .btree_order(3)
        .lock_wait_timeout(Some(Duration::from_secs(2)));
    Arc::new(QueryDispatcher::open(config).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_all_land() {
    let dir = tempdir().unwrap();
    let db = open(dir.path());
    db.execute("CREATE TABLE events (n INT, source VARCHAR(10))")
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|worker| {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                for i in 0..10 {
                    let sql = format!(
                        "INSERT INTO events (n, source) VALUES ('{}', 'w{}')",
                        i, worker
                    );
                    db.execute_when_free(&sql).await.unwrap();
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let result = db.execute("SELECT n FROM events").unwrap();
    assert_eq!(result.rows.len(), 80);

    let result = db.execute("SELECT n FROM events WHERE source = 'w3'").unwrap();
    assert_eq!(result.rows.len(), 10);
    assert!(!db.lock_manager().is_locked("events"));
}

#[tokio::test]
async fn test_held_lock_blocks_other_tables_not() {
    let dir = tempdir().unwrap();
    let db = open(dir.path());
    db.execute("CREATE TABLE a (x INT)").unwrap();
    db.execute("CREATE TABLE b (x INT)").unwrap();

    let locks = Arc::clone(db.lock_manager());
    let guard = locks.try_lock_guard("a").unwrap();

    assert!(matches!(
        db.execute("INSERT INTO a (x) VALUES ('1')"),
        Err(Error::TableAlreadyLocked(t)) if t == "a"
    ));
    assert!(db.execute("INSERT INTO b (x) VALUES ('1')").is_ok());

    drop(guard);
    assert!(db.execute("INSERT INTO a (x) VALUES ('1')").is_ok());
}

#[tokio::test]
async fn test_failed_statement_releases_lock() {
    let dir = tempdir().unwrap();
    let db = open(dir.path());

    assert!(matches!(
        db.execute("SELECT x FROM missing"),
        Err(Error::UnknownTable(_))
    ));
    assert!(db.lock_manager().locked_tables().is_empty());
}

#[tokio::test]
async fn test_delete_while_waiting_writer() {
    let dir = tempdir().unwrap();
    let db = open(dir.path());
    db.execute("CREATE TABLE t (k INT)").unwrap();
    for k in 0..5 {
        db.execute(&format!("INSERT INTO t (k) VALUES ('{}')", k))
            .unwrap();
    }

    db.lock_manager().lock("t").unwrap();
    let pending = {
        let db = Arc::clone(&db);
        tokio::spawn(async move { db.execute_when_free("DELETE FROM t WHERE k = '2'").await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());
    db.lock_manager().release_lock("t");

    let result = pending.await.unwrap().unwrap();
    assert_eq!(result.affected_rows, 1);

    let result = db.execute("SELECT k FROM t").unwrap();
    assert_eq!(result.rows, vec![vec!["0"], vec!["1"], vec!["3"], vec!["4"]]);
}
