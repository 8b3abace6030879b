use chrono::Utc;
use lms_report_agent::error::AgentError;
use lms_report_agent::files::FileRegistry;
use lms_report_agent::runs::RunRegistry;

#[tokio::test]
async fn test_register_then_list_includes_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("1700000000_Midterm.xlsx");
    tokio::fs::write(&path, b"spreadsheet bytes").await.unwrap();

    let before = Utc::now();
    let registry = FileRegistry::new(dir.path().to_path_buf());
    let id = registry
        .register(&path, "Midterm.xlsx", "Physics", "Midterm")
        .await;

    let files = registry.list().await;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, id);
    assert_eq!(files[0].filename, "Midterm.xlsx");
    assert_eq!(files[0].course_name, "Physics");
    assert_eq!(files[0].size, "spreadsheet bytes".len() as u64);
    assert!(files[0].timestamp >= before);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let registry = FileRegistry::new(dir.path().to_path_buf());

    for name in ["a.xlsx", "b.xlsx", "c.xlsx"] {
        let path = dir.path().join(name);
        tokio::fs::write(&path, b"x").await.unwrap();
        registry.register(&path, name, "", "").await;
    }

    let files = registry.list().await;
    assert_eq!(files.len(), 3);
    assert!(files[0].timestamp >= files[1].timestamp);
    assert!(files[1].timestamp >= files[2].timestamp);
    assert_eq!(files[0].filename, "c.xlsx");
}

#[tokio::test]
async fn test_externally_deleted_file_is_purged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gone.xlsx");
    tokio::fs::write(&path, b"x").await.unwrap();

    let registry = FileRegistry::new(dir.path().to_path_buf());
    let id = registry.register(&path, "gone.xlsx", "", "").await;

    tokio::fs::remove_file(&path).await.unwrap();

    // list() excludes and purges the dead entry...
    assert!(registry.list().await.is_empty());
    // ...so resolving it afterwards is NotFound.
    assert!(matches!(
        registry.resolve(&id).await,
        Err(AgentError::NotFound)
    ));
}

#[tokio::test]
async fn test_resolve_purges_when_file_vanishes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleeting.xlsx");
    tokio::fs::write(&path, b"x").await.unwrap();

    let registry = FileRegistry::new(dir.path().to_path_buf());
    let id = registry.register(&path, "fleeting.xlsx", "", "").await;

    let (resolved, display) = registry.resolve(&id).await.unwrap();
    assert_eq!(resolved, path);
    assert_eq!(display, "fleeting.xlsx");

    tokio::fs::remove_file(&path).await.unwrap();
    assert!(matches!(
        registry.resolve(&id).await,
        Err(AgentError::NotFound)
    ));
    // The purge means the entry is gone for remove() too.
    assert!(matches!(
        registry.remove(&id).await,
        Err(AgentError::NotFound)
    ));
}

#[tokio::test]
async fn test_remove_known_and_unknown_are_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("r.xlsx");
    tokio::fs::write(&path, b"x").await.unwrap();

    let registry = FileRegistry::new(dir.path().to_path_buf());
    let id = registry.register(&path, "r.xlsx", "", "").await;

    assert!(registry.remove(&id).await.is_ok());
    assert!(matches!(
        registry.remove(&id).await,
        Err(AgentError::NotFound)
    ));
    // The file itself is untouched by remove().
    assert!(path.exists());
}

#[tokio::test]
async fn test_run_registry_distinct_ids_per_run() {
    let registry = RunRegistry::new();
    let (a, _ta) = registry.create().await;
    let (b, _tb) = registry.create().await;
    assert_ne!(a, b);
    assert_eq!(registry.active_count().await, 2);
}

#[tokio::test]
async fn test_cancel_all_flags_every_active_run() {
    let registry = RunRegistry::new();
    let (_, t1) = registry.create().await;
    let (_, t2) = registry.create().await;

    assert_eq!(registry.cancel_all().await, 2);
    assert!(t1.is_cancelled());
    assert!(t2.is_cancelled());

    // Idempotent on already-cancelled runs.
    assert_eq!(registry.cancel_all().await, 2);
}
