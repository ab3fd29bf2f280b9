use api_lib::adapters::LocalFileStore;
use chrono::{Duration, FixedOffset, TimeZone, Utc};
use task_tracker_core::domain::{NewTask, TaskFilter, TaskPatch};
use task_tracker_core::ports::{PortError, TaskStore};
use task_tracker_core::{tasks, Analytics, LOCAL_OWNER_ID};
use tempfile::TempDir;

fn new_task(title: &str, category: Option<&str>) -> NewTask {
    NewTask {
        title: title.to_string(),
        category: category.map(str::to_string),
        ..Default::default()
    }
}

#[tokio::test]
async fn missing_file_opens_empty() {
    let dir = TempDir::new().unwrap();
    let store = LocalFileStore::open(dir.path().join("nested/tasks.json"))
        .await
        .unwrap();
    let all = store
        .list_tasks(LOCAL_OWNER_ID, &TaskFilter::default())
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn tasks_survive_a_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data/tasks_local.json");
    let now = Utc::now();

    let store = LocalFileStore::open(&path).await.unwrap();
    let kept = tasks::create_task(&store, LOCAL_OWNER_ID, new_task("Keep me", Some("Home")), now)
        .await
        .unwrap();
    let gone = tasks::create_task(&store, LOCAL_OWNER_ID, new_task("Delete me", None), now)
        .await
        .unwrap();
    tasks::toggle_task(&store, LOCAL_OWNER_ID, kept.id, now).await.unwrap();
    tasks::delete_task(&store, LOCAL_OWNER_ID, gone.id).await.unwrap();
    drop(store);

    assert!(path.exists());
    let reopened = LocalFileStore::open(&path).await.unwrap();
    let all = reopened
        .list_tasks(LOCAL_OWNER_ID, &TaskFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, kept.id);
    assert_eq!(all[0].title, "Keep me");
    assert_eq!(all[0].category.as_deref(), Some("Home"));
    assert!(all[0].completed);
    assert!(all[0].completed_at.is_some());
}

#[tokio::test]
async fn updates_are_written_through() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    let now = Utc::now();

    let store = LocalFileStore::open(&path).await.unwrap();
    let task = tasks::create_task(&store, LOCAL_OWNER_ID, new_task("Draft", Some("Work")), now)
        .await
        .unwrap();
    let patch = TaskPatch {
        title: Some("Final".to_string()),
        category: Some(None),
        ..Default::default()
    };
    tasks::update_task(&store, LOCAL_OWNER_ID, task.id, patch, now)
        .await
        .unwrap();

    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains("\"title\": \"Final\""));
    assert!(!on_disk.contains("Work"));
    assert!(on_disk.contains("\"ownerId\""));
}

#[tokio::test]
async fn failed_save_leaves_memory_unchanged() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    let now = Utc::now();

    let store = LocalFileStore::open(data_dir.join("tasks.json")).await.unwrap();
    let saved = tasks::create_task(&store, LOCAL_OWNER_ID, new_task("Saved", None), now)
        .await
        .unwrap();

    // A plain file where the data directory should be makes every save fail.
    std::fs::remove_dir_all(&data_dir).unwrap();
    std::fs::write(&data_dir, "not a directory").unwrap();

    let created = tasks::create_task(&store, LOCAL_OWNER_ID, new_task("Lost", None), now).await;
    assert!(matches!(created, Err(PortError::Unexpected(_))));
    let toggled = tasks::toggle_task(&store, LOCAL_OWNER_ID, saved.id, now).await;
    assert!(toggled.is_err());
    let deleted = tasks::delete_task(&store, LOCAL_OWNER_ID, saved.id).await;
    assert!(deleted.is_err());

    let all = store
        .list_tasks(LOCAL_OWNER_ID, &TaskFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, saved.id);
    assert!(!all[0].completed);
}

#[tokio::test]
async fn corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    std::fs::write(&path, "{ not json").unwrap();

    match LocalFileStore::open(&path).await {
        Err(PortError::Unexpected(msg)) => assert!(msg.contains("Corrupt")),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("corrupt file should not open"),
    }
}

#[tokio::test]
async fn completion_mismatch_is_repaired_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    let updated = "2025-03-10T12:00:00Z";
    let contents = format!(
        r#"[{{
            "id": "6f1c0d3e-8a43-4f8e-9d1a-0b6a4c1f2e11",
            "ownerId": "00000000-0000-0000-0000-000000000000",
            "title": "Hand edited",
            "completed": true,
            "priority": "low",
            "createdAt": "2025-03-09T08:00:00Z",
            "updatedAt": "{}"
        }}]"#,
        updated
    );
    std::fs::write(&path, contents).unwrap();

    let store = LocalFileStore::open(&path).await.unwrap();
    let all = store
        .list_tasks(LOCAL_OWNER_ID, &TaskFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(
        all[0].completed_at,
        Some(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn analytics_run_against_the_local_store() {
    let dir = TempDir::new().unwrap();
    let store = LocalFileStore::open(dir.path().join("tasks.json"))
        .await
        .unwrap();
    let offset = FixedOffset::east_opt(0).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap();

    for days_ago in [0, 1, 2] {
        let at = now - Duration::days(days_ago);
        let task = tasks::create_task(&store, LOCAL_OWNER_ID, new_task("Daily", None), at)
            .await
            .unwrap();
        tasks::toggle_task(&store, LOCAL_OWNER_ID, task.id, at)
            .await
            .unwrap();
    }

    let analytics = Analytics::new(&store, offset);
    let window = analytics.trailing_window(7, now).unwrap();
    let overview = analytics.overview(LOCAL_OWNER_ID, &window, now).await.unwrap();
    assert_eq!(overview.tasks_created, 3);
    assert_eq!(overview.tasks_completed, 3);
    assert_eq!(overview.completion_rate, 100);
    assert_eq!(overview.streak, 3);
}
