mod common;

use chrono::Utc;
use common::memory_db;
use genesis_core::job::{Job, JobStatus, JobUpdate};
use genesis_core::types::new_job_id;
use genesis_db::models::job::JobRow;
use genesis_db::repositories::JobRepo;
use genesis_pipeline::store::INTERRUPTED_ERROR;
use genesis_pipeline::JobStore;

#[tokio::test]
async fn terminal_record_is_recovered_from_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db().await;

    let first = JobStore::new(dir.path(), Some(db.clone()));
    let id = new_job_id();
    first.insert(Job::queued(id, Utc::now())).await;
    first
        .apply(id, JobUpdate::ended(JobStatus::Failed, "backend rejected prompt"))
        .await
        .unwrap();

    let restarted = JobStore::new(dir.path(), Some(db));
    let job = restarted.lookup(id).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("backend rejected prompt"));
}

#[tokio::test]
async fn interrupted_run_is_reported_failed_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db().await;

    let first = JobStore::new(dir.path(), Some(db.clone()));
    let id = new_job_id();
    first.insert(Job::queued(id, Utc::now())).await;
    first.apply(id, JobUpdate::processing(0, "Initializing")).await.unwrap();

    let restarted = JobStore::new(dir.path(), Some(db.clone()));
    let job = restarted.lookup(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some(INTERRUPTED_ERROR));

    let row = JobRepo::find_by_id(&db, id).await.unwrap().unwrap();
    assert_eq!(row.status, "failed");
}

#[tokio::test]
async fn artifact_on_disk_wins_over_interrupted_record() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db().await;
    let id = new_job_id();

    let mut job = Job::queued(id, Utc::now());
    job.merge(JobUpdate::processing(90, "Downloading"), Utc::now());
    JobRepo::upsert(&db, &JobRow::from(&job)).await.unwrap();
    std::fs::write(dir.path().join(format!("{id}.mov")), b"video").unwrap();

    let store = JobStore::new(dir.path(), Some(db));
    let recovered = store.lookup(id).await.unwrap();

    assert_eq!(recovered.status, JobStatus::Completed);
    assert_eq!(recovered.progress, 100);
    assert_eq!(
        recovered.artifact_path,
        Some(dir.path().join(format!("{id}.mov")))
    );
}

#[tokio::test]
async fn unknown_everywhere_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::new(dir.path(), Some(memory_db().await));
    assert!(matches!(
        store.lookup(new_job_id()).await,
        Err(genesis_pipeline::JobError::NotFound(_))
    ));
}

#[tokio::test]
async fn unreadable_database_falls_back_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    // No migrations: every read fails with "no such table".
    let db = genesis_db::create_memory_pool().await.unwrap();
    let id = new_job_id();
    std::fs::write(dir.path().join(format!("{id}.mp4")), b"video").unwrap();

    let store = JobStore::new(dir.path(), Some(db));
    let recovered = store.lookup(id).await.unwrap();

    assert_eq!(recovered.status, JobStatus::Completed);
    assert_eq!(recovered.progress, 100);
    assert_eq!(recovered.artifact_path, Some(dir.path().join(format!("{id}.mp4"))));
}

#[tokio::test]
async fn corrupt_row_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let db = memory_db().await;

    let with_file = new_job_id();
    let without_file = new_job_id();
    for id in [with_file, without_file] {
        let mut row = JobRow::from(&Job::queued(id, Utc::now()));
        row.status = "exploded".into();
        JobRepo::upsert(&db, &row).await.unwrap();
    }
    std::fs::write(dir.path().join(format!("{with_file}.webm")), b"video").unwrap();

    let store = JobStore::new(dir.path(), Some(db));

    let recovered = store.lookup(with_file).await.unwrap();
    assert_eq!(recovered.status, JobStatus::Completed);
    assert!(matches!(
        store.lookup(without_file).await,
        Err(genesis_pipeline::JobError::NotFound(_))
    ));
}
