#![allow(dead_code)]

use linkstore::application::services::UrlService;
use linkstore::domain::entities::UrlRecord;
use linkstore::domain::repositories::UrlRepository;
use linkstore::domain::task_pool::TaskPool;
use linkstore::infrastructure::persistence::MemoryUrlRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub fn record(owner: &str, key: &str, url: &str) -> UrlRecord {
    UrlRecord::new(owner, key, url)
}

/// Temporary directory and a log path inside it. Keep the directory alive for the test.
pub fn temp_log() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("urls.log");
    (dir, path)
}

pub async fn open_file_repo(path: &Path) -> MemoryUrlRepository {
    MemoryUrlRepository::open(path).await.unwrap()
}

pub fn read_log(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn create_test_service(
    repository: Arc<dyn UrlRepository>,
) -> (UrlService<dyn UrlRepository>, Arc<TaskPool>) {
    let pool = Arc::new(TaskPool::start(2));
    (UrlService::new(repository, pool.clone()), pool)
}

pub async fn insert_raw(pool: &sqlx::PgPool, key: &str, url: &str, owner: &str, deleted: bool) {
    sqlx::query("INSERT INTO urls (short_url, full_url, uuid, deleted) VALUES ($1, $2, $3, $4)")
        .bind(key)
        .bind(url)
        .bind(owner)
        .bind(deleted)
        .execute(pool)
        .await
        .unwrap();
}
