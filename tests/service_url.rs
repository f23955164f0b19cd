mod common;

use linkstore::StoreError;
use linkstore::application::services::BatchItem;
use linkstore::domain::repositories::UrlRepository;
use linkstore::infrastructure::persistence::MemoryUrlRepository;
use std::sync::Arc;

fn item(id: &str, url: &str) -> BatchItem {
    BatchItem {
        correlation_id: id.to_string(),
        original_url: url.to_string(),
    }
}

#[tokio::test]
async fn test_shortening_same_url_twice_returns_same_key() {
    let (service, _pool) = common::create_test_service(Arc::new(MemoryUrlRepository::new()));

    let first = service.shorten("u1", "https://example.com/page").await.unwrap();
    let second = service
        .shorten("u2", "HTTPS://EXAMPLE.COM:443/page#section")
        .await
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.short_key, second.short_key);
    assert_eq!(
        service.resolve(&first.short_key).await.unwrap(),
        "https://example.com/page"
    );
}

#[tokio::test]
async fn test_lookup_after_shorten() {
    let (service, _pool) = common::create_test_service(Arc::new(MemoryUrlRepository::new()));

    let shortened = service.shorten("u1", "https://rust-lang.org").await.unwrap();

    assert_eq!(
        service.lookup("https://rust-lang.org/").await.unwrap(),
        shortened.short_key
    );
}

#[tokio::test]
async fn test_batch_mixes_new_and_existing_urls() {
    let (service, _pool) = common::create_test_service(Arc::new(MemoryUrlRepository::new()));
    let existing = service.shorten("u1", "https://a.com").await.unwrap();

    let results = service
        .shorten_batch(
            "u1",
            vec![
                item("first", "https://a.com"),
                item("second", "https://b.com"),
                item("third", "https://b.com/"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].correlation_id, "first");
    assert_eq!(results[0].short_key, existing.short_key);
    assert_eq!(results[1].short_key, results[2].short_key);
    assert_eq!(service.list_for_owner("u1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_batch_with_invalid_url_stores_nothing() {
    let (service, _pool) = common::create_test_service(Arc::new(MemoryUrlRepository::new()));

    let err = service
        .shorten_batch(
            "u1",
            vec![item("1", "https://ok.com"), item("2", "ftp://nope.com")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Invalid(_)));
    assert!(service.list_for_owner("u1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_background_delete_then_resolve_is_gone() {
    let (_dir, path) = common::temp_log();
    let repo: Arc<dyn UrlRepository> = Arc::new(common::open_file_repo(&path).await);
    let (service, pool) = common::create_test_service(repo.clone());

    let shortened = service.shorten("u1", "https://a.com").await.unwrap();
    let foreign = service.shorten("u2", "https://b.com").await.unwrap();

    service
        .delete_urls(
            "u1",
            vec![shortened.short_key.clone(), foreign.short_key.clone()],
        )
        .unwrap();

    pool.shutdown().await;

    assert_eq!(pool.completed(), 1);
    assert!(matches!(
        service.resolve(&shortened.short_key).await,
        Err(StoreError::Gone(_))
    ));

    assert_eq!(service.resolve(&foreign.short_key).await.unwrap(), "https://b.com/");
    repo.close().await;

    let reopened = common::open_file_repo(&path).await;
    assert!(matches!(
        reopened.get_original_url(&shortened.short_key).await,
        Err(StoreError::Gone(_))
    ));
}
