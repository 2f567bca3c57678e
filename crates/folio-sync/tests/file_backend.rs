//! The document cache over a JSON file store.

use folio_core::{contains_icon, defaults, DetailsPatch, DocumentPatch, SocialLink};
use folio_sync::{
    CacheConfigBuilder, DocumentCache, DocumentStore, JsonFileStore, SyncEvent,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("folio-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

async fn confirmed(cache: &DocumentCache<JsonFileStore>, patch: DocumentPatch) {
    let mut events = cache.events();
    let id = cache.update(patch).unwrap();
    timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::WriteConfirmed { write_id }) if write_id == id => return,
                Ok(SyncEvent::WriteFailed { write_id, error }) if write_id == id => {
                    panic!("write failed: {}", error)
                }
                Ok(_) => continue,
                Err(err) => panic!("event channel error: {}", err),
            }
        }
    })
    .await
    .expect("write was not confirmed");
}

#[tokio::test]
async fn test_values_survive_restart() {
    let dir = scratch_dir("restart");
    let config = CacheConfigBuilder::new().build();

    {
        let store = Arc::new(JsonFileStore::new(&dir));
        let cache = DocumentCache::with_config(store.clone(), config.clone());
        cache.start().unwrap();
        cache.wait_synced().await.unwrap();

        confirmed(
            &cache,
            DocumentPatch::new().details(
                DetailsPatch::new()
                    .name("Ada")
                    .socials(vec![SocialLink::new("gh", "GitHub", "https://github.com/ada")]),
            ),
        )
        .await;
        cache.shutdown();

        let stored = store.read(&config.path).await.unwrap().unwrap();
        assert!(!contains_icon(&stored));
    }

    let store = Arc::new(JsonFileStore::new(&dir));
    let cache = DocumentCache::with_config(store, config);
    cache.start().unwrap();
    cache.wait_synced().await.unwrap();

    let current = cache.current();
    assert_eq!(current.details.name, "Ada");
    assert_eq!(current.details.socials.len(), 1);
    let github = current.details.social("GitHub").unwrap();
    assert_eq!(github.url, "https://github.com/ada");
    assert_eq!(github.icon.key(), "GitHub");
    assert_eq!(current.projects, defaults().projects);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_first_start_writes_default_file() {
    let dir = scratch_dir("first-start");
    let store = Arc::new(JsonFileStore::new(&dir));
    let config = CacheConfigBuilder::new().document("fresh").build();
    let cache = DocumentCache::with_config(store.clone(), config.clone());
    let mut events = cache.events();

    cache.start().unwrap();
    timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(SyncEvent::DocumentCreated) = events.recv().await {
                return;
            }
        }
    })
    .await
    .expect("default document was not created");

    assert!(store.file_path(&config.path).exists());
    assert_eq!(*cache.current(), defaults());

    let _ = std::fs::remove_dir_all(&dir);
}
