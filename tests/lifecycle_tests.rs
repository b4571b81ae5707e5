// Worker lifecycle tests: install, activate, fetch
// Author: kelexine (https://github.com/kelexine)

mod common;

use common::{assets, FakeOrigin, PatientHandler};
use async_trait::async_trait;
use kegama_offline::cache::{CacheStorage, DiskStore};
use kegama_offline::config::{CacheConfig, DEFAULT_ASSETS};
use kegama_offline::error::{OfflineError, Result};
use kegama_offline::network::{FetchRequest, FetchResponse, Network};
use kegama_offline::worker::{
    CacheLifecycleManager, FetchEvent, LifecycleHandler, Registration, WorkerRuntime, WorkerState,
};
use reqwest::Method;
use std::path::PathBuf;
use std::sync::Arc;

fn manager(name: &str, urls: &[&str]) -> Arc<CacheLifecycleManager> {
    Arc::new(CacheLifecycleManager::new(name, assets(urls)))
}

/// Registration with `kegama-v2` installed and activated over `origin`.
async fn activated(origin: &Arc<FakeOrigin>, urls: &[&str]) -> (Arc<CacheStorage>, Registration) {
    let caches = Arc::new(CacheStorage::in_memory());
    let network: Arc<dyn Network> = origin.clone();
    let registration = Registration::new(Arc::clone(&caches), network);
    registration
        .update("kegama-v2", manager("kegama-v2", urls))
        .await
        .unwrap();
    (caches, registration)
}

#[tokio::test]
async fn test_install_precaches_two_asset_manifest() {
    let origin = FakeOrigin::with_pages(&["/", "/static/manifest.json"]);
    let (caches, registration) = activated(&origin, &["/", "/static/manifest.json"]).await;

    let bucket = caches.get("kegama-v2").unwrap();
    assert_eq!(bucket.len(), 2);
    assert_eq!(bucket.keys(), vec!["/", "/static/manifest.json"]);
    assert_eq!(registration.active().unwrap().state(), WorkerState::Activated);
}

#[tokio::test]
async fn test_install_precaches_every_default_asset() {
    let origin = FakeOrigin::with_pages(DEFAULT_ASSETS);
    let caches = Arc::new(CacheStorage::in_memory());
    let registration = Registration::new(Arc::clone(&caches), origin.clone());

    let handler = Arc::new(CacheLifecycleManager::from_config(&CacheConfig::default()));
    registration.update("kegama-v2", handler).await.unwrap();

    let bucket = caches.get("kegama-v2").unwrap();
    for url in DEFAULT_ASSETS {
        assert!(bucket.contains(url), "{} was not pre-cached", url);
    }
    assert_eq!(bucket.len(), DEFAULT_ASSETS.len());
}

#[tokio::test]
async fn test_install_requests_skip_waiting() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let caches = Arc::new(CacheStorage::in_memory());
    let worker = WorkerRuntime::new(1, "kegama-v2", caches, origin.clone(), manager("kegama-v2", &["/"]));

    assert!(!worker.skip_waiting_requested());
    worker.install().await.unwrap();
    assert!(worker.skip_waiting_requested());
    assert_eq!(worker.state(), WorkerState::Installed);
}

#[tokio::test]
async fn test_install_failure_commits_nothing() {
    // The JS bundle is missing upstream
    let origin = FakeOrigin::with_pages(&["/", "/static/manifest.json"]);
    let caches = Arc::new(CacheStorage::in_memory());
    let registration = Registration::new(Arc::clone(&caches), origin.clone());

    let err = registration
        .update("kegama-v2", manager("kegama-v2", &["/", "/static/manifest.json", "/static/js/htmx.js"]))
        .await
        .unwrap_err();

    assert!(matches!(err, OfflineError::Install(_)));
    assert!(registration.active().is_none());
    assert!(caches.get("kegama-v2").map(|b| b.is_empty()).unwrap_or(true));
}

#[tokio::test]
async fn test_install_failure_when_origin_unreachable() {
    let origin = FakeOrigin::with_pages(&["/"]);
    origin.go_offline();
    let caches = Arc::new(CacheStorage::in_memory());
    let worker = WorkerRuntime::new(1, "kegama-v2", caches, origin.clone(), manager("kegama-v2", &["/"]));

    assert!(matches!(worker.install().await, Err(OfflineError::Install(_))));
    assert_eq!(worker.state(), WorkerState::Redundant);
    // A redundant worker cannot be activated
    assert!(matches!(worker.activate().await, Err(OfflineError::InvalidState { .. })));
}

#[tokio::test]
async fn test_activation_evicts_previous_version() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let caches = Arc::new(CacheStorage::in_memory());
    let stale = caches.open("kegama-v1").await.unwrap();
    stale.put("/", FetchResponse::new(200, "v1 home")).await.unwrap();
    caches.open("kegama-v0").await.unwrap();

    let registration = Registration::new(Arc::clone(&caches), origin.clone());
    registration
        .update("kegama-v2", manager("kegama-v2", &["/"]))
        .await
        .unwrap();

    assert_eq!(caches.keys(), vec!["kegama-v2"]);
    assert!(!caches.has("kegama-v1"));
    assert_eq!(caches.get("kegama-v2").unwrap().len(), 1);
}

#[tokio::test]
async fn test_activation_with_only_current_bucket_is_a_no_op() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let (caches, _registration) = activated(&origin, &["/"]).await;
    assert_eq!(caches.keys(), vec!["kegama-v2"]);
}

#[tokio::test]
async fn test_get_prefers_network_when_online() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let (_caches, registration) = activated(&origin, &["/"]).await;
    origin.serve("/", 200, "fresh home");

    let response = registration.fetch(FetchRequest::get("/")).await.unwrap();
    assert_eq!(response, FetchResponse::new(200, "fresh home"));
}

#[tokio::test]
async fn test_get_falls_back_to_cache_when_offline() {
    let origin = FakeOrigin::with_pages(&["/page"]);
    let (_caches, registration) = activated(&origin, &["/page"]).await;
    origin.go_offline();

    let response = registration.fetch(FetchRequest::get("/page")).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "network /page");
}

#[tokio::test]
async fn test_get_fails_when_offline_and_not_cached() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let (_caches, registration) = activated(&origin, &["/"]).await;
    origin.go_offline();

    let err = registration.fetch(FetchRequest::get("/missing")).await.unwrap_err();
    assert!(matches!(err, OfflineError::CacheMiss(ref url) if url == "/missing"));
}

#[tokio::test]
async fn test_http_error_status_is_not_a_network_failure() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let (_caches, registration) = activated(&origin, &["/"]).await;
    origin.serve("/", 500, "server error");

    // The cached copy exists but a 500 is still returned as-is
    let response = registration.fetch(FetchRequest::get("/")).await.unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(response.body, "server error");
}

#[tokio::test]
async fn test_network_responses_are_not_written_back() {
    let origin = FakeOrigin::with_pages(&["/", "/payslip/"]);
    let (caches, registration) = activated(&origin, &["/"]).await;

    registration.fetch(FetchRequest::get("/payslip/")).await.unwrap();
    assert!(!caches.get("kegama-v2").unwrap().contains("/payslip/"));

    origin.go_offline();
    assert!(registration.fetch(FetchRequest::get("/payslip/")).await.is_err());
}

#[tokio::test]
async fn test_non_get_is_not_intercepted() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let (caches, registration) = activated(&origin, &["/"]).await;

    // Handler leaves the event unclaimed
    let scope = registration.active().unwrap().scope().clone();
    let mut event = FetchEvent::new(FetchRequest::new(Method::POST, "/"));
    manager("kegama-v2", &["/"]).on_fetch(&scope, &mut event).unwrap();
    assert!(!event.was_responded());

    // Host forwards it to the network unmodified
    origin.serve("/management/employees/", 201, "created");
    let post = FetchRequest::new(Method::POST, "/management/employees/").with_body("name=Ayu");
    let response = registration.fetch(post).await.unwrap();
    assert_eq!(response.status, 201);
    assert!(origin.calls().contains(&"POST /management/employees/".to_string()));

    // Offline, a non-GET never falls back even though "/" is cached
    origin.go_offline();
    assert!(caches.get("kegama-v2").unwrap().contains("/"));
    let err = registration
        .fetch(FetchRequest::new(Method::POST, "/"))
        .await
        .unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn test_fetch_before_activation_passes_through() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let caches = Arc::new(CacheStorage::in_memory());
    let worker = WorkerRuntime::new(1, "kegama-v2", caches, origin.clone(), manager("kegama-v2", &["/"]));
    worker.install().await.unwrap();

    origin.go_offline();
    // Installed but not activated: the cached "/" is not used
    let err = worker.dispatch_fetch(FetchRequest::get("/")).await.unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn test_no_active_worker_passes_through() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let registration = Registration::new(Arc::new(CacheStorage::in_memory()), origin.clone());

    let response = registration.fetch(FetchRequest::get("/")).await.unwrap();
    assert_eq!(response.body, "network /");
}

#[tokio::test]
async fn test_skip_waiting_update_replaces_controller() {
    let origin = FakeOrigin::with_pages(&["/", "/static/manifest.json"]);
    let caches = Arc::new(CacheStorage::in_memory());
    let registration = Registration::new(Arc::clone(&caches), origin.clone());

    let v1 = registration
        .update("kegama-v1", manager("kegama-v1", &["/"]))
        .await
        .unwrap();
    let v2 = registration
        .update("kegama-v2", manager("kegama-v2", &["/", "/static/manifest.json"]))
        .await
        .unwrap();

    assert_eq!(v1.state(), WorkerState::Redundant);
    assert_eq!(v2.state(), WorkerState::Activated);
    assert_eq!(registration.active().unwrap().version(), "kegama-v2");
    assert!(registration.waiting().is_none());
    assert_eq!(caches.keys(), vec!["kegama-v2"]);
}

#[tokio::test]
async fn test_update_without_skip_waiting_waits_for_promotion() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let caches = Arc::new(CacheStorage::in_memory());
    let registration = Registration::new(Arc::clone(&caches), origin.clone());

    let v2 = registration
        .update("kegama-v2", manager("kegama-v2", &["/"]))
        .await
        .unwrap();
    let v3 = registration
        .update("kegama-v3", Arc::new(PatientHandler { cache_name: "kegama-v3".to_string() }))
        .await
        .unwrap();

    // Old controller keeps serving while the new version waits
    assert_eq!(v3.state(), WorkerState::Installed);
    assert_eq!(registration.active().unwrap().id(), v2.id());
    assert_eq!(registration.waiting().unwrap().id(), v3.id());

    let promoted = registration.activate_waiting().await.unwrap().unwrap();
    assert_eq!(promoted.id(), v3.id());
    assert_eq!(v3.state(), WorkerState::Activated);
    assert_eq!(v2.state(), WorkerState::Redundant);
    assert!(registration.activate_waiting().await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_update_keeps_current_controller() {
    let origin = FakeOrigin::with_pages(&["/"]);
    let (caches, registration) = activated(&origin, &["/"]).await;

    let err = registration
        .update("kegama-v3", manager("kegama-v3", &["/", "/static/js/new-bundle.js"]))
        .await
        .unwrap_err();

    assert!(matches!(err, OfflineError::Install(_)));
    assert_eq!(registration.active().unwrap().version(), "kegama-v2");
    // Nothing was evicted: activation never ran for the failed version
    assert!(caches.has("kegama-v2"));
}

#[tokio::test]
async fn test_persisted_stale_bucket_is_removed_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    {
        let caches = CacheStorage::persistent(dir.path()).await.unwrap();
        let v1 = caches.open("kegama-v1").await.unwrap();
        v1.put("/", FetchResponse::new(200, "v1 home")).await.unwrap();
    }

    let origin = FakeOrigin::with_pages(&["/"]);
    let caches = Arc::new(CacheStorage::persistent(dir.path()).await.unwrap());
    assert_eq!(caches.keys(), vec!["kegama-v1"]);

    let registration = Registration::new(Arc::clone(&caches), origin.clone());
    registration
        .update("kegama-v2", manager("kegama-v2", &["/"]))
        .await
        .unwrap();

    // A fresh process sees only the current version
    let reloaded = CacheStorage::persistent(dir.path()).await.unwrap();
    assert_eq!(reloaded.keys(), vec!["kegama-v2"]);
    let home = reloaded.match_request(&FetchRequest::get("/")).unwrap();
    assert_eq!(home.body, "network /");
}

/// Origin that, when `trigger` is fetched, replaces a bucket file with a
/// directory so the next write of that bucket fails.
struct FileSwappingOrigin {
    inner: Arc<FakeOrigin>,
    trigger: &'static str,
    bucket_file: PathBuf,
}

#[async_trait]
impl Network for FileSwappingOrigin {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        if request.url == self.trigger && !self.bucket_file.is_dir() {
            let _ = std::fs::remove_file(&self.bucket_file);
            std::fs::create_dir_all(&self.bucket_file)?;
        }
        self.inner.fetch(request).await
    }
}

#[tokio::test]
async fn test_install_disk_failure_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let bucket_file = DiskStore::open(dir.path()).await.unwrap().path_for("kegama-v3");

    let inner = FakeOrigin::with_pages(&["/", "/new-only"]);
    let origin = Arc::new(FileSwappingOrigin {
        inner: Arc::clone(&inner),
        trigger: "/new-only",
        bucket_file,
    });
    let caches = Arc::new(CacheStorage::persistent(dir.path()).await.unwrap());
    let registration = Registration::new(Arc::clone(&caches), origin);
    registration
        .update("kegama-v2", manager("kegama-v2", &["/"]))
        .await
        .unwrap();

    let err = registration
        .update("kegama-v3", manager("kegama-v3", &["/", "/new-only"]))
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineError::Install(_)));
    assert!(caches.get("kegama-v3").unwrap().is_empty());

    // The current controller must not find the failed batch offline
    inner.go_offline();
    assert_eq!(registration.active().unwrap().version(), "kegama-v2");
    let err = registration
        .fetch(FetchRequest::get("/new-only"))
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineError::CacheMiss(_)));
}

#[tokio::test]
async fn test_activation_fails_when_stale_bucket_cannot_be_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let origin = FakeOrigin::with_pages(&["/"]);
    let caches = Arc::new(CacheStorage::persistent(dir.path()).await.unwrap());
    let registration = Registration::new(Arc::clone(&caches), origin.clone());
    registration
        .update("kegama-v1", manager("kegama-v1", &["/"]))
        .await
        .unwrap();

    // A directory in place of the stale bucket's file cannot be unlinked
    let stale_file = DiskStore::open(dir.path()).await.unwrap().path_for("kegama-v1");
    std::fs::remove_file(&stale_file).unwrap();
    std::fs::create_dir(&stale_file).unwrap();

    let err = registration
        .update("kegama-v2", manager("kegama-v2", &["/"]))
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineError::Activation(_)));

    let active = registration.active().unwrap();
    assert_eq!(active.version(), "kegama-v1");
    assert_eq!(active.state(), WorkerState::Activated);
    assert!(registration.waiting().is_none());
    assert!(caches.has("kegama-v1"));

    // The instance whose activation failed is left redundant
    let worker = WorkerRuntime::new(
        99,
        "kegama-v2",
        Arc::clone(&caches),
        origin.clone(),
        manager("kegama-v2", &["/"]),
    );
    worker.install().await.unwrap();
    let err = worker.activate().await.unwrap_err();
    assert!(matches!(err, OfflineError::Activation(_)));
    assert_eq!(worker.state(), WorkerState::Redundant);
}
