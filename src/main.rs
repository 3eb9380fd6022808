//! mdvault - Local-First Markdown Editor Backend
//!
//! A single-user daemon serving the browser editor on localhost:
//! - Document registry with the last active document remembered
//! - Debounced, capped per-document version history
//! - Soft-delete trash with time-based expiry
//! - Per-document edit analytics
//! - Sled embedded database for persistence

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

mod analytics;
mod config;
mod debounce;
mod documents;
mod history;
mod storage;

use analytics::{AnalyticsRecorder, DocumentStats, EditTracker, TotalStats};
use config::AppConfig;
use documents::{Document, DocumentRegistry, DocumentUpdate};
use history::{Snapshot, SnapshotWatcher, TrashEntry, VersionHistory};
use storage::{KvStore, MemoryStore, SledStore, StorageConfig, StorageStats};

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// Shared application state
pub struct AppState {
    /// Backing key-value store
    store: Arc<dyn KvStore>,
    /// Live documents
    registry: Arc<DocumentRegistry>,
    /// Snapshots and trash
    history: Arc<VersionHistory>,
    /// Debounced snapshot trigger
    watcher: SnapshotWatcher,
    /// Edit statistics
    analytics: Arc<AnalyticsRecorder>,
    /// Debounced analytics trigger
    edit_tracker: EditTracker,
    /// Server start time
    started_at: std::time::Instant,
}

impl AppState {
    /// Build the state and load everything persisted in `store`
    pub fn new(store: Arc<dyn KvStore>, config: &AppConfig) -> Self {
        let registry = Arc::new(DocumentRegistry::new(store.clone()));
        registry.load();

        let history = Arc::new(VersionHistory::new(store.clone(), config.history.clone()));
        history.load();

        let analytics = Arc::new(AnalyticsRecorder::new(store.clone(), config.analytics.clone()));
        analytics.load();

        Self {
            watcher: SnapshotWatcher::new(history.clone()),
            edit_tracker: EditTracker::new(analytics.clone()),
            store,
            registry,
            history,
            analytics,
            started_at: std::time::Instant::now(),
        }
    }
}

// ============================================================================
// API TYPES
// ============================================================================

/// Health payload; field names stay snake_case, unlike the camelCase API types
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    document_count: usize,
    trash_count: usize,
    pending_snapshots: usize,
}

#[derive(Debug, Deserialize)]
struct CreateDocumentRequest {
    title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentListResponse {
    documents: Vec<Document>,
    active_id: Option<String>,
    total: usize,
}

#[derive(Debug, Deserialize)]
struct SetActiveRequest {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionListResponse {
    document_id: String,
    versions: Vec<Snapshot>,
    total: usize,
}

#[derive(Debug, Serialize)]
struct TrashListResponse {
    entries: Vec<TrashEntry>,
    total: usize,
}

#[derive(Debug, Serialize)]
struct CountResponse {
    count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StorageResponse {
    /// Serialized size of the version mapping plus the trash
    history_bytes: usize,
    store: StorageStats,
}

// ============================================================================
// HTTP HANDLERS: DOCUMENTS
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        document_count: state.registry.len(),
        trash_count: state.history.trash().len(),
        pending_snapshots: state.watcher.pending(),
    })
}

async fn list_documents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let documents = state.registry.list();
    let total = documents.len();

    Json(DocumentListResponse {
        documents,
        active_id: state.registry.active_id(),
        total,
    })
}

async fn create_document(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<CreateDocumentRequest>>,
) -> impl IntoResponse {
    let title = payload.and_then(|Json(request)| request.title);
    let document = state.registry.create_document(title.as_deref());
    (StatusCode::CREATED, Json(document))
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, StatusCode> {
    state.registry.get(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Apply an edit; content changes feed the snapshot and analytics debouncers
async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<DocumentUpdate>,
) -> Result<Json<Document>, StatusCode> {
    let document = match update {
        DocumentUpdate {
            title: Some(title),
            content: None,
        } => state.registry.rename_document(&id, &title),
        update => {
            let content_changed = update.content.is_some();
            let document = state.registry.update_document(&id, update);
            if let Some(document) = document.as_ref().filter(|_| content_changed) {
                observe_content(&state, document);
            }
            document
        }
    }
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(document))
}

/// Move a document to the trash, then drop it from the registry
async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TrashEntry>, StatusCode> {
    let document = state.registry.get(&id).ok_or(StatusCode::NOT_FOUND)?;

    state.watcher.cancel(&id);
    state.edit_tracker.cancel(&id);

    let entry = state.history.move_to_trash(document);
    state.registry.delete_document(&id);

    Ok(Json(entry))
}

async fn save_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, StatusCode> {
    state
        .registry
        .mark_as_saved(&id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_active_document(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Document>, StatusCode> {
    state
        .registry
        .active_document()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn set_active_document(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetActiveRequest>,
) -> Result<Json<Document>, StatusCode> {
    if !state.registry.set_active(&request.id) {
        return Err(StatusCode::NOT_FOUND);
    }
    get_active_document(State(state)).await
}

fn observe_content(state: &AppState, document: &Document) {
    state
        .watcher
        .watch(&document.id, &document.content, &document.title);
    state.edit_tracker.track(
        &document.id,
        document.content.chars().count(),
        &document.title,
    );
}

// ============================================================================
// HTTP HANDLERS: VERSIONS
// ============================================================================

async fn list_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let versions = state.history.get_versions(&id);
    let total = versions.len();

    Json(VersionListResponse {
        document_id: id,
        versions,
        total,
    })
}

async fn clear_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    state.history.clear_versions(&id);
    StatusCode::NO_CONTENT
}

async fn get_version(
    State(state): State<Arc<AppState>>,
    Path((id, version_id)): Path<(String, String)>,
) -> Result<Json<Snapshot>, StatusCode> {
    state
        .history
        .get_versions(&id)
        .into_iter()
        .find(|snapshot| snapshot.id == version_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn delete_version(
    State(state): State<Arc<AppState>>,
    Path((id, version_id)): Path<(String, String)>,
) -> StatusCode {
    if state.history.delete_version(&id, &version_id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Put a snapshot's content back into the live document
async fn restore_version(
    State(state): State<Arc<AppState>>,
    Path((id, version_id)): Path<(String, String)>,
) -> Result<Json<Document>, StatusCode> {
    let content = state
        .history
        .restore_version(&id, &version_id)
        .ok_or(StatusCode::NOT_FOUND)?;

    let document = state
        .registry
        .update_document(&id, DocumentUpdate::content(content))
        .ok_or(StatusCode::NOT_FOUND)?;

    info!("Restored document {} to version {}", id, version_id);
    observe_content(&state, &document);

    Ok(Json(document))
}

// ============================================================================
// HTTP HANDLERS: TRASH
// ============================================================================

async fn list_trash(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let entries = state.history.trash();
    let total = entries.len();
    Json(TrashListResponse { entries, total })
}

async fn empty_trash(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let count = state.history.empty_trash();
    Json(CountResponse { count })
}

/// Take a document out of the trash and put it back in the registry
async fn restore_from_trash(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Document>, StatusCode> {
    let entry = state
        .history
        .restore_from_trash(&id)
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(state.registry.insert_document(entry.document)))
}

async fn delete_from_trash(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.history.delete_from_trash(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn clean_trash(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let count = state.history.clean_expired_trash();
    debug!("Manual trash clean purged {} entries", count);
    Json(CountResponse { count })
}

async fn storage_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StorageResponse {
        history_bytes: state.history.get_storage_size(),
        store: state.store.stats(),
    })
}

// ============================================================================
// HTTP HANDLERS: ANALYTICS
// ============================================================================

async fn analytics_totals(State(state): State<Arc<AppState>>) -> Json<TotalStats> {
    Json(state.analytics.get_total_stats())
}

async fn analytics_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentStats>, StatusCode> {
    state
        .analytics
        .get_document_stats(&id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn analytics_by_day(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, u64>> {
    Json(state.analytics.get_edits_by_day())
}

async fn analytics_by_hour(State(state): State<Arc<AppState>>) -> Json<BTreeMap<u32, u64>> {
    Json(state.analytics.get_edits_by_hour())
}

async fn analytics_ranking(State(state): State<Arc<AppState>>) -> Json<Vec<DocumentStats>> {
    Json(state.analytics.get_ranking())
}

// ============================================================================
// ROUTER
// ============================================================================

fn build_router(state: Arc<AppState>) -> Router {
    // The editor is served from a different origin during development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Documents
        .route("/api/documents", get(list_documents).post(create_document))
        .route(
            "/api/documents/active",
            get(get_active_document).put(set_active_document),
        )
        .route(
            "/api/documents/:id",
            get(get_document).patch(update_document).delete(delete_document),
        )
        .route("/api/documents/:id/save", post(save_document))
        // Version history
        .route(
            "/api/documents/:id/versions",
            get(list_versions).delete(clear_versions),
        )
        .route(
            "/api/documents/:id/versions/:version_id",
            get(get_version).delete(delete_version),
        )
        .route(
            "/api/documents/:id/versions/:version_id/restore",
            post(restore_version),
        )
        // Trash
        .route("/api/trash", get(list_trash).delete(empty_trash))
        .route("/api/trash/clean", post(clean_trash))
        .route("/api/trash/:id", delete(delete_from_trash))
        .route("/api/trash/:id/restore", post(restore_from_trash))
        .route("/api/storage", get(storage_info))
        // Analytics
        .route("/api/analytics", get(analytics_totals))
        .route("/api/analytics/documents/:id", get(analytics_document))
        .route("/api/analytics/by-day", get(analytics_by_day))
        .route("/api/analytics/by-hour", get(analytics_by_hour))
        .route("/api/analytics/ranking", get(analytics_ranking))
        // Add state and middleware
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    if config.is_in_memory() {
        warn!("Using in-memory storage - nothing will survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    info!("Initializing storage at: {}", config.path);
    Ok(Arc::new(SledStore::open(config)?))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before the log filter reads RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mdvault=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env();

    let store = open_store(&config.storage)?;
    info!("Storage initialized successfully");

    // Create application state
    let state = Arc::new(AppState::new(store.clone(), &config));

    // Start background tasks
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let sweep_handle = state.history.clone().start_trash_sweep(shutdown_rx);

    let app = build_router(state);
    let addr = config.socket_addr();

    info!("mdvault v{} starting", env!("CARGO_PKG_VERSION"));
    info!("   Listening on: http://{}", addr);
    info!("   Storage: {}", config.storage.path);
    info!("   Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(());
    if let Err(e) = sweep_handle.await {
        warn!("Trash sweep ended abnormally: {}", e);
    }

    store.flush()?;
    info!("mdvault stopped");
    Ok(())
}
