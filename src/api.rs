// 🌐 HTTP Handlers - descriptor-driven routes
//
// One router factory walks the configured catalog and mounts, per entity:
//   GET/POST  /<path>
//   GET       /<path>/:id
//   PUT/DELETE /<path>/:id   (mutable entities only)

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::error::{BankingError, Result};
use crate::repository::EntityRepository;
use crate::schema::{Catalog, EntityDescriptor};
use crate::validator::{parse_key, Payload, ValidationPolicy};

pub const BANNER: &str = "WELCOME TO PRIVATE BANKING DATABASE";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub catalog: Catalog,
    pub policy: ValidationPolicy,
    pub empty_list_ok: bool,
}

impl AppState {
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            store,
            catalog: Catalog::new(config.schema_variant),
            policy: config.validation_policy(),
            empty_list_ok: config.empty_list_ok,
        }
    }
}

type Descriptor = Extension<&'static EntityDescriptor>;

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let mut app = Router::new().route("/", get(index));

    for descriptor in state.catalog.descriptors() {
        let mut item = get(get_entity);
        if descriptor.mutable {
            item = item.put(update_entity).delete(delete_entity);
        }

        let routes = Router::new()
            .route(
                &format!("/{}", descriptor.path),
                get(list_entities).post(create_entity),
            )
            .route(&format!("/{}/:id", descriptor.path), item)
            .layer(Extension(descriptor));
        app = app.merge(routes);
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - plain-text banner
async fn index() -> &'static str {
    BANNER
}

/// GET /<path>
async fn list_entities(
    State(state): State<AppState>,
    Extension(descriptor): Descriptor,
) -> Result<Response> {
    let policy = state.policy;
    let listed = state
        .store
        .run(move |conn| EntityRepository::new(conn, descriptor, policy).list())
        .await;

    match listed {
        Ok(rows) => Ok((StatusCode::OK, Json(rows)).into_response()),
        Err(BankingError::EmptyResult { .. }) if state.empty_list_ok => {
            Ok((StatusCode::OK, Json(Vec::<Value>::new())).into_response())
        }
        Err(e) => Err(e),
    }
}

/// POST /<path>
async fn create_entity(
    State(state): State<AppState>,
    Extension(descriptor): Descriptor,
    body: Bytes,
) -> Result<Response> {
    let payload = parse_payload(&body)?;
    let policy = state.policy;
    let created = state
        .store
        .run(move |conn| EntityRepository::new(conn, descriptor, policy).create(&payload))
        .await?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// GET /<path>/:id
async fn get_entity(
    State(state): State<AppState>,
    Extension(descriptor): Descriptor,
    Path(raw_id): Path<String>,
) -> Result<Response> {
    let id = parse_key(&raw_id, descriptor)?;
    let policy = state.policy;
    let found = state
        .store
        .run(move |conn| EntityRepository::new(conn, descriptor, policy).get(&id))
        .await?;

    Ok((StatusCode::OK, Json(found)).into_response())
}

/// PUT /<path>/:id
async fn update_entity(
    State(state): State<AppState>,
    Extension(descriptor): Descriptor,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Response> {
    let id = parse_key(&raw_id, descriptor)?;
    let payload = parse_payload(&body)?;
    let policy = state.policy;
    let updated = state
        .store
        .run(move |conn| EntityRepository::new(conn, descriptor, policy).update(&id, &payload))
        .await?;

    Ok((StatusCode::OK, Json(updated)).into_response())
}

/// DELETE /<path>/:id
async fn delete_entity(
    State(state): State<AppState>,
    Extension(descriptor): Descriptor,
    Path(raw_id): Path<String>,
) -> Result<Response> {
    let id = parse_key(&raw_id, descriptor)?;
    let policy = state.policy;
    let message = format!(
        "{} with ID {} has been deleted.",
        descriptor.entity.name(),
        id
    );
    state
        .store
        .run(move |conn| EntityRepository::new(conn, descriptor, policy).delete(&id))
        .await?;

    Ok((StatusCode::OK, Json(json!({ "message": message }))).into_response())
}

/// Request bodies must be a JSON object; anything else is a 400.
fn parse_payload(body: &[u8]) -> Result<Payload> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(BankingError::InvalidBody(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(BankingError::InvalidBody(format!("Invalid JSON body: {}", e))),
    }
}
