use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub display_name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub display_name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Default)]
pub struct Store {
    next_id: AtomicU64,
    users: RwLock<BTreeMap<u64, User>>,
}

pub type Db = Arc<Store>;

pub const REQUEST_ID: &str = "x-request-id";

pub fn app() -> Router {
    let db: Db = Arc::new(Store::default());
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/users/{id}/history", get(user_history))
        .route("/ping", get(ping))
        .layer(middleware::from_fn(request_id))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn request_id(request: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    tracing::debug!(%id, method = %request.method(), uri = %request.uri(), "request");
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID, value);
    }
    response
}

fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "not found"})))
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let users = db.users.read().await;
    Json(users.values().cloned().collect())
}

async fn create_user(State(db): State<Db>, Json(input): Json<CreateUser>) -> (StatusCode, Json<User>) {
    let user = User {
        user_id: db.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        display_name: input.display_name,
        email: input.email,
    };
    db.users.write().await.insert(user.user_id, user.clone());
    tracing::info!(user_id = user.user_id, "created user");
    (StatusCode::CREATED, Json(user))
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let users = db.users.read().await;
    match users.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => not_found().into_response(),
    }
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<UpdateUser>,
) -> Response {
    let mut users = db.users.write().await;
    let Some(user) = users.get_mut(&id) else {
        return not_found().into_response();
    };
    if let Some(display_name) = input.display_name {
        user.display_name = display_name;
    }
    if let Some(email) = input.email {
        user.email = email;
    }
    Json(user.clone()).into_response()
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let mut users = db.users.write().await;
    match users.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found().into_response(),
    }
}

/// Two concatenated JSON documents: the user as first created, then as it is now.
async fn user_history(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let users = db.users.read().await;
    let Some(user) = users.get(&id) else {
        return not_found().into_response();
    };
    let original = User {
        display_name: format!("{} (original)", user.display_name),
        ..user.clone()
    };
    let body = match (serde_json::to_string(&original), serde_json::to_string(user)) {
        (Ok(first), Ok(second)) => format!("{first}\n{second}\n"),
        _ => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn ping() -> StatusCode {
    StatusCode::NO_CONTENT
}
