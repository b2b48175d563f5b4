//! An in-process fake of the bookkeeping API.

#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    routing::{get, post, put},
    Json, Router,
};
use debtbook::{ApiClient, Config, CredentialStore, SessionManager};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::{net::TcpListener, sync::Notify};
use url::Url;

type Reply = (StatusCode, Json<Value>);

#[derive(Debug, Clone)]
struct Account {
    id: String,
    name: String,
    password: String,
}

/// Holds `/auth/me` requests made with a particular token until released.
pub struct Stall {
    token: String,
    pub arrived: Notify,
    pub release: Notify,
}

#[derive(Default)]
pub struct Backend {
    accounts: Mutex<HashMap<String, Account>>,
    tokens: Mutex<HashMap<String, String>>,
    stall: Mutex<Option<Arc<Stall>>>,
    contacts: Mutex<HashMap<String, Vec<Value>>>,
    writes: Mutex<Vec<String>>,
    /// Reject every login, even with the right password.
    pub logins_disabled: AtomicBool,
    /// Answer `/auth/me` with a 503.
    pub outage: AtomicBool,
    pub requests: AtomicUsize,
    pub login_requests: AtomicUsize,
    pub me_requests: AtomicUsize,
}

impl Backend {
    pub fn new() -> Arc<Self> {
        let backend = Backend::default();
        {
            let mut contacts = backend.contacts.lock().unwrap();
            contacts.insert(
                String::from("clients"),
                vec![
                    json!({ "_id": "c1", "name": "Acme Ltd", "phone": "5551234567", "amount_owed": 1250.5 }),
                    json!({ "_id": "c2", "name": "Globex", "amount_owed": 80 }),
                ],
            );
            contacts.insert(
                String::from("suppliers"),
                vec![json!({ "_id": "s1", "name": "Wholesale Co", "amount_owed": 200 })],
            );
        }

        Arc::new(backend)
    }

    /// Every write the server has seen, as `"METHOD /path"`.
    pub fn writes(&self) -> Vec<String> { self.writes.lock().unwrap().clone() }

    fn record(&self, method: &str, path: &str) {
        self.writes
            .lock()
            .unwrap()
            .push(format!("{} {}", method, path));
    }

    pub fn add_account(&self, name: &str, email: &str, password: &str) {
        let mut accounts = self.accounts.lock().unwrap();
        let id = (accounts.len() + 1).to_string();
        accounts.insert(
            email.to_string(),
            Account {
                id,
                name: name.to_string(),
                password: password.to_string(),
            },
        );
    }

    /// Pretend `token` was issued to `email` in an earlier run.
    pub fn issue_token(&self, email: &str, token: &str) {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), email.to_string());
    }

    /// Forget every token we've handed out.
    pub fn revoke_all(&self) { self.tokens.lock().unwrap().clear(); }

    pub fn stall(&self, token: &str) -> Arc<Stall> {
        let stall = Arc::new(Stall {
            token: token.to_string(),
            arrived: Notify::new(),
            release: Notify::new(),
        });
        *self.stall.lock().unwrap() = Some(Arc::clone(&stall));

        stall
    }

    pub fn request_count(&self) -> usize { self.requests.load(Ordering::SeqCst) }

    fn account_for(&self, headers: &HeaderMap) -> Option<(String, Account)> {
        let token = bearer(headers)?;
        let email = self.tokens.lock().unwrap().get(&token).cloned()?;
        let account = self.accounts.lock().unwrap().get(&email).cloned()?;

        Some((email, account))
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(String::from)
}

fn unauthorized() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Not authenticated" })),
    )
}

async fn login(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    backend.login_requests.fetch_add(1, Ordering::SeqCst);

    if backend.logins_disabled.load(Ordering::SeqCst) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Account awaiting approval" })),
        );
    }

    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default();
    let account = backend.accounts.lock().unwrap().get(&email).cloned();

    match account {
        Some(account) if account.password == password => {
            let token = format!("token-{}", email);
            backend.issue_token(&email, &token);

            (
                StatusCode::OK,
                Json(json!({
                    "token": token,
                    "user": { "id": account.id, "name": account.name, "email": email },
                })),
            )
        },
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid credentials" })),
        ),
    }
}

async fn register(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);

    let email = body["email"].as_str().unwrap_or_default();
    if backend.accounts.lock().unwrap().contains_key(email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Email already registered" })),
        );
    }

    backend.add_account(
        body["username"].as_str().unwrap_or_default(),
        email,
        body["password"].as_str().unwrap_or_default(),
    );

    (StatusCode::CREATED, Json(json!({ "message": "Account created" })))
}

async fn me(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    backend.me_requests.fetch_add(1, Ordering::SeqCst);

    let stall = backend.stall.lock().unwrap().clone();
    if let Some(stall) = stall {
        if bearer(&headers).as_deref() == Some(stall.token.as_str()) {
            stall.arrived.notify_one();
            stall.release.notified().await;
        }
    }

    if backend.outage.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Try again later" })),
        );
    }

    match backend.account_for(&headers) {
        // deliberately uses the alternative field names
        Some((email, account)) => (
            StatusCode::OK,
            Json(json!({ "_id": account.id, "username": account.name, "email": email })),
        ),
        None => unauthorized(),
    }
}

/// Which collection (`clients` or `suppliers`) a request is aimed at.
fn collection(uri: &Uri) -> String {
    uri.path().split('/').nth(1).unwrap_or_default().to_string()
}

fn not_found() -> Reply {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Contact not found" })),
    )
}

async fn list_contacts(
    State(backend): State<Arc<Backend>>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);

    if backend.account_for(&headers).is_none() {
        return unauthorized();
    }

    let all = backend
        .contacts
        .lock()
        .unwrap()
        .get(&collection(&uri))
        .cloned()
        .unwrap_or_default();
    let search = params.get("search").map(|s| s.to_lowercase());
    let found: Vec<Value> = all
        .into_iter()
        .filter(|c| match &search {
            Some(term) => c["name"]
                .as_str()
                .unwrap_or_default()
                .to_lowercase()
                .contains(term.as_str()),
            None => true,
        })
        .collect();

    (StatusCode::OK, Json(Value::Array(found)))
}

async fn create_contact(
    State(backend): State<Arc<Backend>>,
    uri: Uri,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);

    if backend.account_for(&headers).is_none() {
        return unauthorized();
    }
    if body["name"].as_str().unwrap_or_default().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Name is required" })),
        );
    }

    backend.record("POST", uri.path());
    let mut contacts = backend.contacts.lock().unwrap();
    let entries = contacts.entry(collection(&uri)).or_default();
    let id = format!("new{}", entries.len() + 1);
    body["_id"] = json!(id);
    entries.push(body);

    (StatusCode::CREATED, Json(json!({ "_id": id })))
}

async fn update_contact(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);

    if backend.account_for(&headers).is_none() {
        return unauthorized();
    }

    backend.record("PUT", uri.path());
    let mut contacts = backend.contacts.lock().unwrap();
    let existing = contacts
        .get_mut(&collection(&uri))
        .and_then(|entries| entries.iter_mut().find(|c| c["_id"] == id.as_str()));

    match existing {
        Some(contact) => {
            let mut updated = body;
            updated["_id"] = json!(id);
            *contact = updated.clone();
            (StatusCode::OK, Json(updated))
        },
        None => not_found(),
    }
}

async fn delete_contact(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);

    if backend.account_for(&headers).is_none() {
        return unauthorized();
    }

    backend.record("DELETE", uri.path());
    let mut contacts = backend.contacts.lock().unwrap();
    let entries = match contacts.get_mut(&collection(&uri)) {
        Some(entries) => entries,
        None => return not_found(),
    };
    let before = entries.len();
    entries.retain(|c| c["_id"] != id.as_str());

    if entries.len() == before {
        not_found()
    } else {
        (StatusCode::OK, Json(json!({ "message": "Deleted" })))
    }
}

async fn dashboard(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Reply {
    backend.requests.fetch_add(1, Ordering::SeqCst);

    if backend.account_for(&headers).is_none() {
        return unauthorized();
    }

    (
        StatusCode::OK,
        Json(json!({
            "total_money_owed_to_me": 1330.5,
            "total_money_i_owe": 200,
            "net_position": 1130.5,
            "total_clients": 2,
            "total_suppliers": 1,
            "recent_clients": [{ "_id": "c1", "name": "Acme Ltd", "amount_owed": 1250.5 }],
        })),
    )
}

/// Start the fake server, returning its base URL.
pub async fn spawn(backend: Arc<Backend>) -> Url {
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/clients", get(list_contacts))
        .route("/clients/", post(create_contact))
        .route("/clients/{id}", put(update_contact).delete(delete_contact))
        .route("/suppliers", get(list_contacts))
        .route("/suppliers/", post(create_contact))
        .route("/suppliers/{id}", put(update_contact).delete(delete_contact))
        .route("/dashboard", get(dashboard))
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Url::parse(&format!("http://{}", addr)).unwrap()
}

pub fn manager(base_url: &Url, store: Arc<dyn CredentialStore>) -> SessionManager {
    let api = ApiClient::new(&Config::new(base_url.clone())).unwrap();
    SessionManager::new(api, store)
}
