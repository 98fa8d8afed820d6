//! Scripted transport and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use schoolgate_core::api::{ApiError, ApiRequest, ApiResponse, Transport};
use schoolgate_core::storage::MemoryStore;
use schoolgate_core::{AuthGateway, SessionStore};
use serde_json::{json, Value};
use tokio::sync::Notify;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub enum Reply {
    Respond(ApiResponse),
    Fail(ApiError),
    /// Respond once the notify fires.
    Hold(Arc<Notify>, ApiResponse),
    /// Never respond.
    Stall,
}

/// Plays back queued replies in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn respond(&self, status: u16, body: Value) {
        self.push(Reply::Respond(ApiResponse::new(status, body.to_string())));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Hold(notify, response)) => {
                notify.notified().await;
                Ok(response)
            }
            Some(Reply::Stall) => std::future::pending().await,
            None => Err(ApiError::Network("no scripted reply".to_string())),
        }
    }
}

pub struct Harness {
    pub gateway: AuthGateway,
    pub transport: Arc<ScriptedTransport>,
    pub storage: Arc<MemoryStore>,
}

pub fn harness() -> Harness {
    harness_with_storage(Arc::new(MemoryStore::new()))
}

pub fn harness_with_storage(storage: Arc<MemoryStore>) -> Harness {
    let transport = ScriptedTransport::new();
    let gateway = AuthGateway::with_transport(
        transport.clone(),
        SessionStore::new(storage.clone()),
        TIMEOUT,
    );
    Harness {
        gateway,
        transport,
        storage,
    }
}

pub fn admin_user() -> Value {
    json!({ "id": 1, "username": "admin", "role_type": "admin" })
}

pub fn login_body(token: &str, user: Value) -> Value {
    json!({ "token": token, "user": user })
}

/// Hydrate, then sign in as `user` with token `token`.
pub async fn signed_in(h: &Harness, token: &str, user: Value) {
    h.gateway.hydrate();
    h.transport.respond(200, login_body(token, user));
    h.gateway
        .login(&schoolgate_core::Credentials::new("someone", "password"))
        .await
        .expect("login should succeed");
}
