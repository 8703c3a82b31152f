use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use crate::error::AppError;

/// HTTP clients for outbound integrations, one per credential.
///
/// Owned by `AppState` and shared through it; building a client per request
/// would throw away its connection pool.
#[derive(Clone, Default)]
pub struct ClientCache {
    clients: Arc<RwLock<HashMap<String, Arc<Client>>>>,
}

impl fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // credentials are the map keys; only the size is printed
        f.debug_struct("ClientCache").field("len", &self.len()).finish()
    }
}

impl ClientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the client bound to `credential`, building it on first use.
    pub fn get_or_create(&self, credential: &str) -> Result<Arc<Client>, AppError> {
        if credential.trim().is_empty() {
            return Err(AppError::validation("credential must not be empty"));
        }

        if let Some(client) = self
            .clients
            .read()
            .map_err(|_| AppError::InternalServerError)?
            .get(credential)
        {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().map_err(|_| AppError::InternalServerError)?;
        // another caller may have built it between the two locks
        if let Some(client) = clients.get(credential) {
            return Ok(client.clone());
        }

        let client = Arc::new(build_client(credential)?);
        clients.insert(credential.to_string(), client.clone());
        Ok(client)
    }

    pub fn evict(&self, credential: &str) -> bool {
        self.clients
            .write()
            .map(|mut clients| clients.remove(credential).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.clients.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn build_client(credential: &str) -> Result<Client, AppError> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential))
        .map_err(|_| AppError::validation("credential contains invalid header characters"))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))
}
