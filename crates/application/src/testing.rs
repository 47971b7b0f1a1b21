//! Test doubles shared by the unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use galleria_domain::{RequestSpec, ResponseSpec, SourceFile};
use parking_lot::Mutex;

use crate::auth::SessionTerminator;
use crate::ports::{
    ApiClient, HttpClient, HttpClientError, KeyValueStore, PreviewUrlRegistry, StorageError,
    TerminationReason,
};
use crate::ApplicationResult;

/// In-memory [`KeyValueStore`].
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn insert(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

type Responder = dyn Fn(&RequestSpec) -> Result<ResponseSpec, HttpClientError> + Send + Sync;

/// [`HttpClient`] answering from a closure and recording every request.
pub struct ScriptedHttp {
    responder: Box<Responder>,
    requests: Mutex<Vec<RequestSpec>>,
}

impl ScriptedHttp {
    pub fn new(
        responder: impl Fn(&RequestSpec) -> Result<ResponseSpec, HttpClientError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RequestSpec> {
        self.requests.lock().clone()
    }

    pub fn count_matching(&self, endpoint: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.targets(endpoint)).count()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: RequestSpec) -> Result<ResponseSpec, HttpClientError> {
        self.requests.lock().push(request.clone());
        tokio::task::yield_now().await;
        (self.responder)(&request)
    }
}

/// [`SessionTerminator`] that records reasons.
#[derive(Default)]
pub struct RecordingTerminator {
    pub reasons: Mutex<Vec<TerminationReason>>,
}

#[async_trait]
impl SessionTerminator for RecordingTerminator {
    async fn terminate(&self, reason: TerminationReason) {
        self.reasons.lock().push(reason);
    }
}

/// [`ApiClient`] forwarding straight to a scripted client.
pub struct Passthrough(pub Arc<ScriptedHttp>);

#[async_trait]
impl ApiClient for Passthrough {
    async fn send(&self, request: RequestSpec) -> ApplicationResult<ResponseSpec> {
        Ok(self.0.execute(request).await?)
    }
}

/// Counter-based [`PreviewUrlRegistry`].
#[derive(Default)]
pub struct MemoryPreviews {
    next: Mutex<u32>,
    live: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryPreviews {
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}

impl PreviewUrlRegistry for MemoryPreviews {
    fn create(&self, file: &SourceFile) -> ApplicationResult<String> {
        let mut next = self.next.lock();
        *next += 1;
        let url = format!("blob:test/{next:04}");
        self.live.lock().insert(url.clone(), file.data.clone());
        Ok(url)
    }

    fn revoke(&self, url: &str) {
        self.live.lock().remove(url);
    }

    fn resolve(&self, url: &str) -> Option<Vec<u8>> {
        self.live.lock().get(url).cloned()
    }
}
