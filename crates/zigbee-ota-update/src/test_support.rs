//! Scripted transport shared by the unit tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::NetworkError;
use crate::transport::HttpTransport;

/// Replays a script of responses in order and records every requested URL.
///
/// Once the script runs out every further request fails with HTTP 404.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<Bytes, NetworkError>>>,
    requested: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<Result<Bytes, NetworkError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<Bytes, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().push(url.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(NetworkError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            })
    }
}

pub(crate) fn body(json: &'static str) -> Result<Bytes, NetworkError> {
    Ok(Bytes::from_static(json.as_bytes()))
}

pub(crate) fn bytes(data: Vec<u8>) -> Result<Bytes, NetworkError> {
    Ok(Bytes::from(data))
}
