//! In-process stand-ins for the completion and image services.

use crate::{
    clients::{CompletionService, ImageService},
    error::{ClientError, Result},
    models::{CompletionRequest, ImageRequest},
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FakeCompletion {
    reply: Option<String>,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl FakeCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        self.reply.clone().ok_or(ClientError::Status {
            status: 503,
            message: "service unavailable".into(),
        })
    }
}

/// Succeeds with a predictable URL per call, except on the listed call indices.
pub struct FakeImageService {
    fail_on: Vec<usize>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ImageRequest>>,
}

impl FakeImageService {
    pub fn succeeding() -> Self {
        Self::failing_on(&[])
    }

    pub fn failing_on(indices: &[usize]) -> Self {
        Self {
            fail_on: indices.to_vec(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn url_for(index: usize) -> String {
        format!("https://images.test/dish-{}.png", index)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageService for FakeImageService {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.fail_on.contains(&index) {
            return Err(ClientError::PredictionFailed {
                status: "failed".into(),
                message: format!("simulated failure on call {}", index),
            });
        }
        Ok(vec![Self::url_for(index)])
    }
}
