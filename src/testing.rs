//! In-memory stand-ins for the external collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::feed::FeedProbe;
use crate::index::IndexService;
use crate::mail::{MailTransport, OutboundEmail};
use crate::models::{IndexObject, NewIndexObject, NewTrigger, Trigger};

#[derive(Default)]
pub struct FakeIndex {
    next_id: AtomicUsize,
    objects: Mutex<HashMap<String, IndexObject>>,
    triggers: Mutex<HashMap<String, NewTrigger>>,
    object_creations: AtomicUsize,
    fetches: Mutex<Vec<String>>,
    pub fail_create_object: AtomicBool,
    pub fail_delete_trigger: AtomicBool,
}

impl FakeIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seeds a feed-item object as the service would have extracted it.
    pub fn add_item(&self, id: &str, title: &str, url: &str) {
        let object = IndexObject {
            id: id.to_string(),
            kind: "html".to_string(),
            metadata: json!({ "html": format!("<p>{}</p>", title), "title": title, "url": url }),
            label: None,
            parent_id: None,
        };
        self.objects.lock().unwrap().insert(id.to_string(), object);
    }

    pub fn object_creations(&self) -> usize {
        self.object_creations.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn trigger(&self, id: &str) -> Option<NewTrigger> {
        self.triggers.lock().unwrap().get(id).cloned()
    }

    pub fn object(&self, id: &str) -> Option<IndexObject> {
        self.objects.lock().unwrap().get(id).cloned()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl IndexService for FakeIndex {
    async fn create_object(&self, object: &NewIndexObject) -> Result<IndexObject> {
        if self.fail_create_object.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("HTTP 503: unavailable".to_string()));
        }
        self.object_creations.fetch_add(1, Ordering::SeqCst);
        let created = IndexObject {
            id: self.next_id("obj"),
            kind: object.kind.clone(),
            metadata: object.metadata.clone(),
            label: object.label.clone(),
            parent_id: object.parent_id.clone(),
        };
        self.objects
            .lock()
            .unwrap()
            .insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_object(&self, id: &str) -> Result<IndexObject> {
        self.fetches.lock().unwrap().push(id.to_string());
        self.object(id)
            .ok_or_else(|| AppError::Upstream(format!("HTTP 404: object {} not found", id)))
    }

    async fn create_trigger(&self, trigger: &NewTrigger) -> Result<Trigger> {
        let id = self.next_id("trg");
        self.triggers
            .lock()
            .unwrap()
            .insert(id.clone(), trigger.clone());
        Ok(Trigger {
            id,
            query: trigger.query.clone(),
            matching_threshold: trigger.matching_threshold,
        })
    }

    async fn delete_trigger(&self, id: &str) -> Result<bool> {
        if self.fail_delete_trigger.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("HTTP 500: boom".to_string()));
        }
        Ok(self.triggers.lock().unwrap().remove(id).is_some())
    }
}

/// Wraps a [`FakeIndex`] and holds each object lookup for a per-id delay
/// before delegating, so the inner fetch log records completion order.
pub struct DelayedIndex {
    inner: Arc<FakeIndex>,
    delays: HashMap<String, Duration>,
}

impl DelayedIndex {
    pub fn new(inner: Arc<FakeIndex>, delays: &[(&str, Duration)]) -> Arc<Self> {
        let delays = delays
            .iter()
            .map(|(id, delay)| (id.to_string(), *delay))
            .collect();
        Arc::new(Self { inner, delays })
    }
}

#[async_trait]
impl IndexService for DelayedIndex {
    async fn create_object(&self, object: &NewIndexObject) -> Result<IndexObject> {
        self.inner.create_object(object).await
    }

    async fn get_object(&self, id: &str) -> Result<IndexObject> {
        if let Some(delay) = self.delays.get(id) {
            tokio::time::sleep(*delay).await;
        }
        self.inner.get_object(id).await
    }

    async fn create_trigger(&self, trigger: &NewTrigger) -> Result<Trigger> {
        self.inner.create_trigger(trigger).await
    }

    async fn delete_trigger(&self, id: &str) -> Result<bool> {
        self.inner.delete_trigger(id).await
    }
}

#[derive(Default)]
pub struct FakeMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    pub fail: AtomicBool,
}

impl FakeMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for FakeMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Mail("API error: rejected".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct FakeProbe {
    valid: AtomicBool,
    checks: AtomicUsize,
}

impl FakeProbe {
    pub fn new(valid: bool) -> Arc<Self> {
        Arc::new(Self {
            valid: AtomicBool::new(valid),
            checks: AtomicUsize::new(0),
        })
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedProbe for FakeProbe {
    async fn is_feed(&self, _url: &str) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.valid.load(Ordering::SeqCst)
    }
}
