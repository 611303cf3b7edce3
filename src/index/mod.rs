mod client;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{IndexObject, NewIndexObject, NewTrigger, Trigger};

pub use client::OperandClient;

/// The semantic indexing service that owns feed objects and match triggers.
#[async_trait]
pub trait IndexService: Send + Sync {
    async fn create_object(&self, object: &NewIndexObject) -> Result<IndexObject>;

    async fn get_object(&self, id: &str) -> Result<IndexObject>;

    async fn create_trigger(&self, trigger: &NewTrigger) -> Result<Trigger>;

    /// Returns the service's `deleted` flag.
    async fn delete_trigger(&self, id: &str) -> Result<bool>;
}
