//! Repository interfaces for the component catalog
//!
//! Contains trait definitions for data access used by the HTTP API.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::component::{ComponentKind, ComponentRecord};

/// Outcome of a single-row insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[async_trait]
pub trait ComponentRepository: Send + Sync {
    /// All rows of one kind, ordered by name
    async fn list(&self, kind: ComponentKind) -> Result<Vec<ComponentRecord>>;

    /// Rows whose name contains `fragment`, ignoring ASCII case
    async fn search(&self, kind: ComponentKind, fragment: &str) -> Result<Vec<ComponentRecord>>;

    /// Insert unless a row with the same name exists
    async fn create(&self, record: &ComponentRecord) -> Result<InsertOutcome>;

    async fn count(&self, kind: ComponentKind) -> Result<i64>;

    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> Result<()>;
}
