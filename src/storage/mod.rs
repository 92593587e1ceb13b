//! Persistence sink for ingested datasets
//!
//! Datasets are written into a key-tree database: a path addresses a node,
//! `set` replaces the node, `push` appends a child under a generated id and
//! `remove` drops the node with everything below it.

pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};

pub use rest::RestTreeSink;

/// Key-tree writer
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Drop the node at `path` and all its children
    async fn remove(&self, path: &str) -> Result<()>;

    /// Replace the node at `path`
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Append `record` under `path`, returning the generated child id
    async fn push(&self, path: &str, record: Value) -> Result<String>;

    /// Release the connection; later calls fail
    async fn close(&self) -> Result<()>;
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Database root URL; records stay in memory when absent
    pub url: Option<String>,
    /// Token sent as the `auth` query parameter
    pub auth: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: None,
            auth: None,
            timeout_secs: 30,
        }
    }
}

/// Split a tree path into its non-empty segments
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// In-process key tree
pub struct MemorySink {
    root: Mutex<Value>,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(Value::Object(Map::new())),
            closed: AtomicBool::new(false),
        }
    }

    /// Snapshot of the node at `path`
    pub fn get(&self, path: &str) -> Option<Value> {
        let root = self.root.lock().unwrap_or_else(|e| e.into_inner());
        let mut node = &*root;
        for segment in path_segments(path) {
            node = node.get(segment)?;
        }
        Some(node.clone())
    }

    /// Number of children at `path`
    pub fn child_count(&self, path: &str) -> usize {
        self.get(path)
            .and_then(|v| v.as_object().map(Map::len))
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::sink("sink is closed"))
        } else {
            Ok(())
        }
    }

    fn write(&self, path: &str, value: Value) {
        let mut root = self.root.lock().unwrap_or_else(|e| e.into_inner());
        let segments = path_segments(path);

        let Some((leaf, parents)) = segments.split_last() else {
            *root = value;
            return;
        };

        let mut node = &mut *root;
        for segment in parents {
            let Some(map) = as_object(node) else { return };
            node = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if let Some(map) = as_object(node) {
            map.insert(leaf.to_string(), value);
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a leaf into an empty object so children can be added below it
fn as_object(node: &mut Value) -> Option<&mut Map<String, Value>> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut()
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn remove(&self, path: &str) -> Result<()> {
        self.ensure_open()?;

        let mut root = self.root.lock().unwrap_or_else(|e| e.into_inner());
        let segments = path_segments(path);
        let Some((leaf, parents)) = segments.split_last() else {
            *root = Value::Object(Map::new());
            return Ok(());
        };

        let mut node = &mut *root;
        for segment in parents {
            match node.get_mut(*segment) {
                Some(child) => node = child,
                None => return Ok(()),
            }
        }
        if let Some(obj) = node.as_object_mut() {
            obj.remove(*leaf);
        }
        Ok(())
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.ensure_open()?;
        self.write(path, value);
        Ok(())
    }

    async fn push(&self, path: &str, record: Value) -> Result<String> {
        self.ensure_open()?;
        let id = uuid::Uuid::new_v4().simple().to_string();
        let child = format!("{}/{id}", path.trim_end_matches('/'));
        self.write(&child, record);
        Ok(id)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
