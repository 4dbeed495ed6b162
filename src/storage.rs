use crate::config::DataSource;
use crate::errors::StoreError;
use crate::models::{CallRecord, CallType};
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

/// Which records a report needs. Paths are relative to one entry of `calls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFilter {
    /// At least one call of this type.
    CallType(CallType),
    /// At least one call where the dotted path exists (null counts as existing).
    CallFieldExists(&'static str),
}

impl CallFilter {
    pub fn to_document(self) -> Document {
        match self {
            CallFilter::CallType(call_type) => doc! { "calls.type_call": call_type.as_str() },
            CallFilter::CallFieldExists(path) => {
                let mut filter = Document::new();
                filter.insert(format!("calls.{path}"), doc! { "$exists": true });
                filter
            }
        }
    }

    pub fn matches(self, document: &Value) -> bool {
        match self {
            CallFilter::CallType(call_type) => any_at(document, &["calls", "type_call"], &|value: &Value| {
                value.as_str() == Some(call_type.as_str())
            }),
            CallFilter::CallFieldExists(path) => {
                let mut segments = vec!["calls"];
                segments.extend(path.split('.'));
                any_at(document, &segments, &|_: &Value| true)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub filter: CallFilter,
    pub projection: &'static [&'static str],
}

impl Query {
    pub const fn new(filter: CallFilter, projection: &'static [&'static str]) -> Self {
        Self { filter, projection }
    }

    pub fn projection_document(&self) -> Document {
        let mut projection = Document::new();
        for path in self.projection {
            projection.insert(*path, 1);
        }
        projection
    }
}

/// Walks `segments` into `value`, fanning out over arrays the way MongoDB
/// resolves dotted paths, and reports whether any reached value satisfies
/// `predicate`.
fn any_at(value: &Value, segments: &[&str], predicate: &dyn Fn(&Value) -> bool) -> bool {
    match segments.split_first() {
        None => match value {
            Value::Array(items) => predicate(value) || items.iter().any(|item| predicate(item)),
            _ => predicate(value),
        },
        Some((head, rest)) => match value {
            Value::Object(map) => map
                .get(*head)
                .is_some_and(|child| any_at(child, rest, predicate)),
            Value::Array(items) => items.iter().any(|item| any_at(item, segments, predicate)),
            _ => false,
        },
    }
}

#[derive(Debug, Default)]
struct ProjectionTree {
    children: BTreeMap<String, ProjectionNode>,
}

#[derive(Debug)]
enum ProjectionNode {
    Keep,
    Nested(ProjectionTree),
}

impl ProjectionTree {
    fn from_paths(paths: &[&str]) -> Self {
        let mut tree = Self::default();
        for path in paths {
            let segments: Vec<&str> = path.split('.').filter(|segment| !segment.is_empty()).collect();
            tree.insert(&segments);
        }
        tree
    }

    fn insert(&mut self, segments: &[&str]) {
        let Some((head, rest)) = segments.split_first() else {
            return;
        };
        if rest.is_empty() {
            self.children.insert(head.to_string(), ProjectionNode::Keep);
            return;
        }
        let node = self
            .children
            .entry(head.to_string())
            .or_insert_with(|| ProjectionNode::Nested(Self::default()));
        if let ProjectionNode::Nested(subtree) = node {
            subtree.insert(rest);
        }
    }

    fn apply(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Object(map) => {
                let mut projected = Map::new();
                for (key, node) in &self.children {
                    let Some(child) = map.get(key) else {
                        continue;
                    };
                    match node {
                        ProjectionNode::Keep => {
                            projected.insert(key.clone(), child.clone());
                        }
                        ProjectionNode::Nested(subtree) => {
                            if let Some(inner) = subtree.apply(child) {
                                projected.insert(key.clone(), inner);
                            }
                        }
                    }
                }
                Some(Value::Object(projected))
            }
            Value::Array(items) => Some(Value::Array(
                items.iter().filter_map(|item| self.apply(item)).collect(),
            )),
            _ => None,
        }
    }
}

pub fn project(document: &Value, paths: &[&str]) -> Value {
    ProjectionTree::from_paths(paths)
        .apply(document)
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// Decodes raw documents, skipping the ones that don't look like call records.
pub fn decode_records(documents: Vec<Value>) -> Vec<CallRecord> {
    let mut records = Vec::with_capacity(documents.len());
    for (index, document) in documents.into_iter().enumerate() {
        match serde_json::from_value::<CallRecord>(document) {
            Ok(record) => records.push(record),
            Err(err) => warn!("skipping malformed call document #{index}: {err}"),
        }
    }
    records
}

/// Parses a JSON array of documents, or one document per line otherwise.
pub fn parse_documents(bytes: &[u8]) -> Result<Vec<Value>, StoreError> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut documents = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(document) => documents.push(document),
            Err(err) => warn!("skipping unparseable line {}: {err}", line_no + 1),
        }
    }
    Ok(documents)
}

/// The `call_information` collection. Opened once at startup and shared by
/// every request.
pub enum CallStore {
    File(FileStore),
    Mongo(MongoStore),
}

impl CallStore {
    pub async fn connect(source: &DataSource) -> Result<Self, StoreError> {
        match source {
            DataSource::File(path) => Ok(CallStore::File(FileStore::new(path.clone()))),
            DataSource::Mongo {
                uri,
                database,
                collection,
            } => Ok(CallStore::Mongo(
                MongoStore::connect(uri, database, collection).await?,
            )),
        }
    }

    pub async fn find(&self, query: &Query) -> Result<Vec<CallRecord>, StoreError> {
        let documents = match self {
            CallStore::File(store) => store.find_documents(query).await?,
            CallStore::Mongo(store) => store.find_documents(query).await?,
        };
        debug!(filter = ?query.filter, documents = documents.len(), "call query");
        Ok(decode_records(documents))
    }
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Re-reads the file on every query so external ingestion shows up
    /// without a restart.
    pub async fn find_documents(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("call data file {} not found; treating it as empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        Ok(parse_documents(&bytes)?
            .iter()
            .filter(|document| query.filter.matches(document))
            .map(|document| project(document, query.projection))
            .collect())
    }
}

pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        info!("using mongodb collection {database}.{collection}");
        Ok(Self {
            collection: client.database(database).collection(collection),
        })
    }

    pub async fn find_documents(&self, query: &Query) -> Result<Vec<Value>, StoreError> {
        let mut cursor = self
            .collection
            .find(query.filter.to_document())
            .projection(query.projection_document())
            .await?;

        let mut documents = Vec::new();
        while cursor.advance().await? {
            match cursor.deserialize_current() {
                Ok(document) => documents.push(Bson::Document(document).into_relaxed_extjson()),
                Err(err) => warn!("skipping undecodable mongodb document: {err}"),
            }
        }
        Ok(documents)
    }
}
