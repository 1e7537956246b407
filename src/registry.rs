//! Classification registries.
//!
//! A registry maps canonical petal signatures to small integer class IDs,
//! assigned monotonically from zero and never reused. Lookup is a two-call
//! protocol: `query_id` either hits, or parks the missed signature so that
//! a following `register` can bind it to the next free ID. Backends share
//! that protocol and differ only in durability: in-memory (volatile), a
//! CSV file (durable across runs), or a remote service.

use crate::canon::{Canonize, Signature};
use crate::{ClassId, PetalGraph};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("register() without a preceding query miss")]
    NothingPending,
    #[error("Registry file {path}: {source}")]
    Table {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("Registry file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Registry file {path}, row {row}: {reason}")]
    MalformedRow {
        path: String,
        row: usize,
        reason: String,
    },
    #[error("Registry location {0:?} needs the http-registry feature")]
    UnsupportedBackend(String),
    #[cfg(feature = "http-registry")]
    #[error("Registry service: {0}")]
    Service(#[from] reqwest::Error),
}

pub trait Registry {
    /// Looks the graph's signature up. A miss returns `None` and parks the
    /// signature for `register`.
    fn query_id(&mut self, graph: &PetalGraph) -> Result<Option<ClassId>, RegistryError>;

    /// Binds the signature parked by the last missed query to the next
    /// class ID.
    fn register(&mut self) -> Result<ClassId, RegistryError>;
}

/// Picks a backend from the configured location: none at all means a
/// volatile in-memory registry, an `http...` location a remote service,
/// anything else a CSV file path.
pub fn open_registry(database: Option<&str>) -> Result<Box<dyn Registry>, RegistryError> {
    match database {
        None => {
            info!("Using temporary registry (volatile)");
            Ok(Box::new(MemoryRegistry::new()))
        }
        Some(location) if location.starts_with("http") => open_service(location),
        Some(path) => {
            info!("Using registry file {}", path);
            Ok(Box::new(CsvRegistry::open(path)?))
        }
    }
}

#[cfg(feature = "http-registry")]
fn open_service(location: &str) -> Result<Box<dyn Registry>, RegistryError> {
    info!("Using registry service at {}", location);
    Ok(Box::new(HttpRegistry::connect(location)))
}

#[cfg(not(feature = "http-registry"))]
fn open_service(location: &str) -> Result<Box<dyn Registry>, RegistryError> {
    Err(RegistryError::UnsupportedBackend(location.to_string()))
}

/// Classifies every petal: ascending node order, query, register on a
/// miss. Registration order is therefore as deterministic as the petals.
pub fn classify(
    subgraphs: &BTreeMap<usize, PetalGraph>,
    registry: &mut dyn Registry,
) -> Result<BTreeMap<usize, ClassId>, RegistryError> {
    let mut ids = BTreeMap::new();
    for (&node, graph) in subgraphs {
        let id = match registry.query_id(graph)? {
            Some(id) => id,
            None => {
                let id = registry.register()?;
                info!("New petal type {}", id);
                id
            }
        };
        ids.insert(node, id);
    }
    Ok(ids)
}

// ---------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRegistry {
    ids: BTreeMap<Signature, ClassId>,
    next: ClassId,
    pending: Option<Signature>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts a signature from persistent storage. IDs keep counting from
    /// one past the largest seen.
    fn seed(&mut self, signature: Signature, id: ClassId) {
        self.next = self.next.max(id + 1);
        self.ids.insert(signature, id);
    }
}

impl Registry for MemoryRegistry {
    fn query_id(&mut self, graph: &PetalGraph) -> Result<Option<ClassId>, RegistryError> {
        let signature = graph.canonical_signature();
        match self.ids.get(&signature) {
            Some(&id) => {
                self.pending = None;
                Ok(Some(id))
            }
            None => {
                self.pending = Some(signature);
                Ok(None)
            }
        }
    }

    fn register(&mut self) -> Result<ClassId, RegistryError> {
        let signature = self.pending.take().ok_or(RegistryError::NothingPending)?;
        let id = self.next;
        self.next += 1;
        self.ids.insert(signature, id);
        Ok(id)
    }
}

// ---------------------------------------------------------------------
// CSV-file backend
// ---------------------------------------------------------------------

const FILE_HEADER: [&str; 2] = ["signature", "id"];

/// Durable registry: the whole table loads at open, every registration
/// appends one row and flushes, so a run that dies keeps what it named.
pub struct CsvRegistry {
    memory: MemoryRegistry,
    writer: csv::Writer<std::fs::File>,
    path: String,
}

impl CsvRegistry {
    pub fn open(path: &str) -> Result<Self, RegistryError> {
        let mut memory = MemoryRegistry::new();
        let create = !Path::new(path).is_file();
        if create {
            info!("Creating new registry file {}", path);
        } else {
            for (signature, id) in load_rows(path)? {
                memory.seed(signature, id);
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| RegistryError::Io {
                path: path.to_string(),
                source,
            })?;
        let mut writer = csv::Writer::from_writer(file);
        if create {
            write_row(&mut writer, path, &FILE_HEADER)?;
        }
        Ok(Self {
            memory,
            writer,
            path: path.to_string(),
        })
    }
}

impl Registry for CsvRegistry {
    fn query_id(&mut self, graph: &PetalGraph) -> Result<Option<ClassId>, RegistryError> {
        self.memory.query_id(graph)
    }

    fn register(&mut self) -> Result<ClassId, RegistryError> {
        let signature = self
            .memory
            .pending
            .clone()
            .ok_or(RegistryError::NothingPending)?;
        let id = self.memory.register()?;
        let row = [signature, id.to_string()];
        write_row(&mut self.writer, &self.path, &row)?;
        Ok(id)
    }
}

fn write_row<W: std::io::Write, S: AsRef<[u8]>>(
    writer: &mut csv::Writer<W>,
    path: &str,
    row: &[S],
) -> Result<(), RegistryError> {
    writer
        .write_record(row)
        .and_then(|_| writer.flush().map_err(csv::Error::from))
        .map_err(|source| RegistryError::Table {
            path: path.to_string(),
            source,
        })
}

/// Reads a registry file back as (signature, id) rows, in file order.
/// Also used by the dump tool.
pub fn load_rows(path: &str) -> Result<Vec<(Signature, ClassId)>, RegistryError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|source| RegistryError::Table {
            path: path.to_string(),
            source,
        })?;
    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|source| RegistryError::Table {
            path: path.to_string(),
            source,
        })?;
        let malformed = |reason: &str| RegistryError::MalformedRow {
            path: path.to_string(),
            row: i + 1,
            reason: reason.to_string(),
        };
        let signature = record.get(0).ok_or_else(|| malformed("missing signature"))?;
        let id: ClassId = record
            .get(1)
            .ok_or_else(|| malformed("missing id"))?
            .parse()
            .map_err(|_| malformed("id is not an integer"))?;
        rows.push((signature.to_string(), id));
    }
    Ok(rows)
}

// ---------------------------------------------------------------------
// Remote backend
// ---------------------------------------------------------------------

#[cfg(feature = "http-registry")]
mod http {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    struct SignatureBody<'a> {
        signature: &'a str,
    }

    #[derive(Deserialize)]
    struct QueryReply {
        id: Option<ClassId>,
    }

    #[derive(Deserialize)]
    struct RegisterReply {
        id: ClassId,
    }

    /// Shared registry behind an HTTP service; the service owns ID
    /// assignment, this client only keeps the pending signature.
    pub struct HttpRegistry {
        base: String,
        client: reqwest::blocking::Client,
        pending: Option<Signature>,
    }

    impl HttpRegistry {
        pub fn connect(base: &str) -> Self {
            Self {
                base: base.trim_end_matches('/').to_string(),
                client: reqwest::blocking::Client::new(),
                pending: None,
            }
        }
    }

    impl Registry for HttpRegistry {
        fn query_id(&mut self, graph: &PetalGraph) -> Result<Option<ClassId>, RegistryError> {
            let signature = graph.canonical_signature();
            let reply: QueryReply = self
                .client
                .post(format!("{}/query", self.base))
                .json(&SignatureBody {
                    signature: &signature,
                })
                .send()?
                .error_for_status()?
                .json()?;
            match reply.id {
                Some(id) => {
                    self.pending = None;
                    Ok(Some(id))
                }
                None => {
                    self.pending = Some(signature);
                    Ok(None)
                }
            }
        }

        fn register(&mut self) -> Result<ClassId, RegistryError> {
            let signature = self.pending.take().ok_or(RegistryError::NothingPending)?;
            let reply: RegisterReply = self
                .client
                .post(format!("{}/register", self.base))
                .json(&SignatureBody {
                    signature: &signature,
                })
                .send()?
                .error_for_status()?
                .json()?;
            Ok(reply.id)
        }
    }
}

#[cfg(feature = "http-registry")]
pub use http::HttpRegistry;
