//! In-memory platform used by unit tests
//!
//! Implements `Transport` over a handful of maps, with just enough of
//! the storage modules' behavior to exercise endpoint construction:
//! get-by-id, `query=field==value` with `limit`, create with assigned
//! ids, update, delete, and the instance source-record companion.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};

use crate::core::error::FolioError;
use crate::core::transport::{Method, Reply, Transport};
use crate::records::RecordKind;

const KINDS: [RecordKind; 5] = [
    RecordKind::Instance,
    RecordKind::Holdings,
    RecordKind::Item,
    RecordKind::Loan,
    RecordKind::User,
];

#[derive(Default)]
struct State {
    records: BTreeMap<&'static str, BTreeMap<String, Value>>,
    source_records: HashSet<String>,
    log: Vec<(Method, String)>,
    failures: Vec<(String, u16)>,
    reject_auth: bool,
    next_id: u32,
}

/// Cloneable handle to one fake platform; clones share state, so a test
/// can hand one clone to the client and keep another for inspection.
#[derive(Clone, Default)]
pub struct FakeFolio {
    state: Arc<Mutex<State>>,
}

impl FakeFolio {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a record body. The body must carry an `id`.
    pub fn insert(&self, kind: RecordKind, body: Value) -> String {
        let id = body["id"].as_str().expect("record body needs an id").to_string();
        self.lock()
            .records
            .entry(kind.endpoint())
            .or_default()
            .insert(id.clone(), body);
        id
    }

    /// Mark an instance as having a source-record-storage entry.
    pub fn add_source_record(&self, instance_id: &str) {
        self.lock().source_records.insert(instance_id.to_string());
    }

    pub fn has_source_record(&self, instance_id: &str) -> bool {
        self.lock().source_records.contains(instance_id)
    }

    pub fn get(&self, kind: RecordKind, id: &str) -> Option<Value> {
        self.lock()
            .records
            .get(kind.endpoint())
            .and_then(|records| records.get(id))
            .cloned()
    }

    pub fn count(&self, kind: RecordKind) -> usize {
        self.lock()
            .records
            .get(kind.endpoint())
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Fail any request whose path starts with `prefix`.
    pub fn fail_with(&self, prefix: &str, status: u16) {
        self.lock().failures.push((prefix.to_string(), status));
    }

    /// Reject every request as the transport would after a 401.
    pub fn reject_auth(&self) {
        self.lock().reject_auth = true;
    }

    pub fn request_count(&self) -> usize {
        self.lock().log.len()
    }

    pub fn requests_matching(&self, fragment: &str) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|(_, path)| path.contains(fragment))
            .count()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|(method, _)| method.is_mutating())
            .count()
    }

    fn kind_for(path: &str) -> Option<RecordKind> {
        KINDS
            .into_iter()
            .find(|kind| {
                let endpoint = kind.endpoint();
                path == endpoint
                    || path.starts_with(&format!("{}/", endpoint))
                    || path.starts_with(&format!("{}?", endpoint))
            })
    }

    fn handle(&self, method: Method, path: &str, body: Option<&Value>) -> Reply {
        // Companion resource: an instance's source record.
        if let Some(rest) = path.strip_prefix("/instance-storage/instances/") {
            if let Some(instance_id) = rest.strip_suffix("/source-record") {
                if method == Method::Delete {
                    let removed = self.lock().source_records.remove(instance_id);
                    let status = if removed { 204 } else { 404 };
                    return Reply { status, body: String::new() };
                }
            }
        }

        let Some(kind) = Self::kind_for(path) else {
            return Reply { status: 404, body: "unknown endpoint".into() };
        };
        let endpoint = kind.endpoint();

        match method {
            Method::Get => {
                if let Some(query_part) = path.splitn(2, '?').nth(1) {
                    self.handle_query(kind, query_part)
                } else {
                    let id = path.trim_start_matches(&format!("{}/", endpoint));
                    match self.get(kind, id) {
                        Some(record) => Reply { status: 200, body: record.to_string() },
                        None => Reply { status: 404, body: String::new() },
                    }
                }
            }
            Method::Post => {
                let Some(body) = body else {
                    return Reply { status: 400, body: "missing body".into() };
                };
                let mut record = body.clone();
                let id = {
                    let mut state = self.lock();
                    state.next_id += 1;
                    format!("00000000-0000-4000-8000-{:012}", state.next_id)
                };
                record["id"] = json!(id);
                self.insert(kind, record.clone());
                Reply { status: 201, body: record.to_string() }
            }
            Method::Put => {
                let id = path.trim_start_matches(&format!("{}/", endpoint)).to_string();
                let Some(body) = body else {
                    return Reply { status: 400, body: "missing body".into() };
                };
                let mut state = self.lock();
                let records = state.records.entry(endpoint).or_default();
                if records.contains_key(&id) {
                    records.insert(id, body.clone());
                    Reply { status: 204, body: String::new() }
                } else {
                    Reply { status: 404, body: String::new() }
                }
            }
            Method::Delete => {
                let id = path.trim_start_matches(&format!("{}/", endpoint)).to_string();
                let mut state = self.lock();
                let removed = state
                    .records
                    .entry(endpoint)
                    .or_default()
                    .remove(&id)
                    .is_some();
                let status = if removed { 204 } else { 404 };
                Reply { status, body: String::new() }
            }
        }
    }

    fn handle_query(&self, kind: RecordKind, query_part: &str) -> Reply {
        let mut query: Option<(String, String)> = None;
        let mut limit: usize = 10;
        for param in query_part.split('&') {
            if let Some(value) = param.strip_prefix("query=") {
                if let Some((field, value)) = value.split_once("==") {
                    query = Some((field.to_string(), value.to_string()));
                } else {
                    // A query we cannot interpret matches nothing.
                    query = Some(("id".to_string(), "\u{0}".to_string()));
                }
            } else if let Some(value) = param.strip_prefix("limit=") {
                limit = value.parse().unwrap_or(10);
            }
        }

        let state = self.lock();
        let records = state.records.get(kind.endpoint());
        let matched: Vec<&Value> = match (&query, records) {
            (Some((field, value)), Some(records)) => records
                .values()
                .filter(|record| record.get(field).and_then(Value::as_str) == Some(value))
                .collect(),
            (None, Some(records)) => records.values().collect(),
            (_, None) => Vec::new(),
        };

        let total = matched.len();
        let page: Vec<Value> = matched.into_iter().take(limit).cloned().collect();
        let body = json!({
            kind.list_key(): page,
            "totalRecords": total,
        });
        Reply { status: 200, body: body.to_string() }
    }
}

impl Transport for FakeFolio {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Reply, FolioError> {
        {
            let mut state = self.lock();
            state.log.push((method, path.to_string()));
            if state.reject_auth {
                return Err(FolioError::AuthExpired);
            }
            if let Some((_, status)) = state
                .failures
                .iter()
                .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            {
                return Ok(Reply { status: *status, body: "simulated failure".into() });
            }
        }
        Ok(self.handle(method, path, body))
    }
}

/// Seed a small two-instance library used by several test modules.
///
/// Instance `inst-1` has holdings `h-1` (loc-a: items i-1, i-2) and
/// `h-2` (loc-b: item i-3). Instance `inst-2` has holdings `h-3`
/// (loc-a: item i-4). User `u-1` has an open loan `loan-1` on i-1.
pub fn seed_library(fake: &FakeFolio) {
    fake.insert(
        RecordKind::Instance,
        json!({"id": "inst-1", "hrid": "in00000001", "title": "A History of Shelving"}),
    );
    fake.insert(
        RecordKind::Instance,
        json!({"id": "inst-2", "hrid": "in00000002", "title": "Moving Day"}),
    );
    fake.insert(
        RecordKind::Holdings,
        json!({"id": "h-1", "hrid": "ho00000001", "instanceId": "inst-1",
               "permanentLocationId": "loc-a", "callNumber": "Z679"}),
    );
    fake.insert(
        RecordKind::Holdings,
        json!({"id": "h-2", "hrid": "ho00000002", "instanceId": "inst-1",
               "permanentLocationId": "loc-b", "callNumber": "Z679"}),
    );
    fake.insert(
        RecordKind::Holdings,
        json!({"id": "h-3", "hrid": "ho00000003", "instanceId": "inst-2",
               "permanentLocationId": "loc-a"}),
    );
    fake.insert(
        RecordKind::Item,
        json!({"id": "i-1", "hrid": "it00000001", "barcode": "35047000000017",
               "holdingsRecordId": "h-1", "permanentLocationId": "loc-a"}),
    );
    fake.insert(
        RecordKind::Item,
        json!({"id": "i-2", "hrid": "it00000002", "barcode": "35047000000025",
               "holdingsRecordId": "h-1", "permanentLocationId": "loc-a"}),
    );
    fake.insert(
        RecordKind::Item,
        json!({"id": "i-3", "hrid": "it00000003", "barcode": "35047000000033",
               "holdingsRecordId": "h-2", "permanentLocationId": "loc-b"}),
    );
    fake.insert(
        RecordKind::Item,
        json!({"id": "i-4", "hrid": "it00000004", "barcode": "35047000000041",
               "holdingsRecordId": "h-3", "permanentLocationId": "loc-a"}),
    );
    fake.insert(
        RecordKind::User,
        json!({"id": "u-1", "barcode": "0012345", "username": "reader1"}),
    );
    fake.insert(
        RecordKind::Loan,
        json!({"id": "loan-1", "itemId": "i-1", "userId": "u-1",
               "status": {"name": "Open"}}),
    );
}
