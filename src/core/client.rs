//! Platform client
//!
//! One endpoint family per record kind, each supporting get-by-id,
//! query-by-field, create, update, and delete. This layer turns raw
//! replies into `Option`/`Vec`/unit results and maps status codes onto
//! the error taxonomy; everything above it works with records, not HTTP.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::auth::StaticToken;
use crate::core::config::Config;
use crate::core::error::FolioError;
use crate::core::transport::{Method, OkapiTransport, Transport};
use crate::records::{Holdings, Instance, Item, Loan, RecordKind, User};

/// Page size for query endpoints. The platform defaults to 10 results
/// per query, which silently truncates large record sets.
const QUERY_LIMIT: u32 = 10000;

impl RecordKind {
    /// Storage endpoint family for this record kind.
    pub fn endpoint(self) -> &'static str {
        match self {
            RecordKind::Item => "/item-storage/items",
            RecordKind::Holdings => "/holdings-storage/holdings",
            RecordKind::Instance => "/instance-storage/instances",
            RecordKind::Loan => "/loan-storage/loans",
            RecordKind::User => "/users",
        }
    }

    /// JSON key of the record array in this family's query responses.
    pub fn list_key(self) -> &'static str {
        match self {
            RecordKind::Item => "items",
            RecordKind::Holdings => "holdingsRecords",
            RecordKind::Instance => "instances",
            RecordKind::Loan => "loans",
            RecordKind::User => "users",
        }
    }
}

pub struct FolioClient {
    transport: Box<dyn Transport>,
}

impl FolioClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build a client over the production transport from configuration.
    pub fn from_config(config: &Config) -> Result<Self, FolioError> {
        config.require_connection()?;
        let token = config.token.clone().ok_or(FolioError::AuthExpired)?;
        let transport = OkapiTransport::new(
            config.okapi_url.clone(),
            config.tenant.clone(),
            Box::new(StaticToken::new(token)),
        )?;
        Ok(Self::new(Box::new(transport)))
    }

    // ---------------------------------------------------------------
    // Raw JSON layer
    // ---------------------------------------------------------------

    /// GET a single record body. `None` for anything the platform
    /// reports as absent or unaddressable (404, or 400 for a token that
    /// is not a well-formed UUID).
    pub fn fetch_json(&self, path: &str) -> Result<Option<Value>, FolioError> {
        let reply = self.transport.request(Method::Get, path, None)?;
        match reply.status {
            200 => Ok(Some(serde_json::from_str(&reply.body)?)),
            400 | 404 => Ok(None),
            status => Err(FolioError::Server { status, path: path.to_string() }),
        }
    }

    /// Run a query endpoint and return the record array under `key`.
    pub fn list_query(&self, path: &str, key: &str) -> Result<Vec<Value>, FolioError> {
        let reply = self.transport.request(Method::Get, path, None)?;
        match reply.status {
            200 => {
                let body: Value = serde_json::from_str(&reply.body)?;
                match body.get(key) {
                    Some(Value::Array(records)) => Ok(records.clone()),
                    _ => Ok(Vec::new()),
                }
            }
            400 | 404 => Ok(Vec::new()),
            status => Err(FolioError::Server { status, path: path.to_string() }),
        }
    }

    /// Run a query endpoint with `limit=0` and return `totalRecords`.
    /// This is the cheapest existence test the platform offers.
    pub fn count_query(&self, path: &str) -> Result<u64, FolioError> {
        let reply = self.transport.request(Method::Get, path, None)?;
        match reply.status {
            200 => {
                let body: Value = serde_json::from_str(&reply.body)?;
                Ok(body
                    .get("totalRecords")
                    .and_then(Value::as_u64)
                    .unwrap_or(0))
            }
            400 | 404 => Ok(0),
            status => Err(FolioError::Server { status, path: path.to_string() }),
        }
    }

    pub fn create(&self, kind: RecordKind, body: &Value) -> Result<Value, FolioError> {
        let path = kind.endpoint();
        let reply = self.transport.request(Method::Post, path, Some(body))?;
        match reply.status {
            200 | 201 => Ok(serde_json::from_str(&reply.body)?),
            status => Err(FolioError::Server { status, path: path.to_string() }),
        }
    }

    pub fn update(&self, kind: RecordKind, id: &str, body: &Value) -> Result<(), FolioError> {
        let path = format!("{}/{}", kind.endpoint(), id);
        let reply = self.transport.request(Method::Put, &path, Some(body))?;
        match reply.status {
            200 | 204 => Ok(()),
            404 => Err(FolioError::NotFound(format!("{} {}", kind, id))),
            status => Err(FolioError::Server { status, path }),
        }
    }

    pub fn delete(&self, kind: RecordKind, id: &str) -> Result<(), FolioError> {
        let path = format!("{}/{}", kind.endpoint(), id);
        self.delete_path(&path)
    }

    /// DELETE an arbitrary path. Used for companion resources that hang
    /// off a record, such as an instance's source record.
    pub fn delete_path(&self, path: &str) -> Result<(), FolioError> {
        let reply = self.transport.request(Method::Delete, path, None)?;
        match reply.status {
            200 | 204 => Ok(()),
            404 => Err(FolioError::NotFound(path.to_string())),
            status => Err(FolioError::Server { status, path: path.to_string() }),
        }
    }

    // ---------------------------------------------------------------
    // Typed layer
    // ---------------------------------------------------------------

    fn get_record<T: DeserializeOwned>(
        &self,
        kind: RecordKind,
        id: &str,
    ) -> Result<Option<T>, FolioError> {
        let path = format!("{}/{}", kind.endpoint(), id);
        match self.fetch_json(&path)? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    fn query_records<T: DeserializeOwned>(
        &self,
        kind: RecordKind,
        query: &str,
    ) -> Result<Vec<T>, FolioError> {
        let path = format!(
            "{}?query={}&limit={}",
            kind.endpoint(),
            query,
            QUERY_LIMIT
        );
        self.list_query(&path, kind.list_key())?
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(FolioError::from))
            .collect()
    }

    pub fn item(&self, id: &str) -> Result<Option<Item>, FolioError> {
        self.get_record(RecordKind::Item, id)
    }

    pub fn holdings(&self, id: &str) -> Result<Option<Holdings>, FolioError> {
        self.get_record(RecordKind::Holdings, id)
    }

    pub fn instance(&self, id: &str) -> Result<Option<Instance>, FolioError> {
        self.get_record(RecordKind::Instance, id)
    }

    pub fn loan(&self, id: &str) -> Result<Option<Loan>, FolioError> {
        self.get_record(RecordKind::Loan, id)
    }

    pub fn user(&self, id: &str) -> Result<Option<User>, FolioError> {
        self.get_record(RecordKind::User, id)
    }

    /// Items matching `field == value`.
    pub fn items_where(&self, field: &str, value: &str) -> Result<Vec<Item>, FolioError> {
        self.query_records(RecordKind::Item, &format!("{}=={}", field, value))
    }

    pub fn holdings_where(&self, field: &str, value: &str) -> Result<Vec<Holdings>, FolioError> {
        self.query_records(RecordKind::Holdings, &format!("{}=={}", field, value))
    }

    pub fn instances_where(&self, field: &str, value: &str) -> Result<Vec<Instance>, FolioError> {
        self.query_records(RecordKind::Instance, &format!("{}=={}", field, value))
    }

    pub fn loans_where(&self, field: &str, value: &str) -> Result<Vec<Loan>, FolioError> {
        self.query_records(RecordKind::Loan, &format!("{}=={}", field, value))
    }

    pub fn users_where(&self, field: &str, value: &str) -> Result<Vec<User>, FolioError> {
        self.query_records(RecordKind::User, &format!("{}=={}", field, value))
    }

    /// Number of items referencing a holdings record. Used both for
    /// orphan detection and as the guard before a holdings deletion.
    pub fn item_count_for_holdings(&self, holdings_id: &str) -> Result<u64, FolioError> {
        self.count_query(&format!(
            "{}?query=holdingsRecordId=={}&limit=0",
            RecordKind::Item.endpoint(),
            holdings_id
        ))
    }

    /// Cheap authenticated request proving URL, tenant, and token work.
    pub fn check_credentials(&self) -> Result<(), FolioError> {
        let path = format!("{}?limit=0", RecordKind::Instance.endpoint());
        self.count_query(&path).map(|_| ())
    }
}
