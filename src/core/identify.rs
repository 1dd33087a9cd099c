//! Identifier classification
//!
//! Input tokens arrive untagged: a barcode, an HRID, an accession
//! number, or a bare UUID all look like strings. No platform endpoint
//! answers "what kind of id is this", so classification runs local
//! pattern rules first and then walks an ordered list of existence
//! probes against the storage modules, stopping at the first hit. Probe
//! order is a frequency heuristic; reordering changes latency, not
//! results.

use std::collections::HashMap;

use crate::core::client::FolioClient;
use crate::core::config::Config;
use crate::core::error::FolioError;
use crate::records::RecordKind;

/// The identifier kinds the classifier can assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    ItemBarcode,
    ItemId,
    ItemHrid,
    InstanceId,
    InstanceHrid,
    HoldingsId,
    HoldingsHrid,
    Accession,
    LoanId,
    UserId,
    UserBarcode,
    Unresolved,
}

impl IdKind {
    /// The record kind an identifier of this kind names directly.
    pub fn record_kind(self) -> Option<RecordKind> {
        match self {
            IdKind::ItemBarcode | IdKind::ItemId | IdKind::ItemHrid => Some(RecordKind::Item),
            IdKind::InstanceId | IdKind::InstanceHrid | IdKind::Accession => {
                Some(RecordKind::Instance)
            }
            IdKind::HoldingsId | IdKind::HoldingsHrid => Some(RecordKind::Holdings),
            IdKind::LoanId => Some(RecordKind::Loan),
            IdKind::UserId | IdKind::UserBarcode => Some(RecordKind::User),
            IdKind::Unresolved => None,
        }
    }

    pub fn is_item(self) -> bool {
        self.record_kind() == Some(RecordKind::Item)
    }

    pub fn is_user(self) -> bool {
        self.record_kind() == Some(RecordKind::User)
    }
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IdKind::ItemBarcode => "item barcode",
            IdKind::ItemId => "item id",
            IdKind::ItemHrid => "item hrid",
            IdKind::InstanceId => "instance id",
            IdKind::InstanceHrid => "instance hrid",
            IdKind::HoldingsId => "holdings id",
            IdKind::HoldingsHrid => "holdings hrid",
            IdKind::Accession => "accession number",
            IdKind::LoanId => "loan id",
            IdKind::UserId => "user id",
            IdKind::UserBarcode => "user barcode",
            IdKind::Unresolved => "unresolved",
        };
        write!(f, "{}", name)
    }
}

/// One input token plus its classification.
///
/// `canonical` is the form later lookups should use; it differs from
/// `raw` only when a short numeric user barcode resolved after zero
/// padding.
#[derive(Debug, Clone)]
pub struct IdToken {
    pub raw: String,
    pub canonical: String,
    pub kind: IdKind,
}

impl IdToken {
    fn new(raw: &str, kind: IdKind) -> Self {
        Self {
            raw: raw.to_string(),
            canonical: raw.to_string(),
            kind,
        }
    }
}

/// One existence probe in the classification cascade.
pub struct Probe {
    kind: IdKind,
    target: ProbeTarget,
}

enum ProbeTarget {
    /// GET `{endpoint}/{token}`.
    ById(RecordKind),
    /// Count `{endpoint}?query={field}=={token}`.
    ByQuery {
        record: RecordKind,
        field: &'static str,
    },
}

impl Probe {
    pub fn by_id(kind: IdKind, record: RecordKind) -> Self {
        Self {
            kind,
            target: ProbeTarget::ById(record),
        }
    }

    pub fn by_query(kind: IdKind, record: RecordKind, field: &'static str) -> Self {
        Self {
            kind,
            target: ProbeTarget::ByQuery { record, field },
        }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    /// Does a record answering to `token` exist behind this probe?
    /// Network and server faults propagate; they are not "no".
    pub fn run(&self, client: &FolioClient, token: &str) -> Result<bool, FolioError> {
        match &self.target {
            ProbeTarget::ById(record) => {
                let path = format!("{}/{}", record.endpoint(), token);
                Ok(client.fetch_json(&path)?.is_some())
            }
            ProbeTarget::ByQuery { record, field } => {
                let path = format!(
                    "{}?query={}=={}&limit=0",
                    record.endpoint(),
                    field,
                    token
                );
                Ok(client.count_query(&path)? > 0)
            }
        }
    }
}

/// Probe order for UUID-shaped tokens, most common kind first.
fn uuid_probes() -> Vec<Probe> {
    vec![
        Probe::by_id(IdKind::ItemId, RecordKind::Item),
        Probe::by_id(IdKind::InstanceId, RecordKind::Instance),
        Probe::by_id(IdKind::HoldingsId, RecordKind::Holdings),
        Probe::by_id(IdKind::LoanId, RecordKind::Loan),
        Probe::by_id(IdKind::UserId, RecordKind::User),
    ]
}

/// Probe order for short ambiguous tokens.
fn search_probes() -> Vec<Probe> {
    vec![
        Probe::by_query(IdKind::UserBarcode, RecordKind::User, "barcode"),
        Probe::by_query(IdKind::InstanceHrid, RecordKind::Instance, "hrid"),
        Probe::by_query(IdKind::ItemHrid, RecordKind::Item, "hrid"),
        Probe::by_query(IdKind::HoldingsHrid, RecordKind::Holdings, "hrid"),
    ]
}

/// Session-scoped memo of classifications.
///
/// Lives for one batch and never evicts; only successful
/// classifications are stored, so a token that was unreachable once is
/// probed again next time.
#[derive(Debug, Default)]
pub struct ClassifierCache {
    entries: HashMap<String, IdToken>,
}

impl ClassifierCache {
    pub fn get(&self, raw: &str) -> Option<&IdToken> {
        self.entries.get(raw)
    }

    pub fn insert(&mut self, token: IdToken) {
        self.entries.insert(token.raw.clone(), token);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct Classifier<'a> {
    client: &'a FolioClient,
    config: &'a Config,
    cache: ClassifierCache,
    uuid_probes: Vec<Probe>,
    search_probes: Vec<Probe>,
}

impl<'a> Classifier<'a> {
    pub fn new(client: &'a FolioClient, config: &'a Config) -> Self {
        Self {
            client,
            config,
            cache: ClassifierCache::default(),
            uuid_probes: uuid_probes(),
            search_probes: search_probes(),
        }
    }

    /// Classify one token. Total: every token gets exactly one kind,
    /// with `Unresolved` for anything the cascade cannot place.
    pub fn classify(&mut self, raw: &str) -> Result<IdToken, FolioError> {
        if let Some(hit) = self.cache.get(raw) {
            tracing::debug!(token = raw, kind = %hit.kind, "classification cache hit");
            return Ok(hit.clone());
        }

        let token = self.classify_uncached(raw)?;
        tracing::debug!(token = raw, kind = %token.kind, "classified");
        if token.kind != IdKind::Unresolved {
            self.cache.insert(token.clone());
        }
        Ok(token)
    }

    fn classify_uncached(&self, raw: &str) -> Result<IdToken, FolioError> {
        let config = self.config;

        // Local pattern rules, cheapest first.
        if raw.len() > 7
            && raw.chars().all(|c| c.is_ascii_digit())
            && raw.starts_with(&config.item_barcode_prefix)
        {
            return Ok(IdToken::new(raw, IdKind::ItemBarcode));
        }
        if Self::hrid_matches(raw, &config.item_hrid_prefix) {
            return Ok(IdToken::new(raw, IdKind::ItemHrid));
        }
        if Self::hrid_matches(raw, &config.holdings_hrid_prefix) {
            return Ok(IdToken::new(raw, IdKind::HoldingsHrid));
        }
        if raw.starts_with(&config.accession_prefix) && raw.contains('.') {
            return Ok(IdToken::new(raw, IdKind::Accession));
        }

        // A dash means a UUID-shaped token. The storage modules share no
        // id namespace authority, so ask each in turn.
        if raw.contains('-') {
            for probe in &self.uuid_probes {
                if probe.run(self.client, raw)? {
                    return Ok(IdToken::new(raw, probe.kind()));
                }
            }
            return Ok(IdToken::new(raw, IdKind::Unresolved));
        }

        // Short ambiguous token: try the search endpoints.
        for probe in &self.search_probes {
            if probe.run(self.client, raw)? {
                return Ok(IdToken::new(raw, probe.kind()));
            }
            // Patron barcodes are zero-padded to a fixed width; users
            // often type them without the leading zeros.
            if probe.kind() == IdKind::UserBarcode {
                if let Some(padded) = self.padded_barcode(raw) {
                    if probe.run(self.client, &padded)? {
                        return Ok(IdToken {
                            raw: raw.to_string(),
                            canonical: padded,
                            kind: IdKind::UserBarcode,
                        });
                    }
                }
            }
        }
        Ok(IdToken::new(raw, IdKind::Unresolved))
    }

    fn hrid_matches(raw: &str, prefix: &str) -> bool {
        raw.starts_with(prefix)
            && raw[prefix.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
    }

    fn padded_barcode(&self, raw: &str) -> Option<String> {
        let width = self.config.user_barcode_pad_width?;
        if raw.is_empty() || raw.len() >= width || !raw.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(format!("{:0>width$}", raw, width = width))
    }

    pub fn cache(&self) -> &ClassifierCache {
        &self.cache
    }
}

/// Split raw batch input into identifiers: delimiters are newlines,
/// spaces, commas, colons, and semicolons; quote characters are
/// stripped; duplicates are dropped keeping first-seen order.
pub fn unique_identifiers(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for piece in text.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':')) {
        let cleaned: String = piece.chars().filter(|c| !matches!(c, '"' | '\'')).collect();
        if cleaned.is_empty() {
            continue;
        }
        if seen.insert(cleaned.clone()) {
            out.push(cleaned);
        }
    }
    out
}
