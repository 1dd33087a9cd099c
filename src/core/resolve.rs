//! Cross-record traversal
//!
//! Answers "give me records of kind X starting from an identifier of
//! kind Y" over the fixed graph instance - holdings - item - loan -
//! user. Each hop is a storage-module call; where the platform has no
//! direct query for a pair, resolution goes through the intermediate
//! record. Traversals that fan out through a user's loans are unbounded
//! in call count; callers can restrict them to open loans.

use serde_json::Value;

use crate::core::client::FolioClient;
use crate::core::error::FolioError;
use crate::core::identify::{IdKind, IdToken};
use crate::records::{Holdings, Instance, Item, Loan, RecordKind, User};

#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    /// Follow open loans only when fanning out from a user or down to
    /// loans. The clean operation turns this off to see history.
    pub open_loans_only: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            open_loans_only: true,
        }
    }
}

/// Instance UUID encoded in an accession number: everything after the
/// first dot, with the remaining dots standing in for dashes.
pub fn instance_id_from_accession(accession: &str) -> Option<String> {
    let (_, id_part) = accession.split_once('.')?;
    if id_part.is_empty() {
        return None;
    }
    Some(id_part.replace('.', "-"))
}

pub struct Navigator<'a> {
    client: &'a FolioClient,
}

impl<'a> Navigator<'a> {
    pub fn new(client: &'a FolioClient) -> Self {
        Self { client }
    }

    /// Resolve a classified token to records of `target`, as raw record
    /// bodies. Result order follows the platform's listing order along
    /// the traversal; an empty result means "nothing found", which the
    /// caller reports per identifier rather than as a failure.
    pub fn related_records(
        &self,
        token: &IdToken,
        target: RecordKind,
        options: &ResolveOptions,
    ) -> Result<Vec<Value>, FolioError> {
        let id = token.canonical.as_str();
        let kind = token.kind;
        match target {
            RecordKind::Item => to_values(self.items_for(id, kind, options)?),
            RecordKind::Holdings => to_values(self.holdings_for(id, kind, options)?),
            RecordKind::Instance => to_values(self.instances_for(id, kind, options)?),
            RecordKind::Loan => to_values(self.loans_for(id, kind, options)?),
            RecordKind::User => to_values(self.users_for(id, kind, options)?),
        }
    }

    pub fn items_for(
        &self,
        id: &str,
        kind: IdKind,
        options: &ResolveOptions,
    ) -> Result<Vec<Item>, FolioError> {
        match kind {
            IdKind::ItemId => Ok(self.client.item(id)?.into_iter().collect()),
            IdKind::ItemBarcode => self.client.items_where("barcode", id),
            IdKind::ItemHrid => self.client.items_where("hrid", id),
            IdKind::HoldingsId => self.client.items_where("holdingsRecordId", id),
            IdKind::HoldingsHrid => {
                match self.client.holdings_where("hrid", id)?.into_iter().next() {
                    Some(holdings) => self.items_for(&holdings.id, IdKind::HoldingsId, options),
                    None => Ok(Vec::new()),
                }
            }
            IdKind::InstanceId => {
                let mut items = Vec::new();
                for holdings in self.client.holdings_where("instanceId", id)? {
                    items.extend(self.client.items_where("holdingsRecordId", &holdings.id)?);
                }
                Ok(items)
            }
            IdKind::InstanceHrid => match self.first_instance_id(id)? {
                Some(instance_id) => self.items_for(&instance_id, IdKind::InstanceId, options),
                None => Ok(Vec::new()),
            },
            IdKind::Accession => match instance_id_from_accession(id) {
                Some(instance_id) => self.items_for(&instance_id, IdKind::InstanceId, options),
                None => Ok(Vec::new()),
            },
            IdKind::LoanId => match self.client.loan(id)? {
                Some(loan) => Ok(self.client.item(&loan.item_id)?.into_iter().collect()),
                None => Ok(Vec::new()),
            },
            IdKind::UserId => {
                let mut items = Vec::new();
                for loan in self.loans_for(id, IdKind::UserId, options)? {
                    // A loan on a vanished item is a phantom; skip it
                    // here, the clean operation handles those.
                    if let Some(item) = self.client.item(&loan.item_id)? {
                        items.push(item);
                    }
                }
                Ok(items)
            }
            IdKind::UserBarcode => match self.first_user_id(id)? {
                Some(user_id) => self.items_for(&user_id, IdKind::UserId, options),
                None => Ok(Vec::new()),
            },
            IdKind::Unresolved => Err(unresolved(id)),
        }
    }

    pub fn holdings_for(
        &self,
        id: &str,
        kind: IdKind,
        options: &ResolveOptions,
    ) -> Result<Vec<Holdings>, FolioError> {
        match kind {
            IdKind::HoldingsId => Ok(self.client.holdings(id)?.into_iter().collect()),
            IdKind::HoldingsHrid => self.client.holdings_where("hrid", id),
            IdKind::InstanceId => self.client.holdings_where("instanceId", id),
            IdKind::InstanceHrid => match self.first_instance_id(id)? {
                Some(instance_id) => self.holdings_for(&instance_id, IdKind::InstanceId, options),
                None => Ok(Vec::new()),
            },
            IdKind::Accession => match instance_id_from_accession(id) {
                Some(instance_id) => self.holdings_for(&instance_id, IdKind::InstanceId, options),
                None => Ok(Vec::new()),
            },
            IdKind::ItemId => match self.client.item(id)? {
                Some(item) => Ok(vec![self.holdings_of(&item)?]),
                None => Ok(Vec::new()),
            },
            IdKind::ItemBarcode | IdKind::ItemHrid => {
                let field = if kind == IdKind::ItemBarcode { "barcode" } else { "hrid" };
                match self.client.items_where(field, id)?.into_iter().next() {
                    Some(item) => Ok(vec![self.holdings_of(&item)?]),
                    None => Ok(Vec::new()),
                }
            }
            IdKind::LoanId => match self.client.loan(id)? {
                Some(loan) => match self.client.item(&loan.item_id)? {
                    Some(item) => Ok(vec![self.holdings_of(&item)?]),
                    None => Ok(Vec::new()),
                },
                None => Ok(Vec::new()),
            },
            IdKind::UserId | IdKind::UserBarcode => {
                let mut out = Vec::new();
                for item in self.items_for(id, kind, options)? {
                    out.push(self.holdings_of(&item)?);
                }
                Ok(out)
            }
            IdKind::Unresolved => Err(unresolved(id)),
        }
    }

    pub fn instances_for(
        &self,
        id: &str,
        kind: IdKind,
        options: &ResolveOptions,
    ) -> Result<Vec<Instance>, FolioError> {
        match kind {
            IdKind::InstanceId => Ok(self.client.instance(id)?.into_iter().collect()),
            IdKind::InstanceHrid => self.client.instances_where("hrid", id),
            IdKind::Accession => match instance_id_from_accession(id) {
                Some(instance_id) => Ok(self.client.instance(&instance_id)?.into_iter().collect()),
                None => Ok(Vec::new()),
            },
            IdKind::HoldingsId | IdKind::HoldingsHrid => {
                match self.holdings_for(id, kind, options)?.into_iter().next() {
                    Some(holdings) => Ok(vec![self.instance_of(&holdings)?]),
                    None => Ok(Vec::new()),
                }
            }
            IdKind::ItemId | IdKind::ItemBarcode | IdKind::ItemHrid => {
                let mut out = Vec::new();
                for holdings in self.holdings_for(id, kind, options)? {
                    out.push(self.instance_of(&holdings)?);
                }
                Ok(out)
            }
            IdKind::LoanId => match self.client.loan(id)? {
                Some(loan) => self.instances_for(&loan.item_id, IdKind::ItemId, options),
                None => Ok(Vec::new()),
            },
            IdKind::UserId | IdKind::UserBarcode => {
                let mut out = Vec::new();
                for item in self.items_for(id, kind, options)? {
                    let holdings = self.holdings_of(&item)?;
                    out.push(self.instance_of(&holdings)?);
                }
                Ok(out)
            }
            IdKind::Unresolved => Err(unresolved(id)),
        }
    }

    pub fn loans_for(
        &self,
        id: &str,
        kind: IdKind,
        options: &ResolveOptions,
    ) -> Result<Vec<Loan>, FolioError> {
        match kind {
            IdKind::LoanId => Ok(self.client.loan(id)?.into_iter().collect()),
            IdKind::UserId => {
                let loans = self.client.loans_where("userId", id)?;
                Ok(filter_loans(loans, options))
            }
            IdKind::UserBarcode => match self.first_user_id(id)? {
                Some(user_id) => self.loans_for(&user_id, IdKind::UserId, options),
                None => Ok(Vec::new()),
            },
            IdKind::ItemId => {
                let loans = self.client.loans_where("itemId", id)?;
                Ok(filter_loans(loans, options))
            }
            IdKind::ItemBarcode | IdKind::ItemHrid => {
                let field = if kind == IdKind::ItemBarcode { "barcode" } else { "hrid" };
                match self.client.items_where(field, id)?.into_iter().next() {
                    Some(item) => self.loans_for(&item.id, IdKind::ItemId, options),
                    None => Ok(Vec::new()),
                }
            }
            IdKind::HoldingsId
            | IdKind::HoldingsHrid
            | IdKind::InstanceId
            | IdKind::InstanceHrid
            | IdKind::Accession => {
                let mut loans = Vec::new();
                for item in self.items_for(id, kind, options)? {
                    loans.extend(self.loans_for(&item.id, IdKind::ItemId, options)?);
                }
                Ok(loans)
            }
            IdKind::Unresolved => Err(unresolved(id)),
        }
    }

    pub fn users_for(
        &self,
        id: &str,
        kind: IdKind,
        options: &ResolveOptions,
    ) -> Result<Vec<User>, FolioError> {
        match kind {
            IdKind::UserId => Ok(self.client.user(id)?.into_iter().collect()),
            IdKind::UserBarcode => self.client.users_where("barcode", id),
            IdKind::LoanId => match self.client.loan(id)? {
                Some(loan) => Ok(vec![self.user_of(&loan)?]),
                None => Ok(Vec::new()),
            },
            IdKind::ItemId
            | IdKind::ItemBarcode
            | IdKind::ItemHrid
            | IdKind::HoldingsId
            | IdKind::HoldingsHrid
            | IdKind::InstanceId
            | IdKind::InstanceHrid
            | IdKind::Accession => {
                let mut out = Vec::new();
                for loan in self.loans_for(id, kind, options)? {
                    out.push(self.user_of(&loan)?);
                }
                Ok(out)
            }
            IdKind::Unresolved => Err(unresolved(id)),
        }
    }

    // ---------------------------------------------------------------

    fn first_instance_id(&self, hrid: &str) -> Result<Option<String>, FolioError> {
        Ok(self
            .client
            .instances_where("hrid", hrid)?
            .into_iter()
            .next()
            .map(|instance| instance.id))
    }

    fn first_user_id(&self, barcode: &str) -> Result<Option<String>, FolioError> {
        Ok(self
            .client
            .users_where("barcode", barcode)?
            .into_iter()
            .next()
            .map(|user| user.id))
    }

    /// The holdings record an item claims to sit on. A dangling
    /// reference here is a platform inconsistency, not a "not found".
    fn holdings_of(&self, item: &Item) -> Result<Holdings, FolioError> {
        self.client
            .holdings(&item.holdings_record_id)?
            .ok_or_else(|| {
                FolioError::Consistency(format!(
                    "item {} references nonexistent holdings record {}",
                    item.id, item.holdings_record_id
                ))
            })
    }

    fn instance_of(&self, holdings: &Holdings) -> Result<Instance, FolioError> {
        self.client.instance(&holdings.instance_id)?.ok_or_else(|| {
            FolioError::Consistency(format!(
                "holdings record {} references nonexistent instance {}",
                holdings.id, holdings.instance_id
            ))
        })
    }

    fn user_of(&self, loan: &Loan) -> Result<User, FolioError> {
        self.client.user(&loan.user_id)?.ok_or_else(|| {
            FolioError::Consistency(format!(
                "loan {} references nonexistent user {}",
                loan.id, loan.user_id
            ))
        })
    }
}

fn filter_loans(loans: Vec<Loan>, options: &ResolveOptions) -> Vec<Loan> {
    if options.open_loans_only {
        loans.into_iter().filter(Loan::is_open).collect()
    } else {
        loans
    }
}

fn to_values<T: serde::Serialize>(records: Vec<T>) -> Result<Vec<Value>, FolioError> {
    records
        .into_iter()
        .map(|record| serde_json::to_value(record).map_err(FolioError::from))
        .collect()
}

fn unresolved(id: &str) -> FolioError {
    FolioError::Validation(format!("cannot traverse from unresolved identifier {}", id))
}
