//! Recursive deletion
//!
//! Deleting an instance takes its holdings with it, and each holdings
//! its items; children are always backed up and deleted before their
//! parent, which is the order the platform's referential constraints
//! accept. A parent whose children could not all be removed is left in
//! place rather than having its deletion attempted and rejected.
//!
//! The companion clean operation deletes phantom loans: loans whose
//! item no longer exists on the platform.

use std::collections::HashSet;

use crate::core::backup::BackupStore;
use crate::core::client::FolioClient;
use crate::core::error::FolioError;
use crate::core::identify::IdToken;
use crate::core::resolve::{Navigator, ResolveOptions};
use crate::records::RecordKind;

/// Progress of one record through a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    /// Not yet touched. Terminal only in dry-run reports.
    Pending,
    /// Snapshot written, delete not yet confirmed.
    BackedUp,
    Deleted,
    Failed,
}

impl std::fmt::Display for DeleteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeleteState::Pending => write!(f, "pending"),
            DeleteState::BackedUp => write!(f, "backed up"),
            DeleteState::Deleted => write!(f, "deleted"),
            DeleteState::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeletionRecord {
    pub id: String,
    pub kind: RecordKind,
    pub state: DeleteState,
    pub note: String,
}

/// Outcome of one cascade, child-first.
#[derive(Debug, Clone, Default)]
pub struct DeletionResult {
    pub records: Vec<DeletionRecord>,
}

impl DeletionResult {
    pub fn deleted_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.state == DeleteState::Deleted)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.state == DeleteState::Failed)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn push(&mut self, kind: RecordKind, id: &str, state: DeleteState, note: impl Into<String>) {
        self.records.push(DeletionRecord {
            id: id.to_string(),
            kind,
            state,
            note: note.into(),
        });
    }
}

pub struct CascadeEngine<'a> {
    client: &'a FolioClient,
    backups: &'a BackupStore,
    dry_run: bool,
}

impl<'a> CascadeEngine<'a> {
    pub fn new(client: &'a FolioClient, backups: &'a BackupStore, dry_run: bool) -> Self {
        Self {
            client,
            backups,
            dry_run,
        }
    }

    /// Delete one record and everything below it. The `Err` case is
    /// reserved for failures that stop the cascade before it starts
    /// (enumeration of children, unsupported kinds); per-record
    /// failures land in the result.
    pub fn delete(&self, id: &str, kind: RecordKind) -> Result<DeletionResult, FolioError> {
        let mut out = DeletionResult::default();
        match kind {
            RecordKind::Item => {
                self.delete_record(RecordKind::Item, id, &mut out, "");
            }
            RecordKind::Loan => {
                self.delete_record(RecordKind::Loan, id, &mut out, "");
            }
            RecordKind::Holdings => {
                self.delete_holdings_cascade(id, &mut out, "")?;
            }
            RecordKind::Instance => {
                self.delete_instance_cascade(id, &mut out)?;
            }
            RecordKind::User => {
                return Err(FolioError::Validation(
                    "user records are never deleted by this tool".into(),
                ));
            }
        }
        Ok(out)
    }

    /// Delete a user's loans on items that no longer resolve. Loans
    /// whose item still exists are left untouched whatever their
    /// status.
    pub fn clean_phantom_loans(&self, token: &IdToken) -> Result<DeletionResult, FolioError> {
        if !token.kind.is_user() {
            return Err(FolioError::Validation(format!(
                "{} is not a user identifier or barcode",
                token.raw
            )));
        }

        let navigator = Navigator::new(self.client);
        let options = ResolveOptions {
            open_loans_only: false,
        };
        let loans = navigator.loans_for(&token.canonical, token.kind, &options)?;

        let mut out = DeletionResult::default();
        let mut seen_items: HashSet<String> = HashSet::new();
        for loan in loans {
            if self.client.item(&loan.item_id)?.is_some() {
                continue;
            }
            if !seen_items.insert(loan.item_id.clone()) {
                continue;
            }
            tracing::info!(loan = %loan.id, item = %loan.item_id, "phantom loan");
            let why = format!("loan on nonexistent item {}", loan.item_id);
            self.delete_record(RecordKind::Loan, &loan.id, &mut out, &why);
        }
        Ok(out)
    }

    /// Returns true when the holdings record itself got deleted.
    fn delete_holdings_cascade(
        &self,
        id: &str,
        out: &mut DeletionResult,
        why: &str,
    ) -> Result<bool, FolioError> {
        let items = self.client.items_where("holdingsRecordId", id)?;
        let mut children_ok = true;
        for item in &items {
            children_ok &= self.delete_record(RecordKind::Item, &item.id, out, why);
        }
        if !children_ok {
            out.push(
                RecordKind::Holdings,
                id,
                DeleteState::Failed,
                "not deleted: some of its items could not be removed",
            );
            return Ok(false);
        }
        Ok(self.delete_record(RecordKind::Holdings, id, out, why))
    }

    fn delete_instance_cascade(
        &self,
        id: &str,
        out: &mut DeletionResult,
    ) -> Result<(), FolioError> {
        let why = format!("under instance {}", id);
        let holdings = self.client.holdings_where("instanceId", id)?;
        let mut children_ok = true;
        for record in &holdings {
            children_ok &= self.delete_holdings_cascade(&record.id, out, &why)?;
        }
        if !children_ok {
            out.push(
                RecordKind::Instance,
                id,
                DeleteState::Failed,
                "not deleted: some of its holdings records could not be removed",
            );
            return Ok(());
        }

        if !self.delete_source_record(id, out) {
            out.push(
                RecordKind::Instance,
                id,
                DeleteState::Failed,
                "not deleted: its source record could not be removed",
            );
            return Ok(());
        }

        self.delete_record(RecordKind::Instance, id, out, "");
        Ok(())
    }

    /// The platform keeps a separate source-record-storage entry per
    /// instance. Older records may not have one; that is tolerated.
    fn delete_source_record(&self, instance_id: &str, out: &mut DeletionResult) -> bool {
        if self.dry_run {
            return true;
        }
        let path = format!(
            "{}/{}/source-record",
            RecordKind::Instance.endpoint(),
            instance_id
        );
        match self.client.delete_path(&path) {
            Ok(()) => true,
            Err(FolioError::NotFound(_)) => {
                tracing::warn!(
                    instance = instance_id,
                    "no source record to delete; older records may lack one"
                );
                true
            }
            Err(error) => {
                out.push(
                    RecordKind::Instance,
                    instance_id,
                    DeleteState::Failed,
                    format!("source record delete failed: {}", error),
                );
                false
            }
        }
    }

    /// Back up and delete one record. Returns true on success.
    fn delete_record(
        &self,
        kind: RecordKind,
        id: &str,
        out: &mut DeletionResult,
        why: &str,
    ) -> bool {
        let note_suffix = if why.is_empty() {
            String::new()
        } else {
            format!(" ({})", why)
        };

        if self.dry_run {
            out.push(
                kind,
                id,
                DeleteState::Pending,
                format!("would be deleted (dry run){}", note_suffix),
            );
            return true;
        }

        let path = format!("{}/{}", kind.endpoint(), id);
        let before = match self.client.fetch_json(&path) {
            Ok(Some(body)) => body,
            Ok(None) => {
                out.push(kind, id, DeleteState::Failed, "record not found");
                return false;
            }
            Err(error) => {
                out.push(kind, id, DeleteState::Failed, format!("fetch failed: {}", error));
                return false;
            }
        };
        if let Err(error) = self.backups.write(id, &before) {
            out.push(kind, id, DeleteState::Failed, error.to_string());
            return false;
        }

        match self.client.delete(kind, id) {
            Ok(()) => {
                out.push(kind, id, DeleteState::Deleted, format!("deleted{}", note_suffix));
                true
            }
            Err(error) => {
                // Snapshot exists but the record may or may not be
                // gone server-side; never retried blindly.
                out.push(
                    kind,
                    id,
                    DeleteState::Failed,
                    format!("backed up but delete failed: {}", error),
                );
                false
            }
        }
    }
}
