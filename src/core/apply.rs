//! Backup-then-write execution of a mutation plan
//!
//! Records are processed in plan order, one at a time. Each record's
//! outcome is independent: one failure never stops the rest of the
//! batch. Every update or delete is preceded by a snapshot of the
//! current body; a record that cannot be backed up is not written.
//! Mutating calls are never retried here, since a failed call may have
//! taken effect server-side.

use std::collections::{HashMap, HashSet};

use crate::core::backup::BackupStore;
use crate::core::client::FolioClient;
use crate::core::error::FolioError;
use crate::core::plan::{HoldingsDisposition, MutationPlan, PlanDecision, PlannedItemChange};
use crate::records::RecordKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Applied => write!(f, "applied"),
            Outcome::Skipped => write!(f, "skipped"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

/// Per-record result of one executed change.
#[derive(Debug, Clone)]
pub struct ChangeResult {
    pub record_id: String,
    pub kind: RecordKind,
    pub outcome: Outcome,
    pub note: String,
    pub error: Option<String>,
}

impl ChangeResult {
    fn applied(record_id: &str, kind: RecordKind, note: impl Into<String>) -> Self {
        Self {
            record_id: record_id.to_string(),
            kind,
            outcome: Outcome::Applied,
            note: note.into(),
            error: None,
        }
    }

    fn skipped(record_id: &str, kind: RecordKind, note: impl Into<String>) -> Self {
        Self {
            record_id: record_id.to_string(),
            kind,
            outcome: Outcome::Skipped,
            note: note.into(),
            error: None,
        }
    }

    fn failed(record_id: &str, kind: RecordKind, error: &FolioError) -> Self {
        Self {
            record_id: record_id.to_string(),
            kind,
            outcome: Outcome::Failed,
            note: String::new(),
            error: Some(error.to_string()),
        }
    }
}

pub struct Executor<'a> {
    client: &'a FolioClient,
    backups: &'a BackupStore,
    dry_run: bool,
}

impl<'a> Executor<'a> {
    pub fn new(client: &'a FolioClient, backups: &'a BackupStore, dry_run: bool) -> Self {
        Self {
            client,
            backups,
            dry_run,
        }
    }

    /// Apply a plan: item updates first (creating holdings records on
    /// demand), then deletion of holdings records the moves orphaned.
    pub fn execute(&self, plan: &MutationPlan) -> Vec<ChangeResult> {
        let mut results = Vec::new();
        // Holdings created so far, by plan key; a key whose create
        // failed is poisoned so later items do not re-create it without
        // knowing what the first attempt did server-side.
        let mut created: HashMap<usize, String> = HashMap::new();
        let mut poisoned: HashSet<usize> = HashSet::new();

        for entry in &plan.entries {
            let result = match &entry.decision {
                PlanDecision::Skip { reason } => {
                    ChangeResult::skipped(&entry.item_id, RecordKind::Item, reason.clone())
                }
                PlanDecision::Change(change) => {
                    self.apply_item(&entry.item_id, change, plan, &mut created, &mut poisoned)
                }
            };
            results.push(result);
        }

        for holdings_id in &plan.orphan_deletes {
            results.push(self.delete_orphan(holdings_id));
        }
        results
    }

    fn apply_item(
        &self,
        item_id: &str,
        change: &PlannedItemChange,
        plan: &MutationPlan,
        created: &mut HashMap<usize, String>,
        poisoned: &mut HashSet<usize>,
    ) -> ChangeResult {
        let mut after = change.after.clone();

        match &change.disposition {
            HoldingsDisposition::Keep => {}
            HoldingsDisposition::Reuse { holdings_id } => {
                after.holdings_record_id = holdings_id.clone();
            }
            HoldingsDisposition::Create { key } => {
                if poisoned.contains(key) {
                    return ChangeResult::failed(
                        item_id,
                        RecordKind::Item,
                        &FolioError::Validation(
                            "holdings record create failed earlier in this batch".into(),
                        ),
                    );
                }
                if let Some(holdings_id) = created.get(key) {
                    after.holdings_record_id = holdings_id.clone();
                } else if self.dry_run {
                    return ChangeResult::applied(
                        item_id,
                        RecordKind::Item,
                        format!(
                            "would move to a new holdings record at {} (dry run)",
                            plan.creates[*key].location_id
                        ),
                    );
                } else {
                    match self.create_holdings(plan, *key) {
                        Ok(holdings_id) => {
                            created.insert(*key, holdings_id.clone());
                            after.holdings_record_id = holdings_id;
                        }
                        Err(error) => {
                            tracing::warn!(%error, "holdings record create failed");
                            poisoned.insert(*key);
                            return ChangeResult::failed(item_id, RecordKind::Item, &error);
                        }
                    }
                }
            }
        }

        if self.dry_run {
            return ChangeResult::applied(item_id, RecordKind::Item, "would update (dry run)");
        }

        if let Err(error) = self.backups.write(item_id, &change.before) {
            return ChangeResult::failed(item_id, RecordKind::Item, &error);
        }

        let body = match serde_json::to_value(&after) {
            Ok(body) => body,
            Err(error) => return ChangeResult::failed(item_id, RecordKind::Item, &error.into()),
        };
        match self.client.update(RecordKind::Item, item_id, &body) {
            Ok(()) => ChangeResult::applied(item_id, RecordKind::Item, "updated"),
            Err(error) => ChangeResult::failed(item_id, RecordKind::Item, &error),
        }
    }

    fn create_holdings(&self, plan: &MutationPlan, key: usize) -> Result<String, FolioError> {
        let template = &plan.creates[key].template;
        let body = self.client.create(RecordKind::Holdings, template)?;
        body.get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                FolioError::Consistency("created holdings record came back without an id".into())
            })
    }

    /// Delete a holdings record the batch emptied, re-checking first
    /// that nothing still references it (an earlier failed item update
    /// leaves it occupied).
    fn delete_orphan(&self, holdings_id: &str) -> ChangeResult {
        if self.dry_run {
            return ChangeResult::applied(
                holdings_id,
                RecordKind::Holdings,
                "would delete orphaned holdings record (dry run)",
            );
        }

        let remaining = match self.client.item_count_for_holdings(holdings_id) {
            Ok(count) => count,
            Err(error) => return ChangeResult::failed(holdings_id, RecordKind::Holdings, &error),
        };
        if remaining > 0 {
            return ChangeResult::skipped(
                holdings_id,
                RecordKind::Holdings,
                format!("still referenced by {} item(s)", remaining),
            );
        }

        let path = format!("{}/{}", RecordKind::Holdings.endpoint(), holdings_id);
        let before = match self.client.fetch_json(&path) {
            Ok(Some(body)) => body,
            Ok(None) => {
                return ChangeResult::skipped(holdings_id, RecordKind::Holdings, "already gone")
            }
            Err(error) => return ChangeResult::failed(holdings_id, RecordKind::Holdings, &error),
        };
        if let Err(error) = self.backups.write(holdings_id, &before) {
            return ChangeResult::failed(holdings_id, RecordKind::Holdings, &error);
        }
        match self.client.delete(RecordKind::Holdings, holdings_id) {
            Ok(()) => ChangeResult::applied(
                holdings_id,
                RecordKind::Holdings,
                "deleted orphaned holdings record",
            ),
            Err(error) => ChangeResult::failed(holdings_id, RecordKind::Holdings, &error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::plan::{FieldAction, FieldChange, Planner};
    use crate::core::testing::{seed_library, FakeFolio};
    use crate::records::{Item, ItemField};
    use tempfile::TempDir;

    struct Rig {
        fake: FakeFolio,
        client: FolioClient,
        _tmp: TempDir,
        backups: BackupStore,
    }

    fn rig() -> Rig {
        let fake = FakeFolio::new();
        seed_library(&fake);
        let client = FolioClient::new(Box::new(fake.clone()));
        let tmp = TempDir::new().unwrap();
        let backups = BackupStore::new(tmp.path());
        Rig {
            fake,
            client,
            _tmp: tmp,
            backups,
        }
    }

    fn location_change(from: &str, to: &str) -> FieldChange {
        FieldChange {
            field: ItemField::PermanentLocation,
            action: FieldAction::Change,
            match_value: Some(from.to_string()),
            new_value: Some(to.to_string()),
        }
    }

    fn items(client: &FolioClient, ids: &[&str]) -> Vec<Item> {
        ids.iter()
            .map(|id| client.item(id).unwrap().unwrap())
            .collect()
    }

    #[test]
    fn test_move_into_existing_holdings_applies_and_keeps_source() {
        let rig = rig();
        let planner = Planner::new(&rig.client);
        let plan = planner
            .plan(&items(&rig.client, &["i-2"]), &location_change("loc-a", "loc-b"))
            .unwrap();
        let results = Executor::new(&rig.client, &rig.backups, false).execute(&plan);

        assert!(results.iter().all(|r| r.outcome == Outcome::Applied));
        let moved = rig.client.item("i-2").unwrap().unwrap();
        assert_eq!(moved.holdings_record_id, "h-2");
        assert_eq!(moved.permanent_location_id.as_deref(), Some("loc-b"));
        // h-1 still holds i-1 and must survive.
        assert!(rig.client.holdings("h-1").unwrap().is_some());
    }

    #[test]
    fn test_move_that_empties_holdings_creates_new_and_deletes_old() {
        let rig = rig();
        let planner = Planner::new(&rig.client);
        let plan = planner
            .plan(&items(&rig.client, &["i-4"]), &location_change("loc-a", "loc-c"))
            .unwrap();
        let results = Executor::new(&rig.client, &rig.backups, false).execute(&plan);
        assert!(results.iter().all(|r| r.outcome == Outcome::Applied));

        let moved = rig.client.item("i-4").unwrap().unwrap();
        assert_ne!(moved.holdings_record_id, "h-3");
        let new_holdings = rig.client.holdings(&moved.holdings_record_id).unwrap().unwrap();
        assert_eq!(new_holdings.permanent_location_id, "loc-c");
        assert_eq!(new_holdings.instance_id, "inst-2");
        // The emptied holdings record is gone.
        assert!(rig.client.holdings("h-3").unwrap().is_none());
        // Pre-images exist for both the item and the deleted holdings.
        assert!(rig.backups.dir().join("i-4").is_dir());
        assert!(rig.backups.dir().join("h-3").is_dir());
    }

    #[test]
    fn test_two_items_share_one_created_holdings() {
        let rig = rig();
        let planner = Planner::new(&rig.client);
        let plan = planner
            .plan(
                &items(&rig.client, &["i-1", "i-2"]),
                &location_change("loc-a", "loc-c"),
            )
            .unwrap();
        let before_holdings = rig.fake.count(RecordKind::Holdings);
        let results = Executor::new(&rig.client, &rig.backups, false).execute(&plan);
        assert!(results.iter().all(|r| r.outcome == Outcome::Applied));

        // One created, one (h-1) deleted.
        assert_eq!(rig.fake.count(RecordKind::Holdings), before_holdings);
        let a = rig.client.item("i-1").unwrap().unwrap();
        let b = rig.client.item("i-2").unwrap().unwrap();
        assert_eq!(a.holdings_record_id, b.holdings_record_id);
        assert!(rig.client.holdings("h-1").unwrap().is_none());
    }

    #[test]
    fn test_one_failure_does_not_stop_the_batch() {
        let rig = rig();
        let planner = Planner::new(&rig.client);
        let plan = planner
            .plan(
                &items(&rig.client, &["i-1", "i-2"]),
                &location_change("loc-a", "loc-b"),
            )
            .unwrap();

        rig.fake.fail_with("/item-storage/items/i-1", 500);
        let results = Executor::new(&rig.client, &rig.backups, false).execute(&plan);

        let by_id = |id: &str| results.iter().find(|r| r.record_id == id).unwrap();
        assert_eq!(by_id("i-1").outcome, Outcome::Failed);
        assert_eq!(by_id("i-2").outcome, Outcome::Applied);
        // The failed item was still backed up before the attempt.
        assert!(rig.backups.dir().join("i-1").is_dir());
        // h-1 still has i-1 on it, so the orphan delete is skipped.
        assert_eq!(by_id("h-1").outcome, Outcome::Skipped);
        assert!(rig.client.holdings("h-1").unwrap().is_some());
    }

    #[test]
    fn test_rerunning_a_change_is_idempotent() {
        let rig = rig();
        let change = location_change("loc-a", "loc-b");
        let planner = Planner::new(&rig.client);

        let plan = planner
            .plan(&items(&rig.client, &["i-1", "i-2"]), &change)
            .unwrap();
        Executor::new(&rig.client, &rig.backups, false).execute(&plan);

        // Second round: nothing matches loc-a any more.
        let second = planner
            .plan(&items(&rig.client, &["i-1", "i-2"]), &change)
            .unwrap();
        assert_eq!(second.planned_count(), 0);
        let mutations_before = rig.fake.mutation_count();
        let results = Executor::new(&rig.client, &rig.backups, false).execute(&second);
        assert!(results.iter().all(|r| r.outcome == Outcome::Skipped));
        assert_eq!(rig.fake.mutation_count(), mutations_before);
    }

    #[test]
    fn test_disjoint_batches_partition_onto_one_location() {
        // Items split across loc-a and loc-b all end at loc-c, with the
        // same total item count as before.
        let rig = rig();
        let planner = Planner::new(&rig.client);
        let items_before = rig.fake.count(RecordKind::Item);

        let all = items(&rig.client, &["i-1", "i-2", "i-3"]);
        let plan_a = planner.plan(&all, &location_change("loc-a", "loc-c")).unwrap();
        Executor::new(&rig.client, &rig.backups, false).execute(&plan_a);

        let refreshed = items(&rig.client, &["i-1", "i-2", "i-3"]);
        let plan_b = planner
            .plan(&refreshed, &location_change("loc-b", "loc-c"))
            .unwrap();
        Executor::new(&rig.client, &rig.backups, false).execute(&plan_b);

        assert_eq!(rig.fake.count(RecordKind::Item), items_before);
        for id in ["i-1", "i-2", "i-3"] {
            let item = rig.client.item(id).unwrap().unwrap();
            assert_eq!(item.permanent_location_id.as_deref(), Some("loc-c"));
            let holdings = rig.client.holdings(&item.holdings_record_id).unwrap().unwrap();
            assert_eq!(holdings.permanent_location_id, "loc-c");
        }
        // No holdings record under inst-1 is left without items.
        assert!(rig.client.holdings("h-1").unwrap().is_none());
        assert!(rig.client.holdings("h-2").unwrap().is_none());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let rig = rig();
        let planner = Planner::new(&rig.client);
        let plan = planner
            .plan(&items(&rig.client, &["i-4"]), &location_change("loc-a", "loc-c"))
            .unwrap();

        let mutations_before = rig.fake.mutation_count();
        let results = Executor::new(&rig.client, &rig.backups, true).execute(&plan);
        assert!(results.iter().all(|r| r.outcome == Outcome::Applied));
        assert!(results.iter().all(|r| r.note.contains("dry run")));
        assert_eq!(rig.fake.mutation_count(), mutations_before);
        assert!(rig.client.holdings("h-3").unwrap().is_some());
        // No snapshots in dry-run mode either.
        assert!(std::fs::read_dir(rig.backups.dir()).map(|mut d| d.next().is_none()).unwrap_or(true));
    }
}
