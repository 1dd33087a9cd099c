//! Mutation planning for bulk item edits
//!
//! Planning is the decide step of the fetch-decide-mutate flow: given
//! the already-fetched items and one field change, compute per item
//! what will be written, which holdings records must be created or
//! reused, and which will be orphaned. Nothing here mutates the
//! platform; the executor consumes the plan.
//!
//! Two invariants drive the holdings bookkeeping for permanent-location
//! moves:
//!   - a holdings record exists iff at least one item references it;
//!   - items of one instance at one location share a holdings record.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use crate::core::client::FolioClient;
use crate::core::error::FolioError;
use crate::records::{Holdings, Item, ItemField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAction {
    Add,
    Change,
    Delete,
}

impl std::fmt::Display for FieldAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldAction::Add => write!(f, "add"),
            FieldAction::Change => write!(f, "change"),
            FieldAction::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for FieldAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "add" => Ok(FieldAction::Add),
            "change" => Ok(FieldAction::Change),
            "delete" => Ok(FieldAction::Delete),
            _ => Err(format!("Unknown action: {}", s)),
        }
    }
}

/// One requested bulk edit: which field, what to do, and the value
/// predicate items must meet.
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub field: ItemField,
    pub action: FieldAction,
    pub match_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    /// Reject malformed action/value combinations before any network
    /// call is made.
    pub fn validate(&self) -> Result<(), FolioError> {
        match self.action {
            FieldAction::Add => {
                if self.match_value.is_some() {
                    return Err(FolioError::Validation(
                        "add does not take a current value".into(),
                    ));
                }
                if self.new_value.is_none() {
                    return Err(FolioError::Validation("add requires a new value".into()));
                }
            }
            FieldAction::Change => {
                if self.match_value.is_none() || self.new_value.is_none() {
                    return Err(FolioError::Validation(
                        "change requires both a current and a new value".into(),
                    ));
                }
            }
            FieldAction::Delete => {
                if self.match_value.is_none() {
                    return Err(FolioError::Validation(
                        "delete requires the current value".into(),
                    ));
                }
                if self.new_value.is_some() {
                    return Err(FolioError::Validation(
                        "delete does not take a new value".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Where a planned item lands, holdings-wise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldingsDisposition {
    /// The item stays on its current holdings record.
    Keep,
    /// Repoint to an existing holdings record under the same instance.
    Reuse { holdings_id: String },
    /// Repoint to a holdings record the executor creates first;
    /// `key` indexes `MutationPlan::creates`.
    Create { key: usize },
}

/// One item's planned write. `after` still carries the original
/// holdings reference when the disposition is `Create`; the executor
/// patches it once the new holdings record exists and has an id.
#[derive(Debug, Clone)]
pub struct PlannedItemChange {
    /// Verbatim pre-mutation body, what the executor backs up.
    pub before: Value,
    pub after: Item,
    pub disposition: HoldingsDisposition,
}

#[derive(Debug, Clone)]
pub enum PlanDecision {
    Change(Box<PlannedItemChange>),
    Skip { reason: String },
}

#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub item_id: String,
    pub decision: PlanDecision,
}

/// A holdings record to create: one per (instance, location) pair in
/// the batch, however many items land on it.
#[derive(Debug, Clone)]
pub struct PlannedHoldings {
    pub instance_id: String,
    pub location_id: String,
    pub template: Value,
}

/// The computed plan for one batch. Ephemeral: consumed by the
/// executor immediately after planning.
#[derive(Debug, Clone, Default)]
pub struct MutationPlan {
    pub entries: Vec<PlanEntry>,
    pub creates: Vec<PlannedHoldings>,
    /// Holdings records left without items once the batch applies,
    /// deleted after all repointing succeeds.
    pub orphan_deletes: Vec<String>,
}

impl MutationPlan {
    pub fn planned_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.decision, PlanDecision::Change(_)))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.entries.len() - self.planned_count()
    }
}

pub struct Planner<'a> {
    client: &'a FolioClient,
}

impl<'a> Planner<'a> {
    pub fn new(client: &'a FolioClient) -> Self {
        Self { client }
    }

    /// Compute the plan for applying `change` to `items`, in input
    /// order. Items not meeting the action's predicate become skip
    /// entries, which makes re-running a batch safe: nothing matches
    /// the old value the second time.
    pub fn plan(&self, items: &[Item], change: &FieldChange) -> Result<MutationPlan, FolioError> {
        change.validate()?;

        let mut plan = MutationPlan::default();
        let mut create_index: HashMap<(String, String), usize> = HashMap::new();
        let mut siblings_cache: HashMap<String, Vec<Holdings>> = HashMap::new();
        let mut moved_out: BTreeMap<String, u64> = BTreeMap::new();
        let mut reuse_targets: HashSet<String> = HashSet::new();
        let mut seen: HashSet<String> = HashSet::new();

        for item in items {
            if !seen.insert(item.id.clone()) {
                plan.entries.push(PlanEntry {
                    item_id: item.id.clone(),
                    decision: PlanDecision::Skip {
                        reason: "already planned earlier in this batch".into(),
                    },
                });
                continue;
            }

            let decision = self.decide(
                item,
                change,
                &mut plan.creates,
                &mut create_index,
                &mut siblings_cache,
                &mut moved_out,
                &mut reuse_targets,
            )?;
            plan.entries.push(PlanEntry {
                item_id: item.id.clone(),
                decision,
            });
        }

        // A holdings record every remaining item has left is orphaned.
        for (holdings_id, moved) in &moved_out {
            if reuse_targets.contains(holdings_id) {
                continue;
            }
            let total = self.client.item_count_for_holdings(holdings_id)?;
            if *moved >= total {
                plan.orphan_deletes.push(holdings_id.clone());
            }
        }

        tracing::info!(
            planned = plan.planned_count(),
            skipped = plan.skipped_count(),
            creates = plan.creates.len(),
            orphans = plan.orphan_deletes.len(),
            "mutation plan computed"
        );
        Ok(plan)
    }

    #[allow(clippy::too_many_arguments)]
    fn decide(
        &self,
        item: &Item,
        change: &FieldChange,
        creates: &mut Vec<PlannedHoldings>,
        create_index: &mut HashMap<(String, String), usize>,
        siblings_cache: &mut HashMap<String, Vec<Holdings>>,
        moved_out: &mut BTreeMap<String, u64>,
        reuse_targets: &mut HashSet<String>,
    ) -> Result<PlanDecision, FolioError> {
        let key = change.field.key();
        let current = item.field(change.field);

        // Predicate per action; misses are skips, not errors.
        match change.action {
            FieldAction::Add => {
                if current.is_some() {
                    return Ok(skip(format!("already has a value for {}", key)));
                }
            }
            FieldAction::Change | FieldAction::Delete => match (current, &change.match_value) {
                (None, _) => return Ok(skip(format!("has no value for {}", key))),
                (Some(value), Some(wanted)) if value != wanted => {
                    return Ok(skip(format!("value of {} is not {}", key, wanted)));
                }
                _ => {}
            },
        }

        let mut after = item.clone();
        match change.action {
            FieldAction::Add | FieldAction::Change => {
                // validate() guarantees the value is present.
                let value = change
                    .new_value
                    .clone()
                    .ok_or_else(|| FolioError::Validation("missing new value".into()))?;
                after.set_field(change.field, value);
            }
            FieldAction::Delete => after.clear_field(change.field),
        }

        let mut disposition = HoldingsDisposition::Keep;
        if change.field.affects_holdings() && change.action != FieldAction::Delete {
            let target = after
                .field(change.field)
                .unwrap_or_default()
                .to_string();

            let Some(holdings) = self.client.holdings(&item.holdings_record_id)? else {
                tracing::warn!(
                    item = %item.id,
                    holdings = %item.holdings_record_id,
                    "item references nonexistent holdings record"
                );
                return Ok(skip(format!(
                    "references nonexistent holdings record {}",
                    item.holdings_record_id
                )));
            };

            if holdings.permanent_location_id != target {
                if !siblings_cache.contains_key(&holdings.instance_id) {
                    let fetched =
                        self.client.holdings_where("instanceId", &holdings.instance_id)?;
                    siblings_cache.insert(holdings.instance_id.clone(), fetched);
                }
                let siblings = &siblings_cache[&holdings.instance_id];

                // Existing holdings at the target location: reuse the
                // one with the smallest id so repeated runs agree.
                let candidate = siblings
                    .iter()
                    .filter(|sibling| sibling.permanent_location_id == target)
                    .map(|sibling| sibling.id.as_str())
                    .min();

                disposition = match candidate {
                    Some(reuse_id) => {
                        after.holdings_record_id = reuse_id.to_string();
                        reuse_targets.insert(reuse_id.to_string());
                        HoldingsDisposition::Reuse {
                            holdings_id: reuse_id.to_string(),
                        }
                    }
                    None => {
                        let index_key = (holdings.instance_id.clone(), target.clone());
                        let create_key = match create_index.get(&index_key) {
                            Some(&existing) => existing,
                            None => {
                                creates.push(PlannedHoldings {
                                    instance_id: holdings.instance_id.clone(),
                                    location_id: target.clone(),
                                    template: holdings.template_at(&target),
                                });
                                let fresh = creates.len() - 1;
                                create_index.insert(index_key, fresh);
                                fresh
                            }
                        };
                        HoldingsDisposition::Create { key: create_key }
                    }
                };
                *moved_out.entry(holdings.id.clone()).or_insert(0) += 1;
            }
        }

        Ok(PlanDecision::Change(Box::new(PlannedItemChange {
            before: serde_json::to_value(item)?,
            after,
            disposition,
        })))
    }
}

fn skip(reason: String) -> PlanDecision {
    PlanDecision::Skip { reason }
}
