//! `fbt delete` command - cascade-delete records

use miette::Result;

use crate::cli::args::{DeleteArgs, GlobalOpts};
use crate::cli::helpers::{
    build_backups, build_client, confirm_destruction, fatal_to_diagnostic, gather_identifiers,
    is_fatal, load_config, tell_failure, tell_success, tell_warning, BatchTally,
};
use crate::core::cascade::{CascadeEngine, DeleteState, DeletionResult};
use crate::core::error::FolioError;
use crate::core::identify::{Classifier, IdKind, IdToken};
use crate::core::resolve::{Navigator, ResolveOptions};
use crate::records::RecordKind;

pub fn run(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let client = build_client(&config)?;
    let ids = gather_identifiers(&args.input)?;

    if !confirm_destruction(
        "You are about to delete records from the platform permanently. Proceed?",
        global,
    )? {
        println!("Cancelled.");
        return Ok(());
    }

    let mut classifier = Classifier::new(&client, &config);
    let navigator = Navigator::new(&client);
    let backups = build_backups(&config)?;
    let engine = CascadeEngine::new(&client, &backups, global.dry_run);

    let mut tally = BatchTally::default();
    for id in &ids {
        let token = match classifier.classify(id) {
            Ok(token) => token,
            Err(e) if is_fatal(&e) => return Err(fatal_to_diagnostic(e)),
            Err(e) => {
                tell_failure(id, &e.to_string());
                tally.failed += 1;
                continue;
            }
        };
        if token.kind == IdKind::Unresolved {
            tell_failure(id, "could not recognize this kind of identifier");
            tally.unresolved += 1;
            continue;
        }
        let Some(kind) = token.kind.record_kind() else {
            tally.unresolved += 1;
            continue;
        };
        if matches!(kind, RecordKind::Loan | RecordKind::User) {
            tell_warning(id, &format!("deletion of {} records is not supported", kind));
            tally.skipped += 1;
            continue;
        }

        match delete_for_token(&engine, &navigator, &token, kind) {
            Ok(results) => {
                for result in results {
                    report(&result, &mut tally);
                }
            }
            Err(e) if is_fatal(&e) => return Err(fatal_to_diagnostic(e)),
            Err(e) => {
                tell_failure(id, &e.to_string());
                tally.failed += 1;
            }
        }
    }

    tally.print("record(s)");
    Ok(())
}

/// UUID-kind identifiers feed the cascade directly; barcodes, HRIDs,
/// and accession numbers resolve to their records first.
fn delete_for_token(
    engine: &CascadeEngine<'_>,
    navigator: &Navigator<'_>,
    token: &IdToken,
    kind: RecordKind,
) -> Result<Vec<DeletionResult>, FolioError> {
    let record_ids: Vec<String> = match token.kind {
        IdKind::ItemId | IdKind::HoldingsId | IdKind::InstanceId => {
            vec![token.canonical.clone()]
        }
        _ => {
            let options = ResolveOptions::default();
            match kind {
                RecordKind::Item => navigator
                    .items_for(&token.canonical, token.kind, &options)?
                    .into_iter()
                    .map(|record| record.id)
                    .collect(),
                RecordKind::Holdings => navigator
                    .holdings_for(&token.canonical, token.kind, &options)?
                    .into_iter()
                    .map(|record| record.id)
                    .collect(),
                RecordKind::Instance => navigator
                    .instances_for(&token.canonical, token.kind, &options)?
                    .into_iter()
                    .map(|record| record.id)
                    .collect(),
                _ => Vec::new(),
            }
        }
    };
    if record_ids.is_empty() {
        return Err(FolioError::NotFound(format!(
            "{} {}",
            token.kind, token.raw
        )));
    }

    record_ids
        .iter()
        .map(|record_id| engine.delete(record_id, kind))
        .collect()
}

fn report(result: &DeletionResult, tally: &mut BatchTally) {
    for record in &result.records {
        let label = format!("{} {}", record.kind, record.id);
        match record.state {
            DeleteState::Deleted => {
                tell_success(&label, &record.note);
                tally.applied += 1;
            }
            DeleteState::Pending | DeleteState::BackedUp => {
                tell_warning(&label, &record.note);
                tally.skipped += 1;
            }
            DeleteState::Failed => {
                tell_failure(&label, &record.note);
                tally.failed += 1;
            }
        }
    }
}
