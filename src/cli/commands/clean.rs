//! `fbt clean` command - delete phantom loans for a set of users

use miette::Result;

use crate::cli::args::{CleanArgs, GlobalOpts};
use crate::cli::helpers::{
    build_backups, build_client, confirm_destruction, fatal_to_diagnostic, gather_identifiers,
    is_fatal, load_config, tell_failure, tell_success, tell_warning, BatchTally,
};
use crate::core::cascade::{CascadeEngine, DeleteState};
use crate::core::identify::{Classifier, IdKind};

pub fn run(args: CleanArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let client = build_client(&config)?;
    let ids = gather_identifiers(&args.input)?;

    if !confirm_destruction(
        "You are about to delete loan records from the platform permanently. Proceed?",
        global,
    )? {
        println!("Cancelled.");
        return Ok(());
    }

    let mut classifier = Classifier::new(&client, &config);
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
        if !token.kind.is_user() {
            tell_failure(id, "not a user identifier or barcode");
            tally.failed += 1;
            continue;
        }

        match engine.clean_phantom_loans(&token) {
            Ok(result) if result.is_empty() => {
                tell_warning(id, "no loans on deleted items; nothing to do");
                tally.skipped += 1;
            }
            Ok(result) => {
                for record in &result.records {
                    let label = format!("loan {}", record.id);
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
            Err(e) if is_fatal(&e) => return Err(fatal_to_diagnostic(e)),
            Err(e) => {
                tell_failure(id, &e.to_string());
                tally.failed += 1;
            }
        }
    }

    tally.print("loan record(s)");
    Ok(())
}
