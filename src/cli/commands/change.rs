//! `fbt change` command - bulk-edit one field across item records

use miette::{miette, Result};

use crate::cli::args::{ChangeArgs, GlobalOpts};
use crate::cli::helpers::{
    build_backups, build_client, confirm_destruction, fatal_to_diagnostic, gather_identifiers,
    is_fatal, load_config, tell_failure, tell_success, tell_warning, BatchTally,
};
use crate::core::apply::{Executor, Outcome};
use crate::core::identify::{Classifier, IdKind};
use crate::core::plan::{FieldChange, Planner};
use crate::core::resolve::{Navigator, ResolveOptions};
use crate::records::Item;

pub fn run(args: ChangeArgs, global: &GlobalOpts) -> Result<()> {
    let change = FieldChange {
        field: args.field,
        action: args.action,
        match_value: args.current_value.clone(),
        new_value: args.new_value.clone(),
    };
    // Malformed requests are rejected before any network traffic.
    change.validate().map_err(|e| miette!("{}", e))?;

    let config = load_config(global)?;
    let client = build_client(&config)?;
    let ids = gather_identifiers(&args.input)?;

    if !confirm_destruction(
        "You are about to change records on the platform permanently. Proceed?",
        global,
    )? {
        println!("Cancelled.");
        return Ok(());
    }

    let mut classifier = Classifier::new(&client, &config);
    let navigator = Navigator::new(&client);
    let options = ResolveOptions {
        open_loans_only: config.open_loans_only,
    };

    let mut tally = BatchTally::default();
    let mut items: Vec<Item> = Vec::new();
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
        if !token.kind.is_item() {
            tell_warning(id, &format!("not an item identifier ({})", token.kind));
            tally.skipped += 1;
            continue;
        }
        match navigator.items_for(&token.canonical, token.kind, &options) {
            Ok(found) if found.is_empty() => {
                tell_failure(id, &format!("no item records found for this {}", token.kind));
                tally.failed += 1;
            }
            Ok(found) => items.extend(found),
            Err(e) if is_fatal(&e) => return Err(fatal_to_diagnostic(e)),
            Err(e) => {
                tell_failure(id, &e.to_string());
                tally.failed += 1;
            }
        }
    }

    let plan = Planner::new(&client)
        .plan(&items, &change)
        .map_err(|e| miette!("{}", e))?;
    let backups = build_backups(&config)?;
    let results = Executor::new(&client, &backups, global.dry_run).execute(&plan);

    for result in &results {
        let label = format!("{} {}", result.kind, result.record_id);
        match result.outcome {
            Outcome::Applied => {
                tell_success(&label, &result.note);
                tally.applied += 1;
            }
            Outcome::Skipped => {
                tell_warning(&label, &result.note);
                tally.skipped += 1;
            }
            Outcome::Failed => {
                tell_failure(&label, result.error.as_deref().unwrap_or("unknown error"));
                tally.failed += 1;
            }
        }
    }

    tally.print("item record(s)");
    Ok(())
}
