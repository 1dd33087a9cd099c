//! `fbt lookup` command - resolve identifiers to related records

use miette::Result;
use serde_json::Value;
use tabled::{Table, Tabled};

use crate::cli::args::{GlobalOpts, LookupArgs};
use crate::cli::helpers::{
    build_client, fatal_to_diagnostic, gather_identifiers, is_fatal, load_config, tell_failure,
    tell_warning,
};
use crate::core::identify::{Classifier, IdKind};
use crate::core::resolve::{Navigator, ResolveOptions};
use crate::records::RecordKind;

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Identifier")]
    token: String,
    #[tabled(rename = "Record ID")]
    id: String,
    #[tabled(rename = "HRID")]
    hrid: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

pub fn run(args: LookupArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let client = build_client(&config)?;
    let ids = gather_identifiers(&args.input)?;

    let mut classifier = Classifier::new(&client, &config);
    let navigator = Navigator::new(&client);
    let options = ResolveOptions {
        open_loans_only: if args.all_loans {
            false
        } else {
            config.open_loans_only
        },
    };

    let mut rows: Vec<RecordRow> = Vec::new();
    let (mut found, mut missing, mut unresolved, mut errors) = (0usize, 0usize, 0usize, 0usize);

    for id in &ids {
        let token = match classifier.classify(id) {
            Ok(token) => token,
            Err(e) if is_fatal(&e) => return Err(fatal_to_diagnostic(e)),
            Err(e) => {
                tell_failure(id, &e.to_string());
                errors += 1;
                continue;
            }
        };
        if token.kind == IdKind::Unresolved {
            tell_warning(id, "could not recognize this kind of identifier");
            unresolved += 1;
            continue;
        }

        match navigator.related_records(&token, args.kind, &options) {
            Ok(records) if records.is_empty() => {
                tell_warning(
                    id,
                    &format!("no {} records found for this {}", args.kind, token.kind),
                );
                missing += 1;
            }
            Ok(records) => {
                found += records.len();
                if args.raw {
                    for record in &records {
                        println!("{}", serde_json::to_string_pretty(record).unwrap_or_default());
                    }
                } else {
                    for record in &records {
                        rows.push(row_for(id, args.kind, record));
                    }
                }
            }
            Err(e) if is_fatal(&e) => return Err(fatal_to_diagnostic(e)),
            Err(e) => {
                tell_failure(id, &e.to_string());
                errors += 1;
            }
        }
    }

    if !rows.is_empty() {
        println!("{}", Table::new(&rows));
    }
    println!();
    println!(
        "Looked up {} identifier(s): {} record(s) found, {} with none, \
         {} unresolved, {} errors.",
        ids.len(),
        found,
        missing,
        unresolved,
        errors
    );
    Ok(())
}

fn row_for(token: &str, kind: RecordKind, record: &Value) -> RecordRow {
    let text = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };
    let summary = match kind {
        RecordKind::Instance => text("title"),
        RecordKind::Item => {
            let status = record
                .pointer("/status/name")
                .and_then(Value::as_str)
                .unwrap_or("");
            format!("barcode {} {}", text("barcode"), status)
                .trim()
                .to_string()
        }
        RecordKind::Holdings => format!("location {}", text("permanentLocationId")),
        RecordKind::Loan => {
            let status = record
                .pointer("/status/name")
                .and_then(Value::as_str)
                .unwrap_or("");
            format!("{} loan on item {}", status, text("itemId"))
                .trim()
                .to_string()
        }
        RecordKind::User => text("username"),
    };
    RecordRow {
        token: token.to_string(),
        id: text("id"),
        hrid: text("hrid"),
        summary,
    }
}
