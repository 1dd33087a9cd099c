//! Shared helper functions for CLI commands
//!
//! Identifier gathering, confirmation gating, per-record outcome lines,
//! and the end-of-batch tally used across the batch commands.

use std::fs;
use std::io::{self, BufRead, IsTerminal, Read};

use console::style;
use miette::{miette, Result};

use crate::cli::args::{GlobalOpts, IdentifierInput};
use crate::core::backup::BackupStore;
use crate::core::client::FolioClient;
use crate::core::config::Config;
use crate::core::error::FolioError;
use crate::core::identify::unique_identifiers;

pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    Config::load(global.config.as_deref()).map_err(|e| miette!("{}", e))
}

pub fn build_client(config: &Config) -> Result<FolioClient> {
    FolioClient::from_config(config).map_err(|e| miette!("{}", e))
}

pub fn build_backups(config: &Config) -> Result<BackupStore> {
    Ok(BackupStore::new(
        config.backup_dir().map_err(|e| miette!("{}", e))?,
    ))
}

/// Collect identifiers from positional arguments, `--file`, and (when
/// neither is given) piped stdin, tokenized and de-duplicated.
pub fn gather_identifiers(input: &IdentifierInput) -> Result<Vec<String>> {
    let mut text = input.ids.join(" ");
    if let Some(path) = &input.file {
        let contents = fs::read_to_string(path)
            .map_err(|e| miette!("cannot read {}: {}", path.display(), e))?;
        text.push('\n');
        text.push_str(&contents);
    }
    if text.trim().is_empty() {
        if let Some(piped) = read_stdin_if_piped() {
            text = piped;
        }
    }

    let ids = unique_identifiers(&text);
    if ids.is_empty() {
        return Err(miette!(
            "no identifiers given; pass them as arguments, with --file, or on stdin"
        ));
    }
    Ok(ids)
}

/// Read all of stdin if it is piped (not a terminal).
fn read_stdin_if_piped() -> Option<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let mut text = String::new();
    stdin.lock().read_to_string(&mut text).ok()?;
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Read identifiers from stdin one per line if stdin is piped.
pub fn read_ids_from_stdin() -> Option<Vec<String>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return None;
    }
    let ids: Vec<String> = stdin
        .lock()
        .lines()
        .map_while(|line| line.ok())
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

/// Gate destructive batches behind a prompt, unless `--yes` was given
/// or this is a dry run.
pub fn confirm_destruction(prompt: &str, global: &GlobalOpts) -> Result<bool> {
    if global.yes || global.dry_run {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| miette!("{}", e))
}

pub fn tell_success(id: &str, msg: &str) {
    println!("{} {}: {}", style("ok").green().bold(), style(id).bold(), msg);
}

pub fn tell_warning(id: &str, msg: &str) {
    println!("{} {}: {}", style("--").yellow().bold(), style(id).bold(), msg);
}

pub fn tell_failure(id: &str, msg: &str) {
    println!("{} {}: {}", style("XX").red().bold(), style(id).bold(), msg);
}

/// An error that invalidates the rest of the batch, as opposed to a
/// per-record failure.
pub fn is_fatal(error: &FolioError) -> bool {
    matches!(error, FolioError::AuthExpired | FolioError::Config(_))
}

/// Turn a fatal error into a batch-aborting diagnostic.
pub fn fatal_to_diagnostic(error: FolioError) -> miette::Report {
    match error {
        FolioError::AuthExpired => miette!(
            "authentication expired; re-authenticate and rerun \
             (changes already applied remain applied)"
        ),
        other => miette!("{}", other),
    }
}

/// End-of-batch counts, printed after every batch command.
#[derive(Debug, Default)]
pub struct BatchTally {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub unresolved: usize,
}

impl BatchTally {
    pub fn print(&self, what: &str) {
        let mut parts = vec![
            format!("{} applied", self.applied),
            format!("{} skipped", self.skipped),
            format!("{} failed", self.failed),
        ];
        if self.unresolved > 0 {
            parts.push(format!("{} unresolved", self.unresolved));
        }
        println!();
        println!("Finished with {}: {}.", what, parts.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_identifiers_from_args() {
        let input = IdentifierInput {
            ids: vec!["i-1, i-2".into(), "i-3".into()],
            file: None,
        };
        assert_eq!(
            gather_identifiers(&input).unwrap(),
            vec!["i-1", "i-2", "i-3"]
        );
    }

    #[test]
    fn test_gather_identifiers_merges_file_and_dedupes() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "350470; 350471\n350470").unwrap();
        let input = IdentifierInput {
            ids: vec!["350472".into()],
            file: Some(tmp.path().to_path_buf()),
        };
        assert_eq!(
            gather_identifiers(&input).unwrap(),
            vec!["350472", "350470", "350471"]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let input = IdentifierInput {
            ids: vec![],
            file: Some("/definitely/not/here.txt".into()),
        };
        assert!(gather_identifiers(&input).is_err());
    }
}
