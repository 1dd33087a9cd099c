//! Platform record types
//!
//! Typed views of the records served by the platform's storage modules.
//! Each struct names only the fields the toolkit reads or rewrites; every
//! other field rides along in a flattened `extra` map so that backups and
//! write-backs carry the record body verbatim.

pub mod holdings;
pub mod instance;
pub mod item;
pub mod loan;
pub mod user;

pub use holdings::Holdings;
pub use instance::Instance;
pub use item::{Item, ItemField};
pub use loan::{Loan, LoanStatus};
pub use user::User;

use serde::{Deserialize, Serialize};

/// The kinds of records the platform serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Item,
    Holdings,
    Instance,
    Loan,
    User,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Item => write!(f, "item"),
            RecordKind::Holdings => write!(f, "holdings"),
            RecordKind::Instance => write!(f, "instance"),
            RecordKind::Loan => write!(f, "loan"),
            RecordKind::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "item" => Ok(RecordKind::Item),
            "holdings" => Ok(RecordKind::Holdings),
            "instance" => Ok(RecordKind::Instance),
            "loan" => Ok(RecordKind::Loan),
            "user" => Ok(RecordKind::User),
            _ => Err(format!("Unknown record kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_display_roundtrip() {
        for kind in [
            RecordKind::Item,
            RecordKind::Holdings,
            RecordKind::Instance,
            RecordKind::Loan,
            RecordKind::User,
        ] {
            assert_eq!(kind.to_string().parse::<RecordKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_record_kind_from_str_case_insensitive() {
        assert_eq!("Holdings".parse::<RecordKind>().unwrap(), RecordKind::Holdings);
        assert!("shelf".parse::<RecordKind>().is_err());
    }
}
