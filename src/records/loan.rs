//! Loan record type

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The status block of a loan record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanStatus {
    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A loan record as served by `/loan-storage/loans`.
///
/// A loan whose item no longer exists is a phantom loan; the clean
/// operation deletes those.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: String,

    pub item_id: String,

    pub user_id: String,

    #[serde(default)]
    pub status: LoanStatus,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status.name == "Open"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_loan_open_status() {
        let open: Loan = serde_json::from_value(json!({
            "id": "loan-1",
            "itemId": "item-1",
            "userId": "user-1",
            "status": {"name": "Open"}
        }))
        .unwrap();
        let closed: Loan = serde_json::from_value(json!({
            "id": "loan-2",
            "itemId": "item-1",
            "userId": "user-1",
            "status": {"name": "Closed"}
        }))
        .unwrap();
        assert!(open.is_open());
        assert!(!closed.is_open());
    }

    #[test]
    fn test_loan_missing_status_is_not_open() {
        let loan: Loan = serde_json::from_value(json!({
            "id": "loan-3",
            "itemId": "item-1",
            "userId": "user-1"
        }))
        .unwrap();
        assert!(!loan.is_open());
    }
}
