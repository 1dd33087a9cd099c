//! Item record type

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The item fields the toolkit can bulk-edit.
///
/// All three hold UUID references into the platform's controlled
/// vocabularies (locations, loan types).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    PermanentLocation,
    TemporaryLocation,
    PermanentLoanType,
}

impl ItemField {
    /// JSON key of the field inside an item record body.
    pub fn key(self) -> &'static str {
        match self {
            ItemField::PermanentLocation => "permanentLocationId",
            ItemField::TemporaryLocation => "temporaryLocationId",
            ItemField::PermanentLoanType => "permanentLoanTypeId",
        }
    }

    /// Whether edits to this field must keep the item's holdings record
    /// in step (items live on a holdings record for their location).
    pub fn affects_holdings(self) -> bool {
        matches!(self, ItemField::PermanentLocation)
    }
}

impl std::fmt::Display for ItemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemField::PermanentLocation => write!(f, "permanent-location"),
            ItemField::TemporaryLocation => write!(f, "temporary-location"),
            ItemField::PermanentLoanType => write!(f, "permanent-loan-type"),
        }
    }
}

impl std::str::FromStr for ItemField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permanent-location" | "permanentlocationid" => Ok(ItemField::PermanentLocation),
            "temporary-location" | "temporarylocationid" => Ok(ItemField::TemporaryLocation),
            "permanent-loan-type" | "permanentloantypeid" => Ok(ItemField::PermanentLoanType),
            _ => Err(format!("Unknown item field: {}", s)),
        }
    }
}

/// An item record as served by `/item-storage/items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,

    /// The holdings record this item belongs to. Every item must
    /// reference exactly one existing holdings record.
    pub holdings_record_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_location_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_location_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_loan_type_id: Option<String>,

    /// Everything else in the record body, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    /// Current value of an editable field, if set.
    pub fn field(&self, field: ItemField) -> Option<&str> {
        match field {
            ItemField::PermanentLocation => self.permanent_location_id.as_deref(),
            ItemField::TemporaryLocation => self.temporary_location_id.as_deref(),
            ItemField::PermanentLoanType => self.permanent_loan_type_id.as_deref(),
        }
    }

    /// Set an editable field to a new value.
    pub fn set_field(&mut self, field: ItemField, value: String) {
        match field {
            ItemField::PermanentLocation => self.permanent_location_id = Some(value),
            ItemField::TemporaryLocation => self.temporary_location_id = Some(value),
            ItemField::PermanentLoanType => self.permanent_loan_type_id = Some(value),
        }
    }

    /// Remove an editable field from the record.
    pub fn clear_field(&mut self, field: ItemField) {
        match field {
            ItemField::PermanentLocation => self.permanent_location_id = None,
            ItemField::TemporaryLocation => self.temporary_location_id = None,
            ItemField::PermanentLoanType => self.permanent_loan_type_id = None,
        }
    }
}
