//! Exchange protocol control tables.
//!
//! Every participating geodatabase carries an `A_README` table identifying the
//! protocol and the store's role. A spoke carries `A_XCHANGE_PARAMETERS`
//! (per-object directives); a hub carries `A_XCHANGE_LOG` (one row per
//! completed transfer). These three names are reserved: they are protocol
//! metadata and never transferable content.

use serde::{Deserialize, Serialize};

use crate::error::{ExchangeError, Result};

/// Expected value of the readme table's PROTOCOL column.
pub const PROTOCOL_ID: &str = "EGC GEOSPATIAL DATA EXCHANGE PROTOCOL";

/// Control table present on every participating store.
pub const README_TABLE: &str = "A_README";
/// Directive table required on a spoke store.
pub const PARAMS_TABLE: &str = "A_XCHANGE_PARAMETERS";
/// Log table required on a hub store.
pub const LOG_TABLE: &str = "A_XCHANGE_LOG";

/// Columns read from the readme table.
pub const README_FIELDS: [&str; 4] = ["PROTOCOL", "DB_TYPE", "CONSTRAINTS", "NOTE"];
/// Columns read from the directive table.
pub const PARAMS_FIELDS: [&str; 5] = [
    "OBJECT_NAME",
    "IS_FDATASET",
    "DIRECTIVE",
    "SORT_FIELD",
    "NOTE",
];
/// Columns written to the log table.
pub const LOG_FIELDS: [&str; 2] = ["DATE", "NOTE"];

/// Whether a local table name is one of the reserved control-table names.
pub fn is_reserved_table(local: &str) -> bool {
    local.eq_ignore_ascii_case(README_TABLE)
        || local.eq_ignore_ascii_case(PARAMS_TABLE)
        || local.eq_ignore_ascii_case(LOG_TABLE)
}

/// Store role read from the readme table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Central store; requires a log table on the target side.
    Hub,
    /// Distribution node; requires a directive table on the source side.
    Spoke,
}

impl Role {
    /// Parse a DB_TYPE value (trimmed, case-insensitive).
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_ascii_uppercase().as_str() {
            "HUB" => Some(Role::Hub),
            "SPOKE" => Some(Role::Spoke),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Hub => "hub",
            Role::Spoke => "spoke",
        }
    }
}

/// Validate a readme row (`PROTOCOL`, `DB_TYPE`, ...) and extract the role.
///
/// `side` names the store in error messages ("source" or "target"). Both a
/// protocol-identifier mismatch and a bad role value are fatal preconditions.
pub fn parse_readme_row(side: &str, row: &[Option<String>]) -> Result<Role> {
    let protocol = row
        .first()
        .and_then(|v| v.as_deref())
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase();
    if protocol != PROTOCOL_ID {
        return Err(ExchangeError::Precondition(format!(
            "{} store's {} table isn't attributed for {}; check its PROTOCOL field",
            side, README_TABLE, PROTOCOL_ID
        )));
    }

    let db_type = row.get(1).and_then(|v| v.as_deref()).unwrap_or_default();
    Role::parse(db_type).ok_or_else(|| {
        ExchangeError::Precondition(format!(
            "{} store's {} table isn't properly attributed; DB_TYPE should be 'hub' or 'spoke'",
            side, README_TABLE
        ))
    })
}

/// Directive keyword from the `DIRECTIVE` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectiveKeyword {
    /// Unconditional replace (empty or unrecognized keyword).
    #[default]
    Refresh,
    /// Compare before overwrite; needs a sort field.
    DetectChanges,
    /// Skip this name entirely.
    Static,
}

impl DirectiveKeyword {
    /// Parse a DIRECTIVE value (trimmed, case-insensitive). A null or empty
    /// value means plain refresh.
    pub fn parse(value: Option<&str>) -> DirectiveKeyword {
        match value.unwrap_or_default().trim().to_ascii_uppercase().as_str() {
            "STATIC" => DirectiveKeyword::Static,
            "DETECT_CHANGES" => DirectiveKeyword::DetectChanges,
            _ => DirectiveKeyword::Refresh,
        }
    }
}

/// One row of the directive table, as consumed by the planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveRow {
    /// Referenced object or feature dataset, usually schema-qualified.
    pub object_name: String,
    /// Whether the name refers to a whole feature dataset.
    pub is_dataset: bool,
    /// Resolved keyword.
    pub keyword: DirectiveKeyword,
    /// Sort field for change detection, trimmed; `None` when blank.
    pub sort_field: Option<String>,
}

impl DirectiveRow {
    /// Build a directive row from raw control-table values
    /// (`OBJECT_NAME`, `IS_FDATASET`, `DIRECTIVE`, `SORT_FIELD`, ...).
    pub fn from_values(row: &[Option<String>]) -> Result<DirectiveRow> {
        let object_name = row
            .first()
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ExchangeError::Precondition(format!(
                    "{} row has an empty OBJECT_NAME",
                    PARAMS_TABLE
                ))
            })?
            .to_string();

        let is_dataset = matches!(
            row.get(1)
                .and_then(|v| v.as_deref())
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
                .as_str(),
            "1" | "true" | "yes"
        );

        let keyword = DirectiveKeyword::parse(row.get(2).and_then(|v| v.as_deref()));

        let sort_field = row
            .get(3)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from);

        Ok(DirectiveRow {
            object_name,
            is_dataset,
            keyword,
            sort_field,
        })
    }
}
