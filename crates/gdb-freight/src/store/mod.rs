//! Storage seam: the catalog/storage primitives consumed from the external
//! toolkit, expressed as traits.
//!
//! [`GeoWorkspace`] is one side's view (enumeration, control-table rows, row
//! bookkeeping); [`Courier`] carries the cross-side primitives (copy, append,
//! compare) that need both endpoints at once. The library ships an in-memory
//! implementation ([`memory`]) and a YAML-snapshot-backed one ([`file`]) so
//! the pipeline runs end to end without a proprietary toolkit.

pub mod file;
pub mod memory;

use std::fmt;

use async_trait::async_trait;

use crate::core::{Catalog, QualifiedName};
use crate::error::Result;

pub use file::{load_workspace, save_workspace};
pub use memory::{MemoryCourier, MemoryGdb, MemoryWorkspace};

/// Address of a data object inside a workspace: an optional enclosing feature
/// dataset plus the (possibly schema-qualified) object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    /// Enclosing feature dataset, or `None` for a stand-alone object.
    pub dataset: Option<String>,
    /// Object name, qualified when the side uses schema prefixes.
    pub name: String,
}

impl ObjectPath {
    /// A stand-alone object.
    pub fn standalone(name: impl Into<String>) -> Self {
        Self {
            dataset: None,
            name: name.into(),
        }
    }

    /// An object inside a feature dataset.
    pub fn in_dataset(dataset: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            dataset: Some(dataset.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dataset {
            Some(ds) => write!(f, "{}/{}", ds, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Result of comparing a source object against its target counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareOutcome {
    /// No difference found; the write can be skipped.
    Same,
    /// The sides differ; replace the target rows.
    Different,
    /// Comparison couldn't run (e.g. the sort field is absent on one side).
    /// Non-fatal: the object's update is skipped.
    Error(String),
}

/// One side's catalog and row primitives.
///
/// Enumeration methods return qualified names as the store reports them;
/// prefix handling belongs to the caller. `list_tables` reports every table
/// including the protocol control tables; [`Catalog`] filtering happens at
/// catalog-building time.
#[async_trait]
pub trait GeoWorkspace: Send + Sync {
    /// Human-readable locator for log messages.
    fn location(&self) -> String;

    /// Whether the workspace is reachable at all.
    async fn exists(&self) -> bool;

    /// Qualified names of all feature datasets.
    async fn list_datasets(&self) -> Result<Vec<String>>;

    /// Qualified names of feature classes, either inside the given dataset
    /// (by qualified name) or stand-alone when `dataset` is `None`.
    async fn list_feature_classes(&self, dataset: Option<&str>) -> Result<Vec<String>>;

    /// Qualified names of all tables, control tables included.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Qualified names of all raster datasets.
    async fn list_rasters(&self) -> Result<Vec<String>>;

    /// Read all rows of a table, projected to the given fields. A field
    /// absent from the table reads as `None`.
    async fn read_rows(&self, table: &str, fields: &[&str]) -> Result<Vec<Vec<Option<String>>>>;

    /// Row count of a feature class or table.
    async fn row_count(&self, path: &ObjectPath) -> Result<i64>;

    /// Delete every row of a feature class or table, keeping its schema.
    async fn delete_rows(&self, path: &ObjectPath) -> Result<()>;

    /// Delete a whole data object. Fails when the object is locked.
    async fn delete_object(&self, path: &ObjectPath) -> Result<()>;

    /// Create an empty feature dataset. Idempotent per run by contract: the
    /// planner dedupes creation requests before this is called.
    async fn create_dataset(&self, name: &str) -> Result<()>;

    /// Append one row to a table, values aligned to `fields` by name.
    async fn insert_row(&self, table: &str, fields: &[&str], values: &[String]) -> Result<()>;
}

/// Cross-side transfer primitives.
#[async_trait]
pub trait Courier: Send + Sync {
    /// Copy a whole object (schema, rows, metadata) from source to target.
    async fn copy_object(&self, source: &ObjectPath, target: &ObjectPath) -> Result<()>;

    /// Append all source rows to the existing target object. Fields are
    /// matched by name; target-only fields fill with nulls, source-only
    /// fields don't carry over.
    async fn append_rows(&self, source: &ObjectPath, target: &ObjectPath) -> Result<()>;

    /// Compare the two sides, sorting both by `sort_field`.
    async fn compare_objects(
        &self,
        source: &ObjectPath,
        target: &ObjectPath,
        sort_field: &str,
        non_spatial: bool,
    ) -> CompareOutcome;
}

/// Enumerate one side into a [`Catalog`].
///
/// Feature classes are collected per dataset first, then stand-alone ones;
/// datasets holding no feature classes are recorded as empty (they still
/// count as existing containers on the target side). Reserved control tables
/// are dropped by the catalog itself.
pub async fn load_catalog(ws: &dyn GeoWorkspace) -> Result<Catalog> {
    let mut catalog = Catalog::default();

    for dataset in ws.list_datasets().await? {
        let members = ws.list_feature_classes(Some(&dataset)).await?;
        if members.is_empty() {
            catalog.empty_datasets.push(QualifiedName::parse(&dataset));
        } else {
            for fc in members {
                catalog.add_feature_class(
                    QualifiedName::parse(&fc),
                    Some(QualifiedName::parse(&dataset)),
                );
            }
        }
    }

    for fc in ws.list_feature_classes(None).await? {
        catalog.add_feature_class(QualifiedName::parse(&fc), None);
    }
    for table in ws.list_tables().await? {
        catalog.add_table(QualifiedName::parse(&table));
    }
    for raster in ws.list_rasters().await? {
        catalog.add_raster(QualifiedName::parse(&raster));
    }

    Ok(catalog)
}

/// Find a control table by local name, returning its qualified name as the
/// store reports it.
pub async fn find_control_table(ws: &dyn GeoWorkspace, local: &str) -> Result<Option<String>> {
    Ok(ws
        .list_tables()
        .await?
        .into_iter()
        .find(|t| QualifiedName::parse(t).matches_local(local)))
}
