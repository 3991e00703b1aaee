//! Core data model: qualified names and per-side catalogs.

mod catalog;
mod name;

pub use catalog::{Catalog, CatalogEntry};
pub use name::QualifiedName;

use serde::{Deserialize, Serialize};

/// The three transferable data-object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Spatial vector data.
    FeatureClass,
    /// Non-spatial attribute data.
    Table,
    /// Gridded imagery.
    Raster,
}

impl ObjectKind {
    /// Short label used in log notes ("feature class", "table", "raster").
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::FeatureClass => "feature class",
            ObjectKind::Table => "table",
            ObjectKind::Raster => "raster dataset",
        }
    }

    /// Whether this kind carries rows (feature classes and tables do,
    /// rasters do not).
    pub fn has_rows(&self) -> bool {
        !matches!(self, ObjectKind::Raster)
    }
}
