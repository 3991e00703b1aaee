//! One side's view of a geodatabase: the transferable objects it holds.

use serde::{Deserialize, Serialize};

use super::QualifiedName;
use crate::protocol;

/// A feature class together with its optional enclosing feature dataset.
///
/// Tables and rasters never have a container, so they are held as bare
/// [`QualifiedName`]s in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// The feature class itself.
    pub name: QualifiedName,
    /// Enclosing feature dataset, or `None` for a stand-alone class.
    pub dataset: Option<QualifiedName>,
}

/// The set of data objects visible in one geodatabase, partitioned by kind.
///
/// Reserved protocol control-table names never enter a catalog; they are
/// protocol metadata, not transferable content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Feature classes, each with its optional container.
    pub feature_classes: Vec<CatalogEntry>,
    /// Non-spatial tables.
    pub tables: Vec<QualifiedName>,
    /// Raster datasets.
    pub rasters: Vec<QualifiedName>,
    /// Feature datasets present but holding no feature classes. Only
    /// meaningful on the target side, where such datasets still count as
    /// existing containers.
    pub empty_datasets: Vec<QualifiedName>,
}

impl Catalog {
    /// Add a feature class with its optional container.
    pub fn add_feature_class(&mut self, name: QualifiedName, dataset: Option<QualifiedName>) {
        self.feature_classes.push(CatalogEntry { name, dataset });
    }

    /// Add a table unless its local name is a reserved control-table name.
    pub fn add_table(&mut self, name: QualifiedName) {
        if !protocol::is_reserved_table(name.local()) {
            self.tables.push(name);
        }
    }

    /// Add a raster dataset.
    pub fn add_raster(&mut self, name: QualifiedName) {
        self.rasters.push(name);
    }

    /// Find a feature class by case-insensitive local name.
    pub fn find_feature_class(&self, local: &str) -> Option<&CatalogEntry> {
        self.feature_classes
            .iter()
            .find(|e| e.name.matches_local(local))
    }

    /// Find a feature class by case-insensitive qualified name.
    pub fn find_feature_class_qualified(&self, qualified: &str) -> Option<&CatalogEntry> {
        self.feature_classes
            .iter()
            .find(|e| e.name.matches_qualified(qualified))
    }

    /// Find a table by case-insensitive local name.
    pub fn find_table(&self, local: &str) -> Option<&QualifiedName> {
        self.tables.iter().find(|n| n.matches_local(local))
    }

    /// Find a table by case-insensitive qualified name.
    pub fn find_table_qualified(&self, qualified: &str) -> Option<&QualifiedName> {
        self.tables.iter().find(|n| n.matches_qualified(qualified))
    }

    /// Find a raster by case-insensitive local name.
    pub fn find_raster(&self, local: &str) -> Option<&QualifiedName> {
        self.rasters.iter().find(|n| n.matches_local(local))
    }

    /// Find a raster by case-insensitive qualified name.
    pub fn find_raster_qualified(&self, qualified: &str) -> Option<&QualifiedName> {
        self.rasters.iter().find(|n| n.matches_qualified(qualified))
    }

    /// Find a feature dataset by case-insensitive qualified name, looking
    /// through both populated containers and empty datasets.
    pub fn find_dataset_qualified(&self, qualified: &str) -> Option<QualifiedName> {
        self.feature_classes
            .iter()
            .filter_map(|e| e.dataset.as_ref())
            .find(|d| d.matches_qualified(qualified))
            .or_else(|| {
                self.empty_datasets
                    .iter()
                    .find(|d| d.matches_qualified(qualified))
            })
            .cloned()
    }

    /// Whether a feature dataset with this local name exists on this side,
    /// counting empty datasets.
    pub fn has_dataset(&self, local: &str) -> bool {
        self.feature_classes
            .iter()
            .filter_map(|e| e.dataset.as_ref())
            .any(|d| d.matches_local(local))
            || self.empty_datasets.iter().any(|d| d.matches_local(local))
    }

    /// The prefixed dataset name for a dataset local name, if present.
    pub fn dataset_qualified(&self, local: &str) -> Option<QualifiedName> {
        self.feature_classes
            .iter()
            .filter_map(|e| e.dataset.as_ref())
            .find(|d| d.matches_local(local))
            .or_else(|| self.empty_datasets.iter().find(|d| d.matches_local(local)))
            .cloned()
    }

    /// All feature classes inside a dataset, matched by the dataset's
    /// qualified name.
    pub fn feature_classes_in(&self, dataset_qualified: &str) -> Vec<&CatalogEntry> {
        self.feature_classes
            .iter()
            .filter(|e| {
                e.dataset
                    .as_ref()
                    .map(|d| d.matches_qualified(dataset_qualified))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Total transferable object count.
    pub fn len(&self) -> usize {
        self.feature_classes.len() + self.tables.len() + self.rasters.len()
    }

    /// Whether the catalog holds no transferable objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
