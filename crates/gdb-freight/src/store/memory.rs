//! In-memory geodatabase backend.
//!
//! [`MemoryGdb`] models one workspace's content as plain rows and is fully
//! serde-able, which lets the file backend persist a whole workspace as one
//! YAML document. Object keys are local names; listing applies the
//! workspace's schema prefix, so an enterprise-style store is just a prefix
//! plus the same maps.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::QualifiedName;
use crate::error::{ExchangeError, Result};
use crate::store::{CompareOutcome, Courier, GeoWorkspace, ObjectPath};

/// Rows of a non-spatial table or of a feature class's attribute table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableData {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableData {
    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.eq_ignore_ascii_case(name))
    }
}

/// A feature class: attribute rows plus its optional enclosing dataset
/// (stored by local name).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureClassData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(flatten)]
    pub table: TableData,
}

/// A raster dataset, modeled as an opaque content blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterData {
    #[serde(default)]
    pub content: String,
    /// Simulates a schema lock held by another session: deleting the raster
    /// fails while set.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub locked: bool,
}

/// One workspace's entire content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryGdb {
    /// Schema prefix applied when listing, with trailing dot
    /// (e.g. `"GIS.OWNER."`), or empty for a file-style store.
    #[serde(default)]
    pub prefix: String,
    /// Feature dataset local names, empty ones included.
    #[serde(default)]
    pub datasets: Vec<String>,
    #[serde(default)]
    pub feature_classes: BTreeMap<String, FeatureClassData>,
    #[serde(default)]
    pub tables: BTreeMap<String, TableData>,
    #[serde(default)]
    pub rasters: BTreeMap<String, RasterData>,
}

impl MemoryGdb {
    fn qualify(&self, local: &str) -> String {
        format!("{}{}", self.prefix, local)
    }

    fn resolve<'a, T>(map: &'a BTreeMap<String, T>, name: &str) -> Option<&'a str> {
        let local = QualifiedName::parse(name);
        map.keys()
            .find(|k| local.matches_local(k.as_str()))
            .map(String::as_str)
    }

    fn resolve_dataset(&self, name: &str) -> Option<&str> {
        let local = QualifiedName::parse(name);
        self.datasets
            .iter()
            .find(|d| local.matches_local(d.as_str()))
            .map(String::as_str)
    }

    fn rows_of(&self, path: &ObjectPath) -> Result<&TableData> {
        if let Some(key) = Self::resolve(&self.feature_classes, &path.name) {
            return Ok(&self.feature_classes[key].table);
        }
        if let Some(key) = Self::resolve(&self.tables, &path.name) {
            return Ok(&self.tables[key]);
        }
        Err(ExchangeError::store(format!(
            "no feature class or table named {}",
            path
        )))
    }

    fn rows_of_mut(&mut self, path: &ObjectPath) -> Result<&mut TableData> {
        if let Some(key) = Self::resolve(&self.feature_classes, &path.name) {
            let key = key.to_string();
            return Ok(&mut self.feature_classes.get_mut(&key).unwrap().table);
        }
        if let Some(key) = Self::resolve(&self.tables, &path.name) {
            let key = key.to_string();
            return Ok(self.tables.get_mut(&key).unwrap());
        }
        Err(ExchangeError::store(format!(
            "no feature class or table named {}",
            path
        )))
    }
}

/// [`GeoWorkspace`] over a shared [`MemoryGdb`].
#[derive(Debug, Clone)]
pub struct MemoryWorkspace {
    location: String,
    gdb: Arc<Mutex<MemoryGdb>>,
}

impl MemoryWorkspace {
    pub fn new(location: impl Into<String>, gdb: MemoryGdb) -> Self {
        Self {
            location: location.into(),
            gdb: Arc::new(Mutex::new(gdb)),
        }
    }

    /// A consistent copy of the current content.
    pub fn snapshot(&self) -> MemoryGdb {
        self.gdb.lock().unwrap().clone()
    }

    /// Pair this workspace with another into a [`Courier`].
    pub fn courier_to(&self, target: &MemoryWorkspace) -> MemoryCourier {
        MemoryCourier {
            source: self.clone(),
            target: target.clone(),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&MemoryGdb) -> T) -> T {
        f(&self.gdb.lock().unwrap())
    }

    /// Direct mutable access to the content, mainly for fixture setup.
    pub fn with_mut<T>(&self, f: impl FnOnce(&mut MemoryGdb) -> T) -> T {
        f(&mut self.gdb.lock().unwrap())
    }
}

#[async_trait]
impl GeoWorkspace for MemoryWorkspace {
    fn location(&self) -> String {
        self.location.clone()
    }

    async fn exists(&self) -> bool {
        true
    }

    async fn list_datasets(&self) -> Result<Vec<String>> {
        Ok(self.with(|g| g.datasets.iter().map(|d| g.qualify(d)).collect()))
    }

    async fn list_feature_classes(&self, dataset: Option<&str>) -> Result<Vec<String>> {
        self.with(|g| {
            let wanted = match dataset {
                Some(name) => match g.resolve_dataset(name) {
                    Some(local) => Some(local.to_string()),
                    None => {
                        return Err(ExchangeError::store(format!(
                            "no feature dataset named {}",
                            name
                        )))
                    }
                },
                None => None,
            };
            Ok(g.feature_classes
                .iter()
                .filter(|(_, fc)| match (&wanted, &fc.dataset) {
                    (Some(w), Some(d)) => w.eq_ignore_ascii_case(d),
                    (None, None) => true,
                    _ => false,
                })
                .map(|(name, _)| g.qualify(name))
                .collect())
        })
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.with(|g| g.tables.keys().map(|t| g.qualify(t)).collect()))
    }

    async fn list_rasters(&self) -> Result<Vec<String>> {
        Ok(self.with(|g| g.rasters.keys().map(|r| g.qualify(r)).collect()))
    }

    async fn read_rows(&self, table: &str, fields: &[&str]) -> Result<Vec<Vec<Option<String>>>> {
        self.with(|g| {
            let data = g.rows_of(&ObjectPath::standalone(table))?;
            let indices: Vec<Option<usize>> =
                fields.iter().map(|f| data.field_index(f)).collect();
            Ok(data
                .rows
                .iter()
                .map(|row| {
                    indices
                        .iter()
                        .map(|i| i.and_then(|i| row.get(i).cloned().flatten()))
                        .collect()
                })
                .collect())
        })
    }

    async fn row_count(&self, path: &ObjectPath) -> Result<i64> {
        self.with(|g| Ok(g.rows_of(path)?.rows.len() as i64))
    }

    async fn delete_rows(&self, path: &ObjectPath) -> Result<()> {
        self.with_mut(|g| {
            g.rows_of_mut(path)?.rows.clear();
            Ok(())
        })
    }

    async fn delete_object(&self, path: &ObjectPath) -> Result<()> {
        self.with_mut(|g| {
            if let Some(key) = MemoryGdb::resolve(&g.rasters, &path.name) {
                let key = key.to_string();
                if g.rasters[&key].locked {
                    return Err(ExchangeError::store(format!(
                        "cannot acquire a schema lock on raster dataset {}",
                        path
                    )));
                }
                g.rasters.remove(&key);
                return Ok(());
            }
            if let Some(key) = MemoryGdb::resolve(&g.feature_classes, &path.name) {
                let key = key.to_string();
                g.feature_classes.remove(&key);
                return Ok(());
            }
            if let Some(key) = MemoryGdb::resolve(&g.tables, &path.name) {
                let key = key.to_string();
                g.tables.remove(&key);
                return Ok(());
            }
            Err(ExchangeError::store(format!("no object named {}", path)))
        })
    }

    async fn create_dataset(&self, name: &str) -> Result<()> {
        self.with_mut(|g| {
            let local = QualifiedName::parse(name).local().to_string();
            if g.resolve_dataset(&local).is_none() {
                g.datasets.push(local);
            }
            Ok(())
        })
    }

    async fn insert_row(&self, table: &str, fields: &[&str], values: &[String]) -> Result<()> {
        self.with_mut(|g| {
            let data = g.rows_of_mut(&ObjectPath::standalone(table))?;
            let row = data
                .fields
                .clone()
                .iter()
                .map(|f| {
                    fields
                        .iter()
                        .position(|n| n.eq_ignore_ascii_case(f))
                        .and_then(|i| values.get(i).cloned())
                })
                .collect();
            data.rows.push(row);
            Ok(())
        })
    }
}

/// [`Courier`] between two in-memory workspaces.
#[derive(Debug, Clone)]
pub struct MemoryCourier {
    source: MemoryWorkspace,
    target: MemoryWorkspace,
}

#[async_trait]
impl Courier for MemoryCourier {
    async fn copy_object(&self, source: &ObjectPath, target: &ObjectPath) -> Result<()> {
        let target_local = QualifiedName::parse(&target.name).local().to_string();
        let target_dataset = target
            .dataset
            .as_deref()
            .map(|d| QualifiedName::parse(d).local().to_string());

        let src = self.source.gdb.lock().unwrap();
        let mut dst = self.target.gdb.lock().unwrap();

        if let Some(key) = MemoryGdb::resolve(&src.feature_classes, &source.name) {
            let mut fc = src.feature_classes[key].clone();
            fc.dataset = target_dataset;
            dst.feature_classes.insert(target_local, fc);
            return Ok(());
        }
        if let Some(key) = MemoryGdb::resolve(&src.tables, &source.name) {
            let data = src.tables[key].clone();
            dst.tables.insert(target_local, data);
            return Ok(());
        }
        if let Some(key) = MemoryGdb::resolve(&src.rasters, &source.name) {
            let data = src.rasters[key].clone();
            dst.rasters.insert(target_local, data);
            return Ok(());
        }
        Err(ExchangeError::store(format!(
            "no source object named {}",
            source
        )))
    }

    async fn append_rows(&self, source: &ObjectPath, target: &ObjectPath) -> Result<()> {
        let src = self.source.gdb.lock().unwrap();
        let mut dst = self.target.gdb.lock().unwrap();

        let src_data = src.rows_of(source)?.clone();
        let dst_data = dst.rows_of_mut(target)?;

        // Schema mismatches don't fail the append; unmatched target fields
        // fill with nulls, unmatched source fields drop.
        let indices: Vec<Option<usize>> = dst_data
            .fields
            .iter()
            .map(|f| src_data.field_index(f))
            .collect();
        for row in &src_data.rows {
            dst_data.rows.push(
                indices
                    .iter()
                    .map(|i| i.and_then(|i| row.get(i).cloned().flatten()))
                    .collect(),
            );
        }
        Ok(())
    }

    async fn compare_objects(
        &self,
        source: &ObjectPath,
        target: &ObjectPath,
        sort_field: &str,
        _non_spatial: bool,
    ) -> CompareOutcome {
        let src = self.source.gdb.lock().unwrap();
        let dst = self.target.gdb.lock().unwrap();

        let (src_data, dst_data) = match (src.rows_of(source), dst.rows_of(target)) {
            (Ok(s), Ok(d)) => (s, d),
            (Err(e), _) | (_, Err(e)) => return CompareOutcome::Error(e.to_string()),
        };

        let (si, di) = match (
            src_data.field_index(sort_field),
            dst_data.field_index(sort_field),
        ) {
            (Some(s), Some(d)) => (s, d),
            _ => {
                return CompareOutcome::Error(format!(
                    "sort field {} is missing on one side",
                    sort_field
                ))
            }
        };

        let normalize = |data: &TableData, idx: usize| -> Vec<Vec<Option<String>>> {
            let mut rows = data.rows.clone();
            rows.sort_by(|a, b| a.get(idx).cmp(&b.get(idx)));
            rows
        };

        let fields_match = src_data.fields.len() == dst_data.fields.len()
            && src_data
                .fields
                .iter()
                .zip(&dst_data.fields)
                .all(|(a, b)| a.eq_ignore_ascii_case(b));

        if fields_match && normalize(src_data, si) == normalize(dst_data, di) {
            CompareOutcome::Same
        } else {
            CompareOutcome::Different
        }
    }
}
