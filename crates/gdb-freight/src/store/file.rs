//! YAML-snapshot persistence for workspaces.
//!
//! A workspace file is one [`MemoryGdb`] document. The CLI loads both sides
//! into memory, runs the exchange, and writes the target snapshot back, so a
//! whole run is reproducible from two YAML files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ExchangeError, Result};
use crate::store::memory::{MemoryGdb, MemoryWorkspace};

/// Load a workspace snapshot into a [`MemoryWorkspace`].
pub fn load_workspace(path: &Path) -> Result<MemoryWorkspace> {
    if !path.exists() {
        return Err(ExchangeError::store(format!(
            "workspace file not found: {}",
            path.display()
        )));
    }
    let content = fs::read_to_string(path)?;
    let gdb: MemoryGdb = serde_yaml::from_str(&content)?;
    debug!(
        path = %path.display(),
        objects = gdb.feature_classes.len() + gdb.tables.len() + gdb.rasters.len(),
        "loaded workspace snapshot"
    );
    Ok(MemoryWorkspace::new(path.display().to_string(), gdb))
}

/// Write a workspace's current content back to its snapshot file.
pub fn save_workspace(ws: &MemoryWorkspace, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(&ws.snapshot())
        .map_err(ExchangeError::Yaml)?;
    fs::write(path, yaml)?;
    debug!(path = %path.display(), "saved workspace snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::TableData;
    use crate::store::{GeoWorkspace, ObjectPath};

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.yaml");

        let mut gdb = MemoryGdb::default();
        gdb.tables.insert(
            "zoning".to_string(),
            TableData {
                fields: vec!["ZONE_ID".to_string()],
                rows: vec![vec![Some("A".to_string())]],
            },
        );
        let ws = MemoryWorkspace::new("hub", gdb);
        save_workspace(&ws, &path).unwrap();

        let reloaded = load_workspace(&path).unwrap();
        assert_eq!(
            reloaded
                .row_count(&ObjectPath::standalone("zoning"))
                .await
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_missing_file_is_store_error() {
        let err = load_workspace(Path::new("/nonexistent/spoke.yaml")).unwrap_err();
        assert!(matches!(err, ExchangeError::Store(_)));
    }

    #[test]
    fn test_parses_handwritten_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spoke.yaml");
        std::fs::write(
            &path,
            concat!(
                "prefix: \"GIS.\"\n",
                "datasets: [transport]\n",
                "feature_classes:\n",
                "  roads:\n",
                "    dataset: transport\n",
                "    fields: [ROAD_ID]\n",
                "    rows:\n",
                "      - [\"1\"]\n",
            ),
        )
        .unwrap();

        let ws = load_workspace(&path).unwrap();
        let snap = ws.snapshot();
        assert_eq!(snap.prefix, "GIS.");
        assert_eq!(
            snap.feature_classes["roads"].dataset.as_deref(),
            Some("transport")
        );
    }
}
