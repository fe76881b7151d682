use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::graph::{HierarchyGraph, HierarchySnapshot};

/// Read a serialized hierarchy (`{nodes, edges}` JSON) from disk.
pub fn read_snapshot(path: &Path) -> Result<HierarchySnapshot> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read a hierarchy from disk and build the Graph Store from it.
pub fn load_hierarchy(path: &Path) -> Result<HierarchyGraph> {
    let snapshot = read_snapshot(path)?;
    tracing::debug!(
        path = %path.display(),
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "read hierarchy snapshot"
    );
    HierarchyGraph::from_snapshot(snapshot)
}

/// Write a snapshot as pretty JSON, atomically.
///
/// Writes to a temp file in the destination directory first, then renames over `path`.
pub fn write_snapshot(path: &Path, snapshot: &HierarchySnapshot) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, snapshot)?;
    tmp.write_all(b"\n")?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
