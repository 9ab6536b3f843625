use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

/// Persist subtitle bytes atomically: write to a temp file in the target's
/// directory, then rename over the destination. An aborted run can never
/// leave a partial `.srt` at the final path.
pub fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    let dir = target.parent().filter(|p| !p.as_os_str().is_empty());
    let dir = dir.unwrap_or(Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("cannot create temp file in {}", dir.display()))?;
    tmp.write_all(data)
        .with_context(|| format!("cannot write subtitle data for {}", target.display()))?;
    tmp.persist(target)
        .map_err(|e| e.error)
        .with_context(|| format!("cannot move subtitle into place at {}", target.display()))?;
    Ok(())
}
