//! Small filesystem helpers.

use anyhow::{Context, Result};
use std::path::Path;

/// Create a directory (and parents) if it does not exist yet.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_creates_nested_path() {
        let base = std::env::temp_dir().join(format!("taskr-test-{}", uuid::Uuid::new_v4()));
        let nested = base.join("a/b/c");

        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        // Second call is a no-op
        ensure_dir(&nested).unwrap();

        std::fs::remove_dir_all(&base).unwrap();
    }
}
