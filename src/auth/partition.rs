//! Storage partitions.
//!
//! Each login lives inside a partition: a directory under the cache dir,
//! named by a randomly generated identifier, holding the session file and the
//! on-disk query cache. Partitions are never shared between sessions, so two
//! concurrent logins (e.g. different companies) cannot see each other's
//! tokens or cached data.
//!
//! `FIELDSTOCK_PARTITION` pins a specific partition id, which lets scripts
//! reuse one session across invocations. Pinning the same id from two
//! processes duplicates the session; a known edge case, not a supported mode.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;

/// Environment variable that pins the partition id.
pub const PARTITION_ENV: &str = "FIELDSTOCK_PARTITION";

/// Length of generated partition ids in hex characters.
const PARTITION_ID_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct Partition {
    id: String,
    dir: PathBuf,
}

impl Partition {
    /// Open a partition with a specific id, creating its directory.
    pub fn open(cache_dir: &Path, id: &str) -> Result<Self> {
        let dir = cache_dir.join("partitions").join(id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create partition directory {}", dir.display()))?;
        Ok(Self {
            id: id.to_string(),
            dir,
        })
    }

    /// Open a fresh partition with a newly generated id.
    pub fn create(cache_dir: &Path) -> Result<Self> {
        Self::open(cache_dir, &generate_id())
    }

    /// Resolve the partition to use: the pinned env id if set, then the
    /// fallback recorded in config, otherwise a fresh one.
    pub fn resolve(cache_dir: &Path, last_used: Option<&str>) -> Result<Self> {
        if let Ok(id) = std::env::var(PARTITION_ENV) {
            if !id.is_empty() && is_valid_id(&id) {
                return Self::open(cache_dir, &id);
            }
            tracing::warn!(id = %id, "Ignoring invalid partition id from environment");
        }
        if let Some(id) = last_used {
            if is_valid_id(id) {
                return Self::open(cache_dir, id);
            }
        }
        Self::create(cache_dir)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Delete the partition and everything in it (session + cached data).
    pub fn destroy(&self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)
                .with_context(|| format!("Failed to remove partition {}", self.id))?;
        }
        Ok(())
    }
}

/// Generate a random hex partition id.
fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..PARTITION_ID_LEN)
        .map(|_| {
            let n: u8 = rng.gen_range(0..16);
            char::from_digit(n as u32, 16).unwrap_or('0')
        })
        .collect()
}

/// Partition ids are lowercase hex; anything else is rejected so the id is
/// always safe to use as a directory name.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_is_valid_hex() {
        let id = generate_id();
        assert_eq!(id.len(), PARTITION_ID_LEN);
        assert!(is_valid_id(&id));
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("abc123"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../escape"));
        assert!(!is_valid_id("has space"));
    }

    #[test]
    fn test_open_and_destroy() {
        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let partition = Partition::open(tmp.path(), "deadbeef").expect("Failed to open partition");
        assert!(partition.dir().exists());
        partition.destroy().expect("Failed to destroy partition");
        assert!(!partition.dir().exists());
    }
}
