//! Per-participant seed, kept in `seed.txt` so later visits regenerate the
//! same design.

use std::path::Path;

use rand::Rng;
use tracing::info;

use crate::error::{DesignError, Result};

pub const SEED_FILE: &str = "seed.txt";

/// Seeds drawn when none is given stay below this.
const MAX_RANDOM_SEED: u64 = 10_000_000_000;

/// Settle on a seed for `seed_file`.
///
/// A stored seed wins when none (or 0) is requested. A requested seed that
/// disagrees with the stored one is an error. With neither, a fresh seed is
/// drawn. The chosen seed is written if the file does not exist yet.
pub fn pick_seed(seed_file: &Path, requested: Option<u64>) -> Result<u64> {
    let requested = requested.filter(|seed| *seed != 0);
    let stored = read_seed(seed_file)?;

    let seed = match (stored, requested) {
        (Some(stored), Some(requested)) if stored != requested => {
            return Err(DesignError::SeedMismatch {
                path: seed_file.to_path_buf(),
                stored,
                requested,
            });
        }
        (Some(stored), _) => stored,
        (None, Some(requested)) => requested,
        (None, None) => rand::rng().random_range(1..MAX_RANDOM_SEED),
    };

    if stored.is_none() {
        std::fs::write(seed_file, seed.to_string()).map_err(|e| DesignError::io(seed_file, e))?;
        info!(path = %seed_file.display(), seed, "saved seed");
    }
    Ok(seed)
}

/// Make `dir` if needed and pick the seed kept in it.
pub fn seed_for_dir(dir: &Path, requested: Option<u64>) -> Result<u64> {
    std::fs::create_dir_all(dir).map_err(|e| DesignError::io(dir, e))?;
    pick_seed(&dir.join(SEED_FILE), requested)
}

fn read_seed(seed_file: &Path) -> Result<Option<u64>> {
    if !seed_file.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(seed_file).map_err(|e| DesignError::io(seed_file, e))?;
    let first = content.lines().next().unwrap_or("").trim();
    let seed: u64 = first.parse().map_err(|_| DesignError::BadSeedFile {
        path: seed_file.to_path_buf(),
        content: first.to_string(),
    })?;
    Ok(Some(seed).filter(|seed| *seed != 0))
}
