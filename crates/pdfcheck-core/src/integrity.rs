// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document fingerprints — SHA-256 hashing used to record what a repair
// replaced and to confirm untouched files stayed untouched.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::Result;

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Hash the current contents of the file at `path`.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let data = std::fs::read(path.as_ref())?;
    Ok(hash_bytes(&data))
}
