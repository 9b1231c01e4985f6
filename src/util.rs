use crate::config::Config;
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

/// Lays out `final/`, `items/` and `logs/` under a job directory.
///
/// A reused job directory loses its previous `final/` and `items/` contents
/// and `index.json`, so every output there belongs to the current run.
pub fn prepare_job_dir(job_dir: &Path) -> Result<()> {
    for sub in ["final", "items"] {
        let dir = job_dir.join(sub);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("clearing stale outputs: {}", dir.display()))?;
        }
        ensure_dir(&dir)?;
    }
    let index = job_dir.join("index.json");
    if index.exists() {
        std::fs::remove_file(&index)
            .with_context(|| format!("removing stale index: {}", index.display()))?;
    }
    ensure_dir(&job_dir.join("logs"))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Content hash of an image buffer according to `hashing.mode`.
///
/// `fast_2x16mb` hashes the leading and trailing windows plus the length, so
/// two buffers that differ only in the middle collide. That is acceptable for
/// job ids, which only need to be stable.
pub fn hash_bytes(cfg: &Config, bytes: &[u8]) -> Result<String> {
    match cfg.hashing.mode.as_str() {
        "full_sha256" => Ok(sha256_hex(bytes)),
        "fast_2x16mb" => {
            let size = bytes.len();
            let w = usize::try_from(cfg.hashing.fast_window_bytes)
                .unwrap_or(usize::MAX)
                .min(size);
            let mut h = Sha256::new();
            if w > 0 {
                h.update(&bytes[..w]);
                if size > w {
                    h.update(&bytes[size - w..]);
                }
            }
            h.update((size as u64).to_le_bytes());
            Ok(format!("{:x}", h.finalize()))
        }
        _ => anyhow::bail!("unknown hashing.mode: {}", cfg.hashing.mode),
    }
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    std::fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
}

pub fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}
