//! Anonymous install identity.
//!
//! The install id is a truncated SHA-256 of host data: stable across
//! restarts, not reversible to the machine. It is persisted so a later
//! hostname change does not create a new install.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Hex length of an install id (16 bytes)
pub const INSTALL_ID_LEN: usize = 32;

/// `~/.relay/install_id`, or `./.relay/install_id` without a home directory.
pub fn default_install_id_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relay")
        .join("install_id")
}

/// Derive the install id from hostname, platform and home directory.
pub fn generate_install_id() -> String {
    let mut hasher = Sha256::new();

    if let Ok(hostname) = hostname::get() {
        hasher.update(hostname.to_string_lossy().as_bytes());
    }
    hasher.update(std::env::consts::OS.as_bytes());
    hasher.update(std::env::consts::ARCH.as_bytes());
    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }

    hex::encode(&hasher.finalize()[..INSTALL_ID_LEN / 2])
}

/// Read the install id at `path`, or generate and persist a new one.
///
/// A file holding anything other than a valid id is overwritten.
pub fn load_or_create_install_id(path: &Path) -> std::io::Result<String> {
    if path.exists() {
        let id = std::fs::read_to_string(path)?.trim().to_string();
        if is_valid_install_id(&id) {
            return Ok(id);
        }
    }

    let id = generate_install_id();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &id)?;
    Ok(id)
}

fn is_valid_install_id(id: &str) -> bool {
    id.len() == INSTALL_ID_LEN && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// User id for anonymous mode: differs per session, so events from two
/// sessions of the same install cannot be joined.
pub fn session_scoped_user_id(install_id: &str, session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(install_id.as_bytes());
    hasher.update(b":");
    hasher.update(session_id.as_bytes());
    hex::encode(&hasher.finalize()[..INSTALL_ID_LEN / 2])
}
