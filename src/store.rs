//! Credential storage for the CarIn client
//!
//! Holds the current access/refresh token pair in memory and mirrors it to a
//! JSON file so a session survives restarts. Both tokens are always replaced
//! or removed together.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{CarinError, Result};

/// Stored credential pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    #[serde(rename = "token")]
    pub access_token: String,
    pub refresh_token: String,
    pub updated_at: DateTime<Utc>,
}

impl StoredCredential {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            updated_at: Utc::now(),
        }
    }
}

/// Credential storage configuration
#[derive(Debug, Clone, Default)]
pub struct CredentialStoreConfig {
    /// Mirror the credential to `storage_path`; otherwise memory only
    pub enabled: bool,
    pub storage_path: Option<PathBuf>,
    pub encryption_key: Option<String>,
}

impl CredentialStoreConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            storage_path: Some(path.into()),
            encryption_key: None,
        }
    }
}

/// Credential store shared by every component that issues requests
#[derive(Debug)]
pub struct CredentialStore {
    config: CredentialStoreConfig,
    credential: RwLock<Option<StoredCredential>>,
}

impl CredentialStore {
    pub fn new(config: CredentialStoreConfig) -> Result<Self> {
        let credential = if config.enabled {
            Self::load_credential(&config)?
        } else {
            None
        };

        Ok(Self {
            config,
            credential: RwLock::new(credential),
        })
    }

    /// In-memory store with nothing persisted
    pub fn in_memory() -> Self {
        Self {
            config: CredentialStoreConfig::memory(),
            credential: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<StoredCredential> {
        self.read().clone()
    }

    pub fn has_credential(&self) -> bool {
        self.read().is_some()
    }

    /// Replace both tokens. The file is written before the in-memory copy is
    /// swapped, and both happen under the write lock.
    pub fn set(&self, credential: StoredCredential) -> Result<()> {
        let mut slot = self.write();
        self.save_credential(Some(&credential))?;
        *slot = Some(credential);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let mut slot = self.write();
        self.save_credential(None)?;
        *slot = None;
        Ok(())
    }

    /// Replace the pair only while it still holds `refresh_token`.
    /// Returns `false`, and leaves the store alone, once a newer login or a
    /// logout has taken its place.
    pub fn replace_if(&self, refresh_token: &str, credential: StoredCredential) -> Result<bool> {
        let mut slot = self.write();
        if !holds(&slot, refresh_token) {
            return Ok(false);
        }
        self.save_credential(Some(&credential))?;
        *slot = Some(credential);
        Ok(true)
    }

    /// Clear the pair only while it still holds `refresh_token`
    pub fn clear_if(&self, refresh_token: &str) -> Result<bool> {
        let mut slot = self.write();
        if !holds(&slot, refresh_token) {
            return Ok(false);
        }
        self.save_credential(None)?;
        *slot = None;
        Ok(true)
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.config.storage_path.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<StoredCredential>> {
        self.credential.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<StoredCredential>> {
        self.credential.write().unwrap_or_else(|e| e.into_inner())
    }

    fn get_storage_path(config: &CredentialStoreConfig) -> Result<PathBuf> {
        config
            .storage_path
            .clone()
            .ok_or_else(|| CarinError::invalid_input("Credential storage path not configured"))
    }

    fn load_credential(config: &CredentialStoreConfig) -> Result<Option<StoredCredential>> {
        let path = Self::get_storage_path(config)?;

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| CarinError::io_from_error("Failed to read credential storage", e))?;

        if content.trim().is_empty() {
            return Ok(None);
        }

        let decrypted_content = match &config.encryption_key {
            Some(key) => decrypt_content(&content, key)?,
            None => content,
        };

        serde_json::from_str(&decrypted_content).map_err(|e| {
            CarinError::internal(format!("Failed to parse credential storage: {}", e))
        })
    }

    fn save_credential(&self, credential: Option<&StoredCredential>) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let path = Self::get_storage_path(&self.config)?;

        if credential.is_none() {
            return match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(CarinError::io_from_error(
                    "Failed to remove credential storage",
                    e,
                )),
            };
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CarinError::io_from_error("Failed to create storage directory", e)
            })?;
        }

        let content = serde_json::to_string_pretty(&credential)?;
        let final_content = match &self.config.encryption_key {
            Some(key) => encrypt_content(&content, key)?,
            None => content,
        };

        // Write to a sibling and rename so a crash never leaves half a pair on disk
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, final_content)
            .map_err(|e| CarinError::io_from_error("Failed to write credential storage", e))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| CarinError::io_from_error("Failed to replace credential storage", e))?;

        Ok(())
    }
}

fn holds(slot: &Option<StoredCredential>, refresh_token: &str) -> bool {
    slot.as_ref()
        .is_some_and(|credential| credential.refresh_token == refresh_token)
}

fn encrypt_content(content: &str, key: &str) -> Result<String> {
    let key_bytes = key.as_bytes();
    if key_bytes.is_empty() {
        return Err(CarinError::config("Credential encryption key cannot be empty"));
    }

    let encrypted: Vec<u8> = content
        .as_bytes()
        .iter()
        .enumerate()
        .map(|(i, &byte)| byte ^ key_bytes[i % key_bytes.len()])
        .collect();

    Ok(base64::engine::general_purpose::STANDARD.encode(encrypted))
}

fn decrypt_content(encrypted_content: &str, key: &str) -> Result<String> {
    let key_bytes = key.as_bytes();
    if key_bytes.is_empty() {
        return Err(CarinError::config("Credential encryption key cannot be empty"));
    }

    let encrypted_bytes = base64::engine::general_purpose::STANDARD
        .decode(encrypted_content.trim())
        .map_err(|e| CarinError::internal(format!("Failed to decode credential storage: {}", e)))?;

    let decrypted: Vec<u8> = encrypted_bytes
        .iter()
        .enumerate()
        .map(|(i, &byte)| byte ^ key_bytes[i % key_bytes.len()])
        .collect();

    String::from_utf8(decrypted)
        .map_err(|e| CarinError::internal(format!("Failed to decode credential storage: {}", e)))
}
