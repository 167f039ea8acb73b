use crate::error::CredentialError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use rand::RngCore;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Username to password-hash mapping.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn register(&self, username: &str, password: &str) -> Result<(), CredentialError>;
    /// `Ok(false)` for an unknown user or a wrong password.
    async fn verify(&self, username: &str, password: &str) -> Result<bool, CredentialError>;
}

pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| CredentialError::Hash(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            warn!("[Credentials] Stored hash is unreadable: {}", e);
            false
        }
    }
}

/// Runs `hash_password` on the blocking pool.
async fn hash_off_runtime(password: &str) -> Result<String, CredentialError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| CredentialError::Hash(e.to_string()))?
}

async fn verify_off_runtime(password: &str, stored: String) -> Result<bool, CredentialError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

/// Credentials kept as a JSON object in a single file.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, CredentialError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, users: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        let json = serde_json::to_string_pretty(users)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for JsonFileStore {
    async fn register(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(CredentialError::EmptyField);
        }
        let hash = hash_off_runtime(password).await?;
        let _guard = self.lock.lock().await;

        let mut users = match self.load().await {
            Ok(users) => users,
            Err(CredentialError::Corrupt(e)) => {
                warn!("[Credentials] {} is corrupt ({}), starting fresh", self.path.display(), e);
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };

        if users.contains_key(username) {
            return Err(CredentialError::UsernameTaken);
        }

        users.insert(username.to_string(), hash);
        self.save(&users).await?;
        info!("[Credentials] Registered {} (total: {})", username, users.len());
        Ok(())
    }

    async fn verify(&self, username: &str, password: &str) -> Result<bool, CredentialError> {
        let stored = {
            let _guard = self.lock.lock().await;
            self.load().await?.remove(username)
        };
        match stored {
            Some(stored) => verify_off_runtime(password, stored).await,
            None => Ok(false),
        }
    }
}
