use std::fmt;
use std::sync::Arc;

use ed25519_dalek::SigningKey;

use near_selector_core::{PortError, StoragePort};

const ED25519_PREFIX: &str = "ed25519:";

/// ed25519 key pair in NEAR's string encoding (`ed25519:<base58>`).
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish()
    }
}

impl KeyPair {
    pub fn from_random() -> Result<Self, PortError> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed)
            .map_err(|e| PortError::Transport(format!("key generation failed: {e}")))?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Accepts both the 64-byte `seed || public key` form and a bare 32-byte seed.
    pub fn from_secret_key(encoded: &str) -> Result<Self, PortError> {
        let raw = encoded.strip_prefix(ED25519_PREFIX).unwrap_or(encoded);
        let bytes = bs58::decode(raw)
            .into_vec()
            .map_err(|e| PortError::Validation(format!("invalid secret key encoding: {e}")))?;
        let signing_key = match bytes.len() {
            64 => {
                let mut buf = [0u8; 64];
                buf.copy_from_slice(&bytes);
                SigningKey::from_keypair_bytes(&buf)
                    .map_err(|e| PortError::Validation(format!("invalid secret key: {e}")))?
            }
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                SigningKey::from_bytes(&seed)
            }
            n => {
                return Err(PortError::Validation(format!(
                    "secret key must be 32 or 64 bytes, got {n}"
                )))
            }
        };
        Ok(Self { signing_key })
    }

    pub fn public_key(&self) -> String {
        format!(
            "{ED25519_PREFIX}{}",
            bs58::encode(self.signing_key.verifying_key().as_bytes()).into_string()
        )
    }

    pub fn secret_key(&self) -> String {
        format!(
            "{ED25519_PREFIX}{}",
            bs58::encode(self.signing_key.to_keypair_bytes()).into_string()
        )
    }
}

/// Key store laid out like near-api-js' `BrowserLocalStorageKeyStore`:
/// one entry per `<prefix><account id>:<network id>`.
#[derive(Clone)]
pub struct KeyStore {
    storage: Arc<dyn StoragePort>,
    prefix: String,
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl KeyStore {
    pub fn new(storage: Arc<dyn StoragePort>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    fn storage_key(&self, network_id: &str, account_id: &str) -> String {
        format!("{}{account_id}:{network_id}", self.prefix)
    }

    pub fn set_key(
        &self,
        network_id: &str,
        account_id: &str,
        key_pair: &KeyPair,
    ) -> Result<(), PortError> {
        self.storage.set_item(
            &self.storage_key(network_id, account_id),
            &key_pair.secret_key(),
        )
    }

    pub fn get_key(&self, network_id: &str, account_id: &str) -> Result<Option<KeyPair>, PortError> {
        match self
            .storage
            .get_item(&self.storage_key(network_id, account_id))?
        {
            Some(secret) => KeyPair::from_secret_key(&secret).map(Some),
            None => Ok(None),
        }
    }

    pub fn remove_key(&self, network_id: &str, account_id: &str) -> Result<(), PortError> {
        self.storage
            .remove_item(&self.storage_key(network_id, account_id))
    }

    pub fn clear(&self) -> Result<(), PortError> {
        for key in self.own_keys()? {
            self.storage.remove_item(&key)?;
        }
        Ok(())
    }

    pub fn get_accounts(&self, network_id: &str) -> Result<Vec<String>, PortError> {
        let suffix = format!(":{network_id}");
        Ok(self
            .own_keys()?
            .iter()
            .filter_map(|k| k[self.prefix.len()..].strip_suffix(&suffix))
            .map(str::to_owned)
            .collect())
    }

    fn own_keys(&self) -> Result<Vec<String>, PortError> {
        Ok(self
            .storage
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(&self.prefix))
            .collect())
    }
}
