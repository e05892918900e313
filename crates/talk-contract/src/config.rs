use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use talk_crypto::VerifyingKey;
use talk_types::AccountName;

use crate::auth::KeyRegistry;
use crate::error::{ContractError, ContractResult};

/// Configuration for a locally hosted board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Account the board runs under.
    pub contract: AccountName,
    /// Where the partition snapshot (tables + journal) is kept.
    pub state_path: PathBuf,
    /// Directory holding `<account>.key` secret key files.
    pub keys_dir: PathBuf,
    /// Registered accounts and their hex-encoded public keys.
    pub accounts: BTreeMap<AccountName, String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            contract: AccountName::from_raw(TALK),
            state_path: PathBuf::from("talk-state.json"),
            keys_dir: PathBuf::from("keys"),
            accounts: BTreeMap::new(),
        }
    }
}

/// Encoding of the name `talk`.
const TALK: u64 = 0xc9a3_0000_0000_0000;

impl BoardConfig {
    /// Read a TOML configuration file.
    pub fn load(path: &Path) -> ContractResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ContractError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| ContractError::Config(format!("{}: {e}", path.display())))
    }

    /// Write this configuration as TOML.
    pub fn save(&self, path: &Path) -> ContractResult<()> {
        let text = toml::to_string_pretty(self).map_err(|e| ContractError::Config(e.to_string()))?;
        crate::persist::write_atomic(path, text.as_bytes())
    }

    /// Register `account` with a public key, replacing any previous key.
    pub fn register(&mut self, account: AccountName, key: &VerifyingKey) {
        self.accounts.insert(account, key.to_hex());
    }

    /// Path of the secret key file for `account`.
    pub fn key_path(&self, account: &AccountName) -> PathBuf {
        self.keys_dir.join(format!("{account}.key"))
    }

    /// Decode the configured accounts into a key registry.
    pub fn registry(&self) -> ContractResult<KeyRegistry> {
        let mut registry = KeyRegistry::new();
        for (account, hex_key) in &self.accounts {
            let key = VerifyingKey::from_hex(hex_key)
                .map_err(|e| ContractError::Config(format!("key for {account}: {e}")))?;
            registry.register(*account, key);
        }
        Ok(registry)
    }
}
