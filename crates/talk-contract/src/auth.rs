use std::collections::{BTreeMap, BTreeSet};

use talk_crypto::VerifyingKey;
use talk_types::AccountName;
use tracing::debug;

use crate::action::SignedAction;
use crate::error::{ContractError, ContractResult};

/// Proof of which accounts authorized the current invocation.
///
/// Actions call [`AuthContext::require_auth`] before touching state and
/// never look at how the authority was established.
pub trait AuthContext {
    /// Fail with [`ContractError::Unauthorized`] unless `account` authorized
    /// this invocation.
    fn require_auth(&self, account: &AccountName) -> ContractResult<()>;
}

/// The set of accounts whose authority has been established.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Authority {
    accounts: BTreeSet<AccountName>,
}

impl Authority {
    /// Authority for the given accounts, already proven by the caller.
    pub fn new(accounts: impl IntoIterator<Item = AccountName>) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
        }
    }

    /// Authority of a single account.
    pub fn single(account: AccountName) -> Self {
        Self::new([account])
    }

    pub fn accounts(&self) -> impl Iterator<Item = &AccountName> {
        self.accounts.iter()
    }

    pub fn contains(&self, account: &AccountName) -> bool {
        self.accounts.contains(account)
    }
}

impl AuthContext for Authority {
    fn require_auth(&self, account: &AccountName) -> ContractResult<()> {
        if self.accounts.contains(account) {
            Ok(())
        } else {
            Err(ContractError::Unauthorized { account: *account })
        }
    }
}

/// Registered public keys, one per account.
#[derive(Clone, Debug, Default)]
pub struct KeyRegistry {
    keys: BTreeMap<AccountName, VerifyingKey>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the key for `account`.
    pub fn register(&mut self, account: AccountName, key: VerifyingKey) {
        self.keys.insert(account, key);
    }

    pub fn key_for(&self, account: &AccountName) -> Option<&VerifyingKey> {
        self.keys.get(account)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Check every signature on `signed` against the registered keys.
    ///
    /// A signature from an unknown account, or one that does not verify,
    /// rejects the whole invocation as unauthorized for that account.
    pub fn verify(&self, signed: &SignedAction) -> ContractResult<Authority> {
        let digest = signed.digest()?;
        let mut accounts = BTreeSet::new();

        for entry in &signed.signatures {
            let key = self
                .keys
                .get(&entry.account)
                .ok_or(ContractError::Unauthorized {
                    account: entry.account,
                })?;
            key.verify(&digest, &entry.signature)
                .map_err(|_| ContractError::Unauthorized {
                    account: entry.account,
                })?;
            accounts.insert(entry.account);
        }

        debug!(signers = accounts.len(), "signatures verified");
        Ok(Authority { accounts })
    }
}

/// `(account, nonce)` pairs consumed by accepted actions.
///
/// Built up as actions are applied and rebuilt from the journal on restore,
/// so a signed action that was accepted once is refused afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NonceLedger {
    used: BTreeSet<(AccountName, u64)>,
}

impl NonceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`ContractError::Unauthorized`] for the first signer that
    /// already spent this action's nonce.
    pub fn check(&self, signed: &SignedAction) -> ContractResult<()> {
        match signed
            .signers()
            .find(|account| self.used.contains(&(*account, signed.nonce)))
        {
            Some(account) => Err(ContractError::Unauthorized { account }),
            None => Ok(()),
        }
    }

    /// Mark the action's nonce as spent for every signer.
    pub fn record(&mut self, signed: &SignedAction) {
        for account in signed.signers() {
            self.used.insert((account, signed.nonce));
        }
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
