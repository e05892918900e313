use serde::{Deserialize, Serialize};
use talk_crypto::{Digest, Domain, Signature, SigningKey};
use talk_types::{AccountName, MessageId, VoteId};

use crate::error::{ContractError, ContractResult};

/// Arguments of the `post` action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostArgs {
    /// Requested message id, or `0` to have one assigned.
    pub id: MessageId,
    /// Parent message, or `0` for a top-level post.
    pub reply_to: MessageId,
    pub author: AccountName,
    pub content: String,
}

/// Arguments of the `like` action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeArgs {
    /// Requested vote id, or `0` to have one assigned.
    pub id: VoteId,
    pub message: MessageId,
    pub voter: AccountName,
    /// `true` for a like, `false` for a dislike.
    pub like: bool,
}

/// An invocation of one of the board's entry points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Post(PostArgs),
    Like(LikeArgs),
}

impl Action {
    /// Action name as it appears in logs and receipts.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Post(_) => "post",
            Self::Like(_) => "like",
        }
    }

    /// The account whose authority the action needs.
    pub fn actor(&self) -> AccountName {
        match self {
            Self::Post(args) => args.author,
            Self::Like(args) => args.voter,
        }
    }
}

/// A signature by `account` over an action digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSignature {
    pub account: AccountName,
    pub signature: Signature,
}

/// An action together with the signatures authorizing it.
///
/// Signatures cover the action and `nonce` together. A partition accepts
/// each `(signer, nonce)` pair once, so the same signed action cannot be
/// submitted twice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAction {
    pub action: Action,
    pub nonce: u64,
    pub signatures: Vec<AccountSignature>,
}

/// The bytes an account signs.
#[derive(Serialize)]
struct SigningPayload<'a> {
    action: &'a Action,
    nonce: u64,
}

impl SignedAction {
    /// Wrap an action under a fresh random nonce, with no signatures yet.
    pub fn unsigned(action: Action) -> Self {
        Self::with_nonce(action, rand::random())
    }

    pub fn with_nonce(action: Action, nonce: u64) -> Self {
        Self {
            action,
            nonce,
            signatures: Vec::new(),
        }
    }

    /// Sign `action` as `account`.
    pub fn sign(action: Action, account: AccountName, key: &SigningKey) -> ContractResult<Self> {
        let mut signed = Self::unsigned(action);
        signed.add_signature(account, key)?;
        Ok(signed)
    }

    /// Add another account's signature.
    pub fn add_signature(&mut self, account: AccountName, key: &SigningKey) -> ContractResult<()> {
        let digest = self.digest()?;
        self.signatures.push(AccountSignature {
            account,
            signature: key.sign(&digest),
        });
        Ok(())
    }

    /// Digest of the action and nonce, as signed by authorizing accounts.
    pub fn digest(&self) -> ContractResult<Digest> {
        let payload = SigningPayload {
            action: &self.action,
            nonce: self.nonce,
        };
        Domain::Action
            .digest_json(&payload)
            .map_err(|e| ContractError::Serialization(e.to_string()))
    }

    /// Accounts that claim to have signed.
    pub fn signers(&self) -> impl Iterator<Item = AccountName> + '_ {
        self.signatures.iter().map(|s| s.account)
    }
}
