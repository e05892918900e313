use crate::auth::{Authority, KeyRegistry, NonceLedger};
use crate::board::BoardState;
use crate::error::ContractError;
use crate::journal::{ActionJournal, ActionReceipt, JournalError};

/// Errors from rebuilding state out of a journal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    #[error("journal is invalid: {0}")]
    Journal(#[from] JournalError),

    #[error("receipt {seq} no longer applies: {error}")]
    Rejected { seq: u64, error: ContractError },

    #[error("receipt {seq} assigned id {recorded}, replay assigned {replayed}")]
    Diverged {
        seq: u64,
        recorded: u64,
        replayed: u64,
    },
}

/// Result of a replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayResult {
    pub applied: u64,
    pub state: BoardState,
    /// Nonces spent by the replayed actions.
    pub nonces: NonceLedger,
}

/// Deterministic rebuild of board state from journal receipts.
pub struct ReplayEngine;

impl ReplayEngine {
    /// Rebuild state from genesis, trusting the signers recorded on each
    /// receipt (they were verified when the receipt was appended).
    pub fn replay_from_genesis(journal: &ActionJournal) -> Result<ReplayResult, ReplayError> {
        journal.validate()?;
        apply_receipts(journal.receipts(), |receipt| {
            Ok(Authority::new(receipt.signed.signers()))
        })
    }

    /// Rebuild state from genesis, re-verifying every signature against
    /// `registry`.
    pub fn replay_verified(
        journal: &ActionJournal,
        registry: &KeyRegistry,
    ) -> Result<ReplayResult, ReplayError> {
        journal.validate()?;
        apply_receipts(journal.receipts(), |receipt| {
            registry.verify(&receipt.signed)
        })
    }

    /// Returns `true` if replaying `journal` reproduces `live` exactly.
    pub fn verify_convergence(
        journal: &ActionJournal,
        live: &BoardState,
    ) -> Result<bool, ReplayError> {
        let replayed = Self::replay_from_genesis(journal)?;
        Ok(&replayed.state == live)
    }
}

fn apply_receipts<F>(
    receipts: &[ActionReceipt],
    authority: F,
) -> Result<ReplayResult, ReplayError>
where
    F: Fn(&ActionReceipt) -> Result<Authority, ContractError>,
{
    let mut state = BoardState::new();
    let mut nonces = NonceLedger::new();
    let mut applied = 0u64;

    for receipt in receipts {
        let seq = receipt.seq;
        let rejected = |error: ContractError| ReplayError::Rejected { seq, error };
        let auth = authority(receipt).map_err(rejected)?;
        nonces.check(&receipt.signed).map_err(rejected)?;
        let replayed = state.apply(&receipt.signed.action, &auth).map_err(rejected)?;
        if replayed != receipt.assigned_id {
            return Err(ReplayError::Diverged {
                seq,
                recorded: receipt.assigned_id,
                replayed,
            });
        }
        nonces.record(&receipt.signed);
        applied += 1;
    }

    Ok(ReplayResult {
        applied,
        state,
        nonces,
    })
}

#[cfg(test)]
mod tests {
    use talk_crypto::SigningKey;
    use talk_types::AccountName;

    use super::*;
    use crate::action::{Action, LikeArgs, PostArgs, SignedAction};
    use crate::auth::AuthContext;

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    fn record(
        board: &mut BoardState,
        journal: &mut ActionJournal,
        action: Action,
        key: &SigningKey,
    ) -> u64 {
        let actor = action.actor();
        let signed = SignedAction::sign(action, actor, key).unwrap();
        let auth: &dyn AuthContext = &Authority::new(signed.signers());
        let id = board.apply(&signed.action, auth).unwrap();
        journal.append(&signed, id).unwrap();
        id
    }

    fn sample() -> (BoardState, ActionJournal, KeyRegistry) {
        let alice = SigningKey::generate();
        let bob = SigningKey::generate();
        let mut registry = KeyRegistry::new();
        registry.register(name("alice"), alice.verifying_key());
        registry.register(name("bob"), bob.verifying_key());

        let mut board = BoardState::new();
        let mut journal = ActionJournal::new();
        record(
            &mut board,
            &mut journal,
            Action::Post(PostArgs {
                id: 0,
                reply_to: 0,
                author: name("alice"),
                content: "hi".into(),
            }),
            &alice,
        );
        record(
            &mut board,
            &mut journal,
            Action::Like(LikeArgs {
                id: 0,
                message: 1_000_000_000,
                voter: name("bob"),
                like: true,
            }),
            &bob,
        );
        (board, journal, registry)
    }

    #[test]
    fn replay_reproduces_live_state() {
        let (board, journal, _) = sample();
        let result = ReplayEngine::replay_from_genesis(&journal).unwrap();
        assert_eq!(result.applied, 2);
        assert_eq!(result.state, board);
        assert!(ReplayEngine::verify_convergence(&journal, &board).unwrap());
    }

    #[test]
    fn verified_replay_checks_signatures() {
        let (board, journal, registry) = sample();
        let result = ReplayEngine::replay_verified(&journal, &registry).unwrap();
        assert_eq!(result.state, board);

        let empty = KeyRegistry::new();
        assert!(matches!(
            ReplayEngine::replay_verified(&journal, &empty),
            Err(ReplayError::Rejected { seq: 1, .. })
        ));
    }

    #[test]
    fn convergence_detects_drift() {
        let (_, journal, _) = sample();
        assert!(!ReplayEngine::verify_convergence(&journal, &BoardState::new()).unwrap());
    }

    #[test]
    fn replay_rejects_journaled_resubmission() {
        let key = SigningKey::generate();
        let signed = SignedAction::sign(
            Action::Post(PostArgs {
                id: 0,
                reply_to: 0,
                author: name("alice"),
                content: "hi".into(),
            }),
            name("alice"),
            &key,
        )
        .unwrap();
        let mut journal = ActionJournal::new();
        journal.append(&signed, 1_000_000_000).unwrap();
        journal.append(&signed, 1_000_000_001).unwrap();

        assert_eq!(
            ReplayEngine::replay_from_genesis(&journal).unwrap_err(),
            ReplayError::Rejected {
                seq: 2,
                error: ContractError::Unauthorized {
                    account: name("alice")
                },
            }
        );
    }

    #[test]
    fn long_journal_replays_to_live_state() {
        let alice = SigningKey::generate();
        let mut board = BoardState::new();
        let mut journal = ActionJournal::new();
        let mut parent = 0;
        for i in 0..500u64 {
            let action = if i % 5 == 4 {
                Action::Like(LikeArgs {
                    id: 0,
                    message: parent,
                    voter: name("alice"),
                    like: i % 2 == 0,
                })
            } else {
                Action::Post(PostArgs {
                    id: 0,
                    reply_to: parent,
                    author: name("alice"),
                    content: format!("post {i}"),
                })
            };
            let is_post = matches!(action, Action::Post(_));
            let id = record(&mut board, &mut journal, action, &alice);
            if is_post {
                parent = id;
            }
        }

        let result = ReplayEngine::replay_from_genesis(&journal).unwrap();
        assert_eq!(result.applied, 500);
        assert_eq!(result.state, board);
        assert_eq!(result.nonces.len(), 500);
    }

    #[test]
    fn replay_refuses_invalid_journal() {
        let (_, journal, _) = sample();
        let mut json = serde_json::to_value(&journal).unwrap();
        json[0]["assigned_id"] = serde_json::Value::from(5u64);
        let tampered: ActionJournal = serde_json::from_value(json).unwrap();
        assert!(matches!(
            ReplayEngine::replay_from_genesis(&tampered),
            Err(ReplayError::Journal(_))
        ));
    }
}
