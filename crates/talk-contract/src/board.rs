//! The board's two actions and the state they mutate.
//!
//! [`post`] and [`like`] are written against the [`Table`] trait and run
//! their checks in a fixed order: authority, referenced message, duplicate
//! vote, requested id. Each is all-or-nothing: every check runs before the
//! first write, and a `like` whose count update fails removes the vote it
//! just inserted.

use serde::{Deserialize, Serialize};
use talk_store::{InMemoryTable, Table};
use talk_types::{check_requested_id, resolve_id, AccountName, MessageId, VoteId};
use tracing::debug;

use crate::action::{Action, LikeArgs, PostArgs};
use crate::auth::AuthContext;
use crate::error::{ContractError, ContractResult};
use crate::records::{Message, Vote, VoteKey};

/// Record a new message, returning its id.
pub fn post<M>(
    messages: &mut M,
    auth: &dyn AuthContext,
    args: &PostArgs,
) -> ContractResult<MessageId>
where
    M: Table<Message>,
{
    auth.require_auth(&args.author)?;

    if args.reply_to != 0 {
        messages.get(args.reply_to)?;
    }

    check_requested_id(args.id)?;
    let id = resolve_id(args.id, messages.available_primary_key()?)?;

    messages.insert(Message {
        id,
        reply_to: args.reply_to,
        author: args.author,
        content: args.content.clone(),
        like_count: 0,
    })?;

    debug!(id, reply_to = args.reply_to, author = %args.author, "message recorded");
    Ok(id)
}

/// Record a vote and fold it into the target message's count, returning the
/// vote id.
pub fn like<M, L>(
    messages: &mut M,
    votes: &mut L,
    auth: &dyn AuthContext,
    args: &LikeArgs,
) -> ContractResult<VoteId>
where
    M: Table<Message>,
    L: Table<Vote>,
{
    auth.require_auth(&args.voter)?;

    // A zero target skips this check and fails at the count update below,
    // since no message 0 can exist.
    if args.message != 0 {
        messages.get(args.message)?;
    }

    if votes
        .find_by_secondary(&VoteKey::new(args.voter, args.message))
        .is_some()
    {
        return Err(ContractError::DuplicateVote {
            voter: args.voter,
            message: args.message,
        });
    }

    check_requested_id(args.id)?;
    let id = resolve_id(args.id, votes.available_primary_key()?)?;
    let value = Vote::value_for(args.like);

    votes.insert(Vote {
        id,
        message: args.message,
        voter: args.voter,
        value,
    })?;

    if let Err(error) = messages.modify(args.message, |message| {
        message.like_count += i64::from(value);
    }) {
        votes.remove(id)?;
        return Err(error.into());
    }

    debug!(id, message = args.message, voter = %args.voter, value, "vote recorded");
    Ok(id)
}

/// The board's state partition: the message and likes tables.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BoardState {
    messages: InMemoryTable<Message>,
    votes: InMemoryTable<Vote>,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` all-or-nothing, returning the id it assigned.
    ///
    /// On failure `self` is left exactly as it was.
    pub fn apply(&mut self, action: &Action, auth: &dyn AuthContext) -> ContractResult<u64> {
        match action {
            Action::Post(args) => post(&mut self.messages, auth, args),
            Action::Like(args) => like(&mut self.messages, &mut self.votes, auth, args),
        }
    }

    /// Undo a successful [`apply`](Self::apply) of `action` that assigned
    /// `id`. Only valid while that action is still the latest one applied.
    pub(crate) fn revert(&mut self, action: &Action, id: u64) -> ContractResult<()> {
        match action {
            Action::Post(_) => {
                self.messages.remove(id)?;
            }
            Action::Like(args) => {
                let vote = self.votes.remove(id)?;
                self.messages.modify(args.message, |message| {
                    message.like_count -= i64::from(vote.value);
                })?;
            }
        }
        debug!(id, action = action.kind(), "action reverted");
        Ok(())
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.find(id)
    }

    /// Messages replying to `id`, in id order. `replies(0)` lists top-level
    /// posts.
    pub fn replies(&self, id: MessageId) -> Vec<&Message> {
        self.messages.secondary_range(&id)
    }

    pub fn vote(&self, id: VoteId) -> Option<&Vote> {
        self.votes.find(id)
    }

    pub fn has_voted(&self, voter: AccountName, message: MessageId) -> bool {
        self.votes
            .find_by_secondary(&VoteKey::new(voter, message))
            .is_some()
    }

    /// Votes cast on `message`, in vote id order.
    pub fn votes_for(&self, message: MessageId) -> Vec<&Vote> {
        self.votes.iter().filter(|v| v.message == message).collect()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.iter()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }
}

impl PartialEq for BoardState {
    fn eq(&self, other: &Self) -> bool {
        self.messages().eq(other.messages()) && self.votes().eq(other.votes())
    }
}

impl Eq for BoardState {}
