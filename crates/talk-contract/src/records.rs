use serde::{Deserialize, Serialize};
use talk_store::Record;
use talk_types::{AccountName, MessageId, VoteId};

/// A post or a reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Non-zero primary key.
    pub id: MessageId,
    /// Parent message, or `0` for a top-level post.
    pub reply_to: MessageId,
    pub author: AccountName,
    pub content: String,
    /// Sum of all vote values cast on this message.
    pub like_count: i64,
}

impl Message {
    /// Returns `true` if this message replies to another.
    pub fn is_reply(&self) -> bool {
        self.reply_to != 0
    }
}

impl Record for Message {
    type SecondaryKey = MessageId;
    const TABLE: &'static str = "message";

    fn primary_key(&self) -> u64 {
        self.id
    }

    fn secondary_key(&self) -> MessageId {
        self.reply_to
    }
}

/// One account's like (+1) or dislike (-1) on one message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Non-zero primary key.
    pub id: VoteId,
    pub message: MessageId,
    pub voter: AccountName,
    pub value: i8,
}

impl Vote {
    /// Vote value for a like/dislike flag.
    pub fn value_for(like: bool) -> i8 {
        if like {
            1
        } else {
            -1
        }
    }

    /// The composite key this vote occupies in the duplicate index.
    pub fn key(&self) -> VoteKey {
        VoteKey {
            voter: self.voter,
            message: self.message,
        }
    }
}

impl Record for Vote {
    type SecondaryKey = VoteKey;
    const TABLE: &'static str = "likes";

    fn primary_key(&self) -> u64 {
        self.id
    }

    fn secondary_key(&self) -> VoteKey {
        self.key()
    }
}

/// `(voter, message)` pair indexing the likes table.
///
/// Field order gives the same ordering as the packed form returned by
/// [`VoteKey::packed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoteKey {
    pub voter: AccountName,
    pub message: MessageId,
}

impl VoteKey {
    pub fn new(voter: AccountName, message: MessageId) -> Self {
        Self { voter, message }
    }

    /// Single 128-bit value: voter encoding in the high half, message id in
    /// the low half.
    pub fn packed(&self) -> u128 {
        (u128::from(self.voter.raw()) << 64) | u128::from(self.message)
    }
}
