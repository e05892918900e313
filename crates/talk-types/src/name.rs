use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";
const MAX_LEN: usize = 13;

/// Identity of an account on the board.
///
/// Names are up to 13 characters drawn from `.12345abcdefghijklmnopqrstuvwxyz`
/// and are packed into a single `u64`: the first twelve characters take five
/// bits each from the most significant end, the thirteenth takes the low
/// four bits (so it is limited to `.1-5a-j`). The packed value orders the
/// same way the names do, which is what lets it serve as the high half of
/// the vote composite key.
///
/// Serialized as its string form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountName(u64);

impl AccountName {
    /// Parse and encode a name.
    pub fn new(name: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name.len() > MAX_LEN {
            return Err(invalid("name is longer than 13 characters"));
        }
        if name.ends_with('.') {
            return Err(invalid("name ends with '.'"));
        }

        let mut value = 0u64;
        for (i, c) in name.bytes().enumerate() {
            let symbol = char_to_symbol(c)
                .ok_or_else(|| invalid("allowed characters are '.', '1'-'5' and 'a'-'z'"))?;
            if i < 12 {
                value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
            } else {
                if symbol > 0x0f {
                    return Err(invalid("thirteenth character must be in '.1-5a-j'"));
                }
                value |= symbol;
            }
        }

        Ok(Self(value))
    }

    /// Wrap an already-encoded value. Every `u64` decodes to some name.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The packed 64-bit encoding.
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Decode back to the textual form, with trailing dots trimmed.
    pub fn as_string(&self) -> String {
        let mut out = [b'.'; MAX_LEN];
        let mut tmp = self.0;
        for i in 0..MAX_LEN {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            out[MAX_LEN - 1 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }
        let text: String = out.iter().map(|&b| b as char).collect();
        text.trim_end_matches('.').to_string()
    }
}

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'.' => Some(0),
        b'1'..=b'5' => Some(u64::from(c - b'1') + 1),
        b'a'..=b'z' => Some(u64::from(c - b'a') + 6),
        _ => None,
    }
}

impl FromStr for AccountName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<AccountName> for String {
    fn from(name: AccountName) -> Self {
        name.as_string()
    }
}

impl fmt::Debug for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountName({})", self.as_string())
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}
