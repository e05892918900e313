use crate::error::TypeError;

/// Primary key of a message record.
pub type MessageId = u64;

/// Primary key of a vote record.
pub type VoteId = u64;

/// Ids at or above this value are reserved for auto-assignment.
///
/// Callers may only choose ids in `[1, RESERVED_THRESHOLD)`; passing `0`
/// requests an id from the reserved range, so a system-chosen id can never
/// land on top of a caller-chosen one.
pub const RESERVED_THRESHOLD: u64 = 1_000_000_000;

/// Reject caller-supplied ids that fall inside the reserved range.
///
/// `0` is always accepted since it means "assign one for me".
pub fn check_requested_id(requested: u64) -> Result<(), TypeError> {
    if requested >= RESERVED_THRESHOLD {
        return Err(TypeError::ReservedId { id: requested });
    }
    Ok(())
}

/// Resolve the final id for a new record.
///
/// `next_available` is one greater than the largest primary key currently
/// in the collection (or `0` when it is empty). Auto-assigned ids never go
/// below [`RESERVED_THRESHOLD`].
pub fn resolve_id(requested: u64, next_available: u64) -> Result<u64, TypeError> {
    check_requested_id(requested)?;
    if requested != 0 {
        return Ok(requested);
    }
    Ok(next_available.max(RESERVED_THRESHOLD))
}
