//! Decode limits.
//!
//! The decoder runs against bytes from an untrusted peer, so structural
//! counts that are cheap to claim and expensive to honor are bounded here.
//! Counts of non-zero-size items are additionally bounded by the input
//! length itself.

/// Maximum number of entries in a received type table.
pub const MAX_TABLE_ENTRIES: u64 = 1 << 16;

/// Maximum fields per record/variant, methods per service, and
/// argument/return types per function entry.
pub const MAX_FIELDS_PER_NODE: u64 = 1 << 16;

/// Maximum value nesting depth during encode and decode. Recursive values
/// (e.g. a linked list) consume one level per node.
pub const MAX_VALUE_DEPTH: usize = 2048;

/// Maximum element count for a vector whose element type occupies zero
/// bytes on the wire (`vec null` and the like); such elements are not
/// bounded by the input length.
pub const MAX_ZERO_SIZE_ELEMENTS: u64 = 1 << 16;
