//! Error taxonomy for ROM loading and execution.

use thiserror::Error;

/// Fatal errors surfaced by `load_rom` / `run_rom`.
///
/// All variants abort the session before (or instead of) producing a
/// frame; none leaves the scheduler partially initialised.
#[derive(Debug, Error)]
pub enum Error {
    /// The iNES magic is wrong or the header is truncated.
    #[error("invalid iNES header")]
    InvalidInesHeader,

    /// The header names a mapper this core does not implement.
    #[error("unsupported mapper id {id}")]
    UnsupportedMapper { id: u8 },

    /// The ROM byte range is smaller than the sizes the header claims.
    #[error("ROM truncated: header claims {expected} bytes, file has {actual}")]
    RomTooShort { expected: usize, actual: usize },

    /// Strict mode hit an undocumented opcode.
    #[error(transparent)]
    IllegalOpcode(#[from] ricoh_2a03::IllegalOpcode),
}
