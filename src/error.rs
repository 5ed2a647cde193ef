//! Common error types.

/// Error type for cell related errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// Cell bits or refs do not satisfy the constraints of its type.
    #[error("malformed cell: {0}")]
    MalformedCell(&'static str),
    /// There was not enough bits capacity in the cell builder.
    #[error("cell builder capacity exceeded")]
    CapacityExceeded,
    /// There was not enough refs capacity in the cell builder.
    #[error("cell builder ref limit exceeded")]
    RefLimitExceeded,
    /// There were not enough bits or refs in the cell slice.
    #[error("cell slice bounds exceeded")]
    BoundsExceeded,
    /// Integer does not fit into the requested number of bits.
    #[error("integer does not fit into the requested width")]
    IntOverflow,
    /// Unknown TLB tag.
    #[error("invalid tag")]
    InvalidTag,
    /// Address prefix is neither `00` nor `10`.
    #[error("invalid address tag")]
    InvalidAddressTag,
    /// Data does not satisfy some constraints.
    #[error("invalid data")]
    InvalidData,
}

/// Error type for address parsing related errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum ParseAddrError {
    /// String is neither a user-friendly nor a raw address.
    #[error("unrecognized address format")]
    UnrecognizedFormat,
    /// User-friendly address has an unknown flags byte.
    #[error("invalid address tag")]
    InvalidTag,
    /// CRC16 of the user-friendly address payload does not match.
    #[error("address checksum mismatch")]
    ChecksumMismatch,
    /// Workchain id is too large.
    #[error("workchain id is too large to fit in target type")]
    InvalidWorkchain,
    /// Invalid account id hex.
    #[error("cannot parse account id")]
    InvalidAccountId,
}
