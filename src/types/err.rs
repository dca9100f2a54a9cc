/*!
Error types used in the library.

Most of these are internal consistency checks (a duplicate cid, an unknown
LP status) rather than things expected to occur under ordinary use. Each
subsystem gets its own small error enum which converts into the crate-wide
[ErrorKind] via `From`, so callers can use `?` everywhere and match on the
narrower type only where they care to.
*/

use crate::types::Cid;

/// A union of varied error kinds, returned at the crate boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorKind {
    /// An error parsing a theory atom.
    Parse(ParseError),

    /// An error in the atom registry.
    Registry(RegistryError),

    /// An error in a partition model.
    Partition(PartitionError),

    /// An error in the dispatcher.
    Dispatch(DispatchError),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Parse(e) => write!(f, "{e}"),
            ErrorKind::Registry(e) => write!(f, "{e}"),
            ErrorKind::Partition(e) => write!(f, "{e}"),
            ErrorKind::Dispatch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ErrorKind {}

/// Errors parsing a theory atom (spec §7: fatal, abort with a diagnostic).
#[derive(Clone, Debug, PartialEq)]
pub enum ParseError {
    /// An operator not in `{=, <=, >=, <, >, @}`.
    UnknownOperator(String),

    /// A non-numeric literal where a number was required.
    NonNumericLiteral(String),

    /// A malformed `L..U` domain term.
    MalformedDomain(String),

    /// Some other malformed atom; carries a human-readable diagnostic.
    Malformed(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnknownOperator(op) => write!(f, "unknown operator: {op}"),
            ParseError::NonNumericLiteral(s) => write!(f, "non-numeric literal: {s}"),
            ParseError::MalformedDomain(s) => write!(f, "malformed domain term: {s}"),
            ParseError::Malformed(s) => write!(f, "malformed theory atom: {s}"),
        }
    }
}

impl From<ParseError> for ErrorKind {
    fn from(e: ParseError) -> Self {
        ErrorKind::Parse(e)
    }
}

/// Errors registering atoms (spec §7: duplicate cid is a programming error).
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryError {
    /// The same cid was registered twice.
    DuplicateCid(Cid),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicateCid(cid) => write!(f, "duplicate constraint id: {cid}"),
        }
    }
}

impl From<RegistryError> for ErrorKind {
    fn from(e: RegistryError) -> Self {
        ErrorKind::Registry(e)
    }
}

/// Errors from a partition model.
#[derive(Clone, Debug, PartialEq)]
pub enum PartitionError {
    /// Attempted to remove a cid not present in any of
    /// `{constraints, forall_templates, objectives}`.
    UnknownCid(Cid),

    /// The LP backend reported `undefined` (spec §7: fatal implementation error).
    LpUndefined,
}

impl std::fmt::Display for PartitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionError::UnknownCid(cid) => {
                write!(f, "cid {cid} is not active in this partition")
            }
            PartitionError::LpUndefined => write!(f, "Unknown LP solver status: undefined"),
        }
    }
}

impl From<PartitionError> for ErrorKind {
    fn from(e: PartitionError) -> Self {
        ErrorKind::Partition(e)
    }
}

/// Errors in the dispatcher.
#[derive(Clone, Debug, PartialEq)]
pub enum DispatchError {
    /// A propagate call referenced a cid with no registered atom.
    UnknownCid(Cid),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::UnknownCid(cid) => write!(f, "unknown constraint id: {cid}"),
        }
    }
}

impl From<DispatchError> for ErrorKind {
    fn from(e: DispatchError) -> Self {
        ErrorKind::Dispatch(e)
    }
}
