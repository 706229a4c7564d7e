//! Central error types for the grammar compiler.
//!
//! The variants form a closed set of outcome kinds. Every error is fatal to
//! the compilation that raised it: the compile arena is dropped and no partial
//! schema is returned.

use core::fmt;
use std::borrow::Cow;
use std::collections::TryReserveError;

/// All failure outcomes of a schema compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Growing a table, rule or production array failed.
    MemoryAllocation,
    /// A construct is recognized but not supported yet.
    ///
    /// Treiber koennen diesen Fehler abfangen und den Teil ueberspringen
    /// (siehe [`Error::is_not_implemented`]).
    NotImplementedYet(Cow<'static, str>),
    /// Internal invariant violated (missing table during rewrite, unknown built-in type).
    ///
    /// Nie recoverable: ein Weiterlaufen wuerde Row-IDs still verfaelschen.
    InconsistentProcState(Cow<'static, str>),
    /// An index is past the end of the addressed buffer.
    OutOfBoundBuffer { index: usize, len: usize },
    /// A handle does not refer to a live object (unknown grammar id, missing input).
    NullPointerRef(Cow<'static, str>),
    /// A particle has invalid occurs constraints: max < min.
    InvalidParticleOccurs { min: usize, max: usize },
    /// A wildcard namespace list is empty.
    EmptyNamespaceList,
    /// A schema-derived name cannot be converted to the internal string form.
    InvalidName(Cow<'static, str>),
    /// The JSON type model could not be read.
    ModelParse(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemoryAllocation => write!(f, "memory allocation failed"),
            Self::NotImplementedYet(feature) => write!(f, "not implemented yet: {feature}"),
            Self::InconsistentProcState(msg) => {
                if msg.is_empty() {
                    write!(f, "inconsistent processor state")
                } else {
                    write!(f, "inconsistent processor state: {msg}")
                }
            }
            Self::OutOfBoundBuffer { index, len } => {
                write!(f, "index {index} out of bounds (length {len})")
            }
            Self::NullPointerRef(what) => write!(f, "null reference: {what}"),
            Self::InvalidParticleOccurs { min, max } => {
                write!(f, "invalid particle occurs: max {max} < min {min}")
            }
            Self::EmptyNamespaceList => write!(f, "empty namespace list in wildcard"),
            Self::InvalidName(msg) => write!(f, "invalid name: {msg}"),
            Self::ModelParse(msg) => write!(f, "type model parse error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Self::MemoryAllocation
    }
}

impl Error {
    /// Erstellt einen `InconsistentProcState` Fehler mit Nachricht.
    pub fn inconsistent(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InconsistentProcState(msg.into())
    }

    /// Erstellt einen `NotImplementedYet` Fehler fuer ein Feature.
    pub fn not_implemented(feature: impl Into<Cow<'static, str>>) -> Self {
        Self::NotImplementedYet(feature.into())
    }

    /// Erstellt einen `NullPointerRef` Fehler.
    pub fn null_ref(what: impl Into<Cow<'static, str>>) -> Self {
        Self::NullPointerRef(what.into())
    }

    /// Whether this is the "feature not supported yet" sentinel.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplementedYet(_))
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
