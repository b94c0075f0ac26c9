//! The [`DtaSelectErrorKind`] which makes it easy for downstream users of the error type to match on the exact error.

use context_error::{BoxedError, ErrorKind};

/// The error type returned by all fallible operations in this crate
pub type DtaSelectError = BoxedError<'static, DtaSelectErrorKind>;

/// The kind of error that can occur when reading a DTASelect report
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DtaSelectErrorKind {
    /// The input could not be opened or a line could not be read
    #[default]
    Io,
    /// A body line misses a field the active header requires, or a field could not be parsed
    MalformedLine,
    /// The sequence index has no protein for the sequence of a PSM
    SequenceNotIndexed,
    /// A sequence index or accession authority reported an error
    Collaborator,
    /// The parser settings are invalid
    Settings,
}

impl ErrorKind for DtaSelectErrorKind {
    type Settings = ();
    fn descriptor(&self) -> &'static str {
        "error"
    }
    fn ignored(&self, _settings: ()) -> bool {
        false
    }
    fn is_error(&self, _settings: ()) -> bool {
        true
    }
}
