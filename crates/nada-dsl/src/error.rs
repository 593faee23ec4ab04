use std::fmt;

use buggy::Bug;
use nada_mir::NadaType;

use crate::{source::SourceLocation, types::TypeError};

/// Why two inputs with the same name conflict.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum InputConflict {
    /// The inputs belong to different parties.
    #[error("declared for parties `{first}` and `{second}`")]
    Party {
        /// The party of the first declaration.
        first: String,
        /// The party of the second declaration.
        second: String,
    },
    /// The inputs have different types.
    #[error("declared with types `{first}` and `{second}`")]
    Type {
        /// The type of the first declaration.
        first: NadaType,
        /// The type of the second declaration.
        second: NadaType,
    },
    /// The inputs are separate declarations of the same input.
    #[error("declared more than once")]
    Redeclared,
}

/// Errors that can occur while building or compiling a program.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CompileErrorType {
    /// The operand types are not valid for the operation.
    #[error(transparent)]
    InvalidType(#[from] TypeError),
    /// Two different inputs share a name.
    #[error("input `{name}` is duplicated: {conflict}")]
    DuplicateInput {
        /// The input's name.
        name: String,
        /// How the declarations differ.
        conflict: InputConflict,
    },
    /// Two outputs share a name.
    #[error("output `{0}` is duplicated")]
    DuplicateOutput(String),
    /// A program was compiled without outputs.
    #[error("program has no outputs")]
    NoOutputs,
    /// An accessor index is past the end of its source.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: u32,
        /// The number of elements.
        len: u32,
    },
    /// An object has no field with this name.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// A compound value was built without elements.
    #[error("cannot build an empty {0}")]
    EmptyCollection(&'static str),
    /// A function was used with the wrong number of arguments.
    #[error("function `{function}` takes {expected} argument(s) but {found} were supplied")]
    ArityMismatch {
        /// The function's name.
        function: String,
        /// The number of declared parameters.
        expected: usize,
        /// The number of supplied arguments.
        found: usize,
    },
    /// A function's body uses the function itself.
    #[error("function `{0}` refers to itself")]
    RecursiveFunction(String),
    /// An input declaration is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A value was used where its node is not available: it belongs to
    /// another context, was discarded, or is a function argument used
    /// outside its function's body.
    #[error("invalid value: {0}")]
    InvalidHandle(String),
    /// An implementation bug
    #[error("bug: {0}")]
    Bug(#[from] Bug),
}

/// An error produced by the compiler. May contain the call site that
/// caused it.
#[derive(Debug, PartialEq)]
pub struct CompileError(Box<CompileErrorImpl>);

#[derive(Debug, PartialEq)]
struct CompileErrorImpl {
    /// The type of the error
    err_type: CompileErrorType,
    /// The call site, if known
    location: Option<SourceLocation>,
}

impl CompileError {
    /// Creates a `CompileError`.
    pub(crate) fn new(err_type: impl Into<CompileErrorType>) -> CompileError {
        CompileError(Box::new(CompileErrorImpl {
            err_type: err_type.into(),
            location: None,
        }))
    }

    pub(crate) fn at(err_type: impl Into<CompileErrorType>, location: SourceLocation) -> Self {
        CompileError(Box::new(CompileErrorImpl {
            err_type: err_type.into(),
            location: Some(location),
        }))
    }

    /// The kind of error.
    pub fn err_type(&self) -> &CompileErrorType {
        &self.0.err_type
    }

    /// Consumes the error, returning its kind.
    pub fn into_err_type(self) -> CompileErrorType {
        self.0.err_type
    }

    /// The call site that caused the error, if known.
    pub fn location(&self) -> Option<SourceLocation> {
        self.0.location
    }

    /// Reports whether the error is a compiler bug rather than a problem
    /// with the program being compiled.
    pub fn is_bug(&self) -> bool {
        matches!(self.0.err_type, CompileErrorType::Bug(_))
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.location {
            Some(location) => write!(f, "{} at {location}", self.0.err_type),
            None => write!(f, "{}", self.0.err_type),
        }
    }
}

// Implementing Display and deriving Debug implements
// error::Error with default behavior by declaring this empty
// implementation.
impl std::error::Error for CompileError {}

impl From<CompileErrorType> for CompileError {
    fn from(err: CompileErrorType) -> Self {
        CompileError::new(err)
    }
}

impl From<Bug> for CompileError {
    fn from(bug: Bug) -> Self {
        CompileError::new(CompileErrorType::Bug(bug))
    }
}

impl From<TypeError> for CompileError {
    fn from(err: TypeError) -> Self {
        CompileError::new(CompileErrorType::InvalidType(err))
    }
}
