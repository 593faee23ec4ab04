//! The serializable program produced by the compiler.

extern crate alloc;

use alloc::{collections::BTreeMap, string::String, vec::Vec};
use core::fmt::{self, Display};

use serde_derive::{Deserialize, Serialize};

use crate::{LiteralValue, NadaType, Operation, OperationId, SourceRef};

/// Identifies a [`Mir`] format.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Version {
    /// Version 0.
    V0,
}

impl Version {
    /// Returns the `Version` as a human-readable string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V0 => "V0",
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsupported [`Mir`] version.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("unsupported MIR version")]
pub struct UnsupportedVersion(());

/// An error while encoding or decoding a [`Mir`].
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Serialization failed.
    #[error("unable to encode MIR: {0}")]
    Encode(postcard::Error),
    /// The bytes are not a valid MIR document.
    #[error("unable to decode MIR: {0}")]
    Decode(postcard::Error),
}

/// A compiled program.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Mir {
    /// The program data
    pub data: MirData,
}

impl Mir {
    /// Wraps a version 0 program.
    pub const fn v0(program: ProgramV0) -> Self {
        Self {
            data: MirData::V0(program),
        }
    }

    /// Returns the MIR version.
    pub const fn version(&self) -> Version {
        match self.data {
            MirData::V0(_) => Version::V0,
        }
    }

    /// Returns the version 0 program, if this is one.
    pub fn as_v0(&self) -> Result<&ProgramV0, UnsupportedVersion> {
        match &self.data {
            MirData::V0(program) => Ok(program),
        }
    }

    /// Encodes the program with postcard.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        postcard::to_allocvec(self).map_err(EncodeError::Encode)
    }

    /// Decodes a program previously produced by [`Mir::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncodeError> {
        postcard::from_bytes(bytes).map_err(EncodeError::Decode)
    }
}

/// Versioned [`Mir`] data.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MirData {
    /// Version 0
    V0(ProgramV0),
}

/// The version 0 program format.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProgramV0 {
    /// Function definitions, callees before callers.
    pub functions: Vec<Function>,
    /// Parties, unique by name.
    pub parties: Vec<Party>,
    /// Inputs, unique by name.
    pub inputs: Vec<Input>,
    /// Literals, unique by name.
    pub literals: Vec<Literal>,
    /// Outputs, in declaration order.
    pub outputs: Vec<Output>,
    /// Top-level operations; operands precede their users.
    pub operations: Vec<Operation>,
    /// Source text, by file base name. Empty if not requested.
    pub source_files: BTreeMap<String, String>,
    /// Source references, indexed by `source_ref_index`.
    pub source_refs: Vec<SourceRef>,
}

impl ProgramV0 {
    /// Looks up a top-level operation.
    pub fn operation(&self, id: OperationId) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Looks up a function.
    pub fn function(&self, id: OperationId) -> Option<&Function> {
        self.functions.iter().find(|f| f.id == id)
    }

    /// Looks up an input by name.
    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Looks up a literal by name.
    pub fn literal(&self, name: &str) -> Option<&Literal> {
        self.literals.iter().find(|l| l.name == name)
    }

    /// Looks up an output by name.
    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Returns the source reference at `index`.
    pub fn source_ref(&self, index: u32) -> Option<&SourceRef> {
        self.source_refs.get(usize::try_from(index).ok()?)
    }
}

/// A participant who provides inputs or receives outputs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Party {
    /// The party's name.
    pub name: String,
    /// Where the party was declared.
    pub source_ref_index: u32,
}

/// A value provided by a party at runtime.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// The input's name.
    pub name: String,
    /// The providing party.
    pub party: String,
    /// The input's type.
    pub ty: NadaType,
    /// Free-form documentation.
    pub doc: String,
    /// Where the input was declared.
    pub source_ref_index: u32,
}

/// A compile-time constant.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    /// The literal's name, derived from its value and type.
    pub name: String,
    /// The value.
    pub value: LiteralValue,
    /// The type.
    pub ty: NadaType,
}

/// A value delivered to a party.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// The output's name.
    pub name: String,
    /// The operation producing the value.
    pub operation_id: OperationId,
    /// The receiving party.
    pub party: String,
    /// The output's type.
    pub ty: NadaType,
    /// Where the output was declared.
    pub source_ref_index: u32,
}

/// A function argument.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FunctionArg {
    /// The argument's name.
    pub name: String,
    /// The argument's type.
    pub ty: NadaType,
    /// Where the function was declared.
    pub source_ref_index: u32,
}

/// A function used by `map`, `reduce` or a direct call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// The function's identifier.
    pub id: OperationId,
    /// The function's name.
    pub name: String,
    /// The arguments, in order.
    pub args: Vec<FunctionArg>,
    /// The body's operations; operands precede their users.
    pub operations: Vec<Operation>,
    /// The operation producing the result.
    pub return_operation_id: OperationId,
    /// The result type.
    pub return_type: NadaType,
    /// Where the function was declared.
    pub source_ref_index: u32,
}

impl Function {
    /// Looks up an operation of the function body.
    pub fn operation(&self, id: OperationId) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }
}
