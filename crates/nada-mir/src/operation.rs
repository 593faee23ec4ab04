extern crate alloc;

use alloc::{string::String, vec::Vec};
use core::fmt;

use serde_derive::{Deserialize, Serialize};

use crate::NadaType;

/// Identifies an operation or function within a program.
///
/// Identifiers are assigned while the graph is built and are stable
/// across lowering; operations refer to each other by identifier.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub struct OperationId(pub u32);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

macro_rules! op_kinds {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $text:literal,
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )*
        }

        impl $name {
            /// All operators of this kind.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// The operator's name as it appears in the MIR text form.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

op_kinds! {
    /// A binary operator.
    pub enum BinaryOp {
        /// `a + b`
        Addition => "addition",
        /// `a - b`
        Subtraction => "subtraction",
        /// `a * b`
        Multiplication => "multiplication",
        /// `a / b`
        Division => "division",
        /// `a % b`
        Modulo => "modulo",
        /// `a ** b`
        Power => "power",
        /// `a << b`
        LeftShift => "left-shift",
        /// `a >> b`
        RightShift => "right-shift",
        /// Probabilistic truncation of a secret by a public amount.
        TruncPr => "trunc-pr",
        /// `a < b`
        LessThan => "less-than",
        /// `a > b`
        GreaterThan => "greater-than",
        /// `a <= b`
        LessOrEqualThan => "less-or-equal-than",
        /// `a >= b`
        GreaterOrEqualThan => "greater-or-equal-than",
        /// `a == b`
        Equals => "equals",
        /// `a != b`
        NotEquals => "not-equals",
        /// Equality whose result is revealed.
        PublicOutputEquality => "public-output-equality",
        /// `a & b`
        BooleanAnd => "boolean-and",
        /// `a | b`
        BooleanOr => "boolean-or",
        /// `a ^ b`
        BooleanXor => "boolean-xor",
        /// Pairs up the elements of two arrays.
        Zip => "zip",
        /// Sum of the element-wise products of two arrays.
        InnerProduct => "inner-product",
    }
}

impl BinaryOp {
    /// Reports whether swapping the operands never changes the result
    /// type.
    pub const fn is_commutative(&self) -> bool {
        matches!(
            self,
            Self::Addition
                | Self::Multiplication
                | Self::Equals
                | Self::NotEquals
                | Self::PublicOutputEquality
                | Self::BooleanAnd
                | Self::BooleanOr
                | Self::BooleanXor
        )
    }
}

op_kinds! {
    /// A unary operator.
    pub enum UnaryOp {
        /// `!a`
        Not => "not",
        /// Makes a secret value public.
        Reveal => "reveal",
        /// Splits an array of pairs into a pair of arrays.
        Unzip => "unzip",
    }
}

/// How an accessor selects from its source.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AccessorKey {
    /// Positional access into an array, tuple or n-tuple.
    Index(u32),
    /// Field access into an object.
    Field(String),
}

impl fmt::Display for AccessorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(idx) => write!(f, "{idx}"),
            Self::Field(name) => write!(f, ".{name}"),
        }
    }
}

/// A lowered operation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// The operation's identifier.
    pub id: OperationId,
    /// The result type.
    pub ty: NadaType,
    /// Index into the program's source references.
    pub source_ref_index: u32,
    /// What the operation does.
    pub kind: OperationKind,
}

/// The kind of an [`Operation`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum OperationKind {
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// The left operand.
        left: OperationId,
        /// The right operand.
        right: OperationId,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: OperationId,
    },
    /// Reads a program input by name.
    InputReference {
        /// The input's name.
        refers_to: String,
    },
    /// Reads a literal by name.
    LiteralReference {
        /// The literal's name.
        refers_to: String,
    },
    /// Converts a value to the operation's type.
    Cast {
        /// The value being cast.
        target: OperationId,
    },
    /// Selects between two values.
    IfElse {
        /// The condition.
        cond: OperationId,
        /// Result when the condition holds.
        first: OperationId,
        /// Result otherwise.
        second: OperationId,
    },
    /// A fresh random value.
    Random,
    /// Applies a function to every element of an array.
    Map {
        /// The function.
        function_id: OperationId,
        /// The array.
        inner: OperationId,
    },
    /// Folds an array with a function.
    Reduce {
        /// The function.
        function_id: OperationId,
        /// The array.
        inner: OperationId,
        /// The initial accumulator.
        initial: OperationId,
    },
    /// Constructs a compound value. The kind of compound is given by the
    /// operation's type.
    New {
        /// The elements, in order.
        elements: Vec<OperationId>,
    },
    /// Selects an element of a compound value.
    Accessor {
        /// The compound value.
        source: OperationId,
        /// The element.
        key: AccessorKey,
    },
    /// Refers to an argument of the enclosing function.
    FunctionArgRef {
        /// The function.
        function_id: OperationId,
        /// The argument's name.
        refers_to: String,
    },
    /// Calls a function.
    FunctionCall {
        /// The function.
        function_id: OperationId,
        /// The arguments.
        args: Vec<OperationId>,
    },
}

impl OperationKind {
    /// The operations this one reads, in order. Function identifiers are
    /// not included.
    pub fn operands(&self) -> Vec<OperationId> {
        match self {
            Self::Binary { left, right, .. } => alloc::vec![*left, *right],
            Self::Unary { operand, .. } => alloc::vec![*operand],
            Self::Cast { target } => alloc::vec![*target],
            Self::IfElse {
                cond,
                first,
                second,
            } => alloc::vec![*cond, *first, *second],
            Self::Map { inner, .. } => alloc::vec![*inner],
            Self::Reduce { inner, initial, .. } => alloc::vec![*inner, *initial],
            Self::New { elements } => elements.clone(),
            Self::Accessor { source, .. } => alloc::vec![*source],
            Self::FunctionCall { args, .. } => args.clone(),
            Self::InputReference { .. }
            | Self::LiteralReference { .. }
            | Self::Random
            | Self::FunctionArgRef { .. } => Vec::new(),
        }
    }

    /// The function this operation refers to, if any.
    pub fn function_id(&self) -> Option<OperationId> {
        match self {
            Self::Map { function_id, .. }
            | Self::Reduce { function_id, .. }
            | Self::FunctionArgRef { function_id, .. }
            | Self::FunctionCall { function_id, .. } => Some(*function_id),
            _ => None,
        }
    }
}
