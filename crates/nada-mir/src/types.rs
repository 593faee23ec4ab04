extern crate alloc;

use alloc::{boxed::Box, string::String, vec::Vec};
use core::fmt;

use serde_derive::{Deserialize, Serialize};

/// The visibility of a value.
///
/// Modes are totally ordered: `Constant < Public < Secret`. Combining two
/// operands yields the greater of their modes.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum Mode {
    /// A compile-time literal.
    Constant,
    /// A value visible to every party at runtime.
    Public,
    /// A secret-shared value.
    Secret,
}

impl Mode {
    /// Reports whether the value is provided at runtime (`Public` or
    /// `Secret`).
    pub const fn is_variable(self) -> bool {
        !matches!(self, Self::Constant)
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::Constant => "",
            Self::Public => "Public",
            Self::Secret => "Secret",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant => f.write_str("constant"),
            Self::Public => f.write_str("public"),
            Self::Secret => f.write_str("secret"),
        }
    }
}

/// The base of a scalar type, independent of its [`Mode`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum BaseType {
    /// A signed integer.
    Integer,
    /// An unsigned integer.
    UnsignedInteger,
    /// A boolean.
    Boolean,
    /// A fixed-point rational with `digits` fractional decimal digits.
    Rational {
        /// Number of fractional digits.
        digits: u32,
    },
}

impl BaseType {
    /// Reports whether both bases are the same kind, ignoring rational
    /// precision.
    pub fn same_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Integer, Self::Integer)
                | (Self::UnsignedInteger, Self::UnsignedInteger)
                | (Self::Boolean, Self::Boolean)
                | (Self::Rational { .. }, Self::Rational { .. })
        )
    }

    /// Reports whether the base supports arithmetic.
    pub const fn is_numeric(&self) -> bool {
        !matches!(self, Self::Boolean)
    }
}

/// A Nada type.
///
/// Type equality is structural.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NadaType {
    /// A scalar of some base type and mode.
    Scalar {
        /// The base type.
        base: BaseType,
        /// The mode.
        mode: Mode,
    },
    /// A homogeneous array.
    Array {
        /// The element type.
        inner: Box<NadaType>,
        /// The number of elements, if known.
        size: Option<u32>,
    },
    /// A pair.
    Tuple {
        /// The first element type.
        left: Box<NadaType>,
        /// The second element type.
        right: Box<NadaType>,
    },
    /// A fixed-size heterogeneous tuple.
    NTuple {
        /// The element types.
        types: Vec<NadaType>,
    },
    /// A record with named fields, in declaration order.
    Object {
        /// The fields.
        fields: Vec<(String, NadaType)>,
    },
    /// A function signature.
    Function {
        /// Argument types.
        args: Vec<NadaType>,
        /// Return type.
        ret: Box<NadaType>,
    },
}

impl NadaType {
    /// Creates a scalar type.
    pub const fn scalar(base: BaseType, mode: Mode) -> Self {
        Self::Scalar { base, mode }
    }

    /// `Integer` (constant).
    pub const fn integer() -> Self {
        Self::scalar(BaseType::Integer, Mode::Constant)
    }

    /// `PublicInteger`.
    pub const fn public_integer() -> Self {
        Self::scalar(BaseType::Integer, Mode::Public)
    }

    /// `SecretInteger`.
    pub const fn secret_integer() -> Self {
        Self::scalar(BaseType::Integer, Mode::Secret)
    }

    /// `UnsignedInteger` (constant).
    pub const fn unsigned_integer() -> Self {
        Self::scalar(BaseType::UnsignedInteger, Mode::Constant)
    }

    /// `PublicUnsignedInteger`.
    pub const fn public_unsigned_integer() -> Self {
        Self::scalar(BaseType::UnsignedInteger, Mode::Public)
    }

    /// `SecretUnsignedInteger`.
    pub const fn secret_unsigned_integer() -> Self {
        Self::scalar(BaseType::UnsignedInteger, Mode::Secret)
    }

    /// `Boolean` (constant).
    pub const fn boolean() -> Self {
        Self::scalar(BaseType::Boolean, Mode::Constant)
    }

    /// `PublicBoolean`.
    pub const fn public_boolean() -> Self {
        Self::scalar(BaseType::Boolean, Mode::Public)
    }

    /// `SecretBoolean`.
    pub const fn secret_boolean() -> Self {
        Self::scalar(BaseType::Boolean, Mode::Secret)
    }

    /// A rational of the given mode and precision.
    pub const fn rational(digits: u32, mode: Mode) -> Self {
        Self::scalar(BaseType::Rational { digits }, mode)
    }

    /// An array of `inner` with `size` elements.
    pub fn array(inner: NadaType, size: u32) -> Self {
        Self::Array {
            inner: Box::new(inner),
            size: Some(size),
        }
    }

    /// A pair of `left` and `right`.
    pub fn tuple(left: NadaType, right: NadaType) -> Self {
        Self::Tuple {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Returns the base and mode if this is a scalar.
    pub fn as_scalar(&self) -> Option<(BaseType, Mode)> {
        match self {
            Self::Scalar { base, mode } => Some((*base, *mode)),
            _ => None,
        }
    }

    /// Returns the scalar mode, if this is a scalar.
    pub fn mode(&self) -> Option<Mode> {
        self.as_scalar().map(|(_, mode)| mode)
    }

    /// Reports whether every scalar leaf of this type is provided at
    /// runtime. Function signatures never are.
    pub fn is_variable(&self) -> bool {
        match self {
            Self::Scalar { mode, .. } => mode.is_variable(),
            Self::Array { inner, .. } => inner.is_variable(),
            Self::Tuple { left, right } => left.is_variable() && right.is_variable(),
            Self::NTuple { types } => types.iter().all(Self::is_variable),
            Self::Object { fields } => fields.iter().all(|(_, ty)| ty.is_variable()),
            Self::Function { .. } => false,
        }
    }

    /// A short description of the type's shape, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar { .. } => "scalar",
            Self::Array { .. } => "array",
            Self::Tuple { .. } => "tuple",
            Self::NTuple { .. } => "ntuple",
            Self::Object { .. } => "object",
            Self::Function { .. } => "function",
        }
    }
}

impl fmt::Display for NadaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar { base, mode } => {
                f.write_str(mode.prefix())?;
                match base {
                    BaseType::Integer => f.write_str("Integer"),
                    BaseType::UnsignedInteger => f.write_str("UnsignedInteger"),
                    BaseType::Boolean => f.write_str("Boolean"),
                    BaseType::Rational { digits } => write!(f, "Rational({digits})"),
                }
            }
            Self::Array { inner, size } => match size {
                Some(size) => write!(f, "Array<{inner}; {size}>"),
                None => write!(f, "Array<{inner}>"),
            },
            Self::Tuple { left, right } => write!(f, "Tuple<{left}, {right}>"),
            Self::NTuple { types } => {
                f.write_str("NTuple<")?;
                write_list(f, types.iter())?;
                f.write_str(">")
            }
            Self::Object { fields } => {
                f.write_str("Object{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str("}")
            }
            Self::Function { args, ret } => {
                f.write_str("fn(")?;
                write_list(f, args.iter())?;
                write!(f, ") -> {ret}")
            }
        }
    }
}

fn write_list<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a NadaType>,
) -> fmt::Result {
    for (i, ty) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}
