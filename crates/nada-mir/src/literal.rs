use core::fmt;

use serde_derive::{Deserialize, Serialize};

use crate::{BaseType, Mode, NadaType};

/// The value of a compile-time literal.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum LiteralValue {
    /// A signed integer.
    Integer(i64),
    /// An unsigned integer.
    UnsignedInteger(u64),
    /// A boolean.
    Boolean(bool),
    /// A fixed-point rational equal to `mantissa / 10^digits`.
    Rational {
        /// The scaled value.
        mantissa: i64,
        /// Number of fractional digits.
        digits: u32,
    },
}

impl LiteralValue {
    /// The base type of the literal.
    pub const fn base(&self) -> BaseType {
        match self {
            Self::Integer(_) => BaseType::Integer,
            Self::UnsignedInteger(_) => BaseType::UnsignedInteger,
            Self::Boolean(_) => BaseType::Boolean,
            Self::Rational { digits, .. } => BaseType::Rational { digits: *digits },
        }
    }

    /// The type of the literal. Literals are always constants.
    pub const fn ty(&self) -> NadaType {
        NadaType::scalar(self.base(), Mode::Constant)
    }

    /// The zero value of `base`.
    pub const fn zero(base: BaseType) -> Self {
        match base {
            BaseType::Integer => Self::Integer(0),
            BaseType::UnsignedInteger => Self::UnsignedInteger(0),
            BaseType::Boolean => Self::Boolean(false),
            BaseType::Rational { digits } => Self::Rational {
                mantissa: 0,
                digits,
            },
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::UnsignedInteger(v) => write!(f, "{v}u"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Rational { mantissa, digits } => write!(f, "{mantissa}e-{digits}"),
        }
    }
}
