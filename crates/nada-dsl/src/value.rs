use std::fmt;

use nada_mir::{BinaryOp, NadaType, UnaryOp};

use crate::{
    context::Context,
    error::CompileError,
    node::{NodeId, Stamp},
};

/// A handle to a node in a [`Context`].
///
/// Handles are cheap to clone. Cloning a handle does not copy the node, so
/// using a value twice shares its computation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Value {
    pub(crate) id: NodeId,
    pub(crate) stamp: Stamp,
    pub(crate) ty: NadaType,
}

impl Value {
    /// The id of the underlying node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The value's type.
    pub fn ty(&self) -> &NadaType {
        &self.ty
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.ty)
    }
}

macro_rules! binary_methods {
    ($($(#[$meta:meta])* $name:ident => $op:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[track_caller]
            pub fn $name(&self, cx: &mut Context, rhs: &Value) -> Result<Value, CompileError> {
                cx.apply_binary(BinaryOp::$op, self, rhs)
            }
        )*
    };
}

impl Value {
    binary_methods! {
        /// `self + rhs`
        add => Addition,
        /// `self - rhs`
        sub => Subtraction,
        /// `self * rhs`
        mul => Multiplication,
        /// `self / rhs`
        div => Division,
        /// `self % rhs`
        rem => Modulo,
        /// `self ** rhs`
        pow => Power,
        /// `self << rhs`
        shl => LeftShift,
        /// `self >> rhs`
        shr => RightShift,
        /// Probabilistic truncation of `self` by `rhs` bits.
        trunc_pr => TruncPr,
        /// `self < rhs`
        lt => LessThan,
        /// `self > rhs`
        gt => GreaterThan,
        /// `self <= rhs`
        le => LessOrEqualThan,
        /// `self >= rhs`
        ge => GreaterOrEqualThan,
        /// `self == rhs`
        equals => Equals,
        /// `self != rhs`
        not_equals => NotEquals,
        /// Compares `self` and `rhs`, revealing only whether they are equal.
        public_equals => PublicOutputEquality,
        /// `self & rhs`
        and => BooleanAnd,
        /// `self | rhs`
        or => BooleanOr,
        /// `self ^ rhs`
        xor => BooleanXor,
    }

    /// `!self`
    #[track_caller]
    pub fn not(&self, cx: &mut Context) -> Result<Value, CompileError> {
        cx.apply_unary(UnaryOp::Not, self)
    }

    /// Makes a secret value public.
    #[track_caller]
    pub fn reveal(&self, cx: &mut Context) -> Result<Value, CompileError> {
        cx.apply_unary(UnaryOp::Reveal, self)
    }

    /// Converts `self` to `ty`. See [`Context::cast`].
    #[track_caller]
    pub fn cast(&self, cx: &mut Context, ty: NadaType) -> Result<Value, CompileError> {
        cx.cast(self, ty)
    }

    /// Selects `first` if `self` holds and `second` otherwise.
    #[track_caller]
    pub fn if_else(
        &self,
        cx: &mut Context,
        first: &Value,
        second: &Value,
    ) -> Result<Value, CompileError> {
        cx.if_else(self, first, second)
    }
}
