//! Type compatibility rules.
//!
//! Every graph-building operation asks this module for its result type
//! before a node is registered, so a rejected operation leaves the registry
//! untouched.

use std::{
    borrow::Cow,
    fmt::{self, Display},
};

use nada_mir::{BaseType, BinaryOp, Mode, NadaType, UnaryOp};

/// Describes the nature of a type error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeError {
    op: Cow<'static, str>,
    operands: Vec<NadaType>,
    reason: Cow<'static, str>,
}

impl TypeError {
    pub(crate) fn new(
        op: impl Into<Cow<'static, str>>,
        operands: impl IntoIterator<Item = NadaType>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            op: op.into(),
            operands: operands.into_iter().collect(),
            reason: reason.into(),
        }
    }

    /// The operation that was rejected.
    pub fn op(&self) -> &str {
        &self.op
    }

    /// The operand types the operation was applied to.
    pub fn operands(&self) -> &[NadaType] {
        &self.operands
    }

    /// Why the operands were rejected.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type Error: `{}` on (", self.op)?;
        for (i, ty) in self.operands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, "): {}", self.reason)
    }
}

impl std::error::Error for TypeError {}

fn binary_err(
    op: BinaryOp,
    left: &NadaType,
    right: &NadaType,
    reason: &'static str,
) -> TypeError {
    TypeError::new(op.as_str(), [left.clone(), right.clone()], reason)
}

/// Computes the result type of `left op right`.
pub fn binary_result(
    op: BinaryOp,
    left: &NadaType,
    right: &NadaType,
) -> Result<NadaType, TypeError> {
    match op {
        BinaryOp::Zip => zip_result(left, right),
        BinaryOp::InnerProduct => inner_product_result(left, right),
        _ => {
            let (Some(l), Some(r)) = (left.as_scalar(), right.as_scalar()) else {
                return Err(binary_err(op, left, right, "operands must be scalars"));
            };
            scalar_binary_result(op, l, r)
                .map_err(|reason| binary_err(op, left, right, reason))
        }
    }
}

fn is_integral(base: BaseType) -> bool {
    matches!(base, BaseType::Integer | BaseType::UnsignedInteger)
}

/// Checks that both bases are the same numeric type, including rational
/// precision.
fn same_numeric(l: BaseType, r: BaseType) -> Result<BaseType, &'static str> {
    if !l.is_numeric() || !r.is_numeric() {
        return Err("operator requires numeric operands");
    }
    if !l.same_kind(&r) {
        return Err("operand base types must match");
    }
    if l != r {
        return Err("rational operands must have the same digits");
    }
    Ok(l)
}

fn same_integral(l: BaseType, r: BaseType) -> Result<BaseType, &'static str> {
    if !is_integral(l) || !is_integral(r) {
        return Err("operator requires integer operands");
    }
    if l != r {
        return Err("operand base types must match");
    }
    Ok(l)
}

fn scalar_binary_result(
    op: BinaryOp,
    (lb, lm): (BaseType, Mode),
    (rb, rm): (BaseType, Mode),
) -> Result<NadaType, &'static str> {
    let mode = lm.max(rm);
    match op {
        BinaryOp::Addition | BinaryOp::Subtraction | BinaryOp::Division => {
            let base = same_numeric(lb, rb)?;
            Ok(NadaType::scalar(base, mode))
        }
        BinaryOp::Multiplication => match (lb, rb) {
            (BaseType::Rational { digits: a }, BaseType::Rational { digits: b }) => {
                let digits = a.checked_add(b).ok_or("rational digits overflow")?;
                Ok(NadaType::rational(digits, mode))
            }
            _ => {
                let base = same_numeric(lb, rb)?;
                Ok(NadaType::scalar(base, mode))
            }
        },
        BinaryOp::Modulo => {
            let base = same_integral(lb, rb)?;
            Ok(NadaType::scalar(base, mode))
        }
        BinaryOp::Power => {
            let base = same_integral(lb, rb)?;
            if lm == Mode::Secret || rm == Mode::Secret {
                return Err("power is not defined for secret operands");
            }
            Ok(NadaType::scalar(base, mode))
        }
        BinaryOp::LeftShift | BinaryOp::RightShift | BinaryOp::TruncPr => {
            if !is_integral(lb) {
                return Err("only integers can be shifted");
            }
            if rb != BaseType::UnsignedInteger {
                return Err("shift amount must be an unsigned integer");
            }
            if rm == Mode::Secret {
                return Err("shift amount must not be secret");
            }
            if op == BinaryOp::TruncPr && lm != Mode::Secret {
                return Err("only secret values can be truncated");
            }
            Ok(NadaType::scalar(lb, lm))
        }
        BinaryOp::LessThan
        | BinaryOp::GreaterThan
        | BinaryOp::LessOrEqualThan
        | BinaryOp::GreaterOrEqualThan => {
            same_numeric(lb, rb)?;
            Ok(NadaType::scalar(BaseType::Boolean, mode))
        }
        BinaryOp::Equals | BinaryOp::NotEquals => {
            if lb != rb {
                return Err("operand base types must match");
            }
            Ok(NadaType::scalar(BaseType::Boolean, mode))
        }
        BinaryOp::PublicOutputEquality => {
            if lb != rb {
                return Err("operand base types must match");
            }
            if !lm.is_variable() || !rm.is_variable() {
                return Err("operands must be public or secret");
            }
            if lm != rm {
                return Err("operands must have the same mode");
            }
            Ok(NadaType::public_boolean())
        }
        BinaryOp::BooleanAnd | BinaryOp::BooleanOr | BinaryOp::BooleanXor => {
            if lb != BaseType::Boolean || rb != BaseType::Boolean {
                return Err("operator requires boolean operands");
            }
            Ok(NadaType::scalar(BaseType::Boolean, mode))
        }
        BinaryOp::Zip | BinaryOp::InnerProduct => Err("operands must be arrays"),
    }
}

fn array_parts(ty: &NadaType) -> Option<(&NadaType, Option<u32>)> {
    match ty {
        NadaType::Array { inner, size } => Some((inner, *size)),
        _ => None,
    }
}

/// Merges two optional array sizes, failing if both are known and differ.
fn merge_sizes(l: Option<u32>, r: Option<u32>) -> Result<Option<u32>, &'static str> {
    match (l, r) {
        (Some(l), Some(r)) if l != r => Err("arrays must have the same size"),
        (l, r) => Ok(l.or(r)),
    }
}

fn zip_result(left: &NadaType, right: &NadaType) -> Result<NadaType, TypeError> {
    let op = BinaryOp::Zip;
    let (Some((li, ls)), Some((ri, rs))) = (array_parts(left), array_parts(right)) else {
        return Err(binary_err(op, left, right, "operands must be arrays"));
    };
    let size = merge_sizes(ls, rs).map_err(|reason| binary_err(op, left, right, reason))?;
    Ok(NadaType::Array {
        inner: Box::new(NadaType::tuple(li.clone(), ri.clone())),
        size,
    })
}

fn inner_product_result(left: &NadaType, right: &NadaType) -> Result<NadaType, TypeError> {
    let op = BinaryOp::InnerProduct;
    let (Some((li, ls)), Some((ri, rs))) = (array_parts(left), array_parts(right)) else {
        return Err(binary_err(op, left, right, "operands must be arrays"));
    };
    merge_sizes(ls, rs).map_err(|reason| binary_err(op, left, right, reason))?;
    let (Some(l), Some(r)) = (li.as_scalar(), ri.as_scalar()) else {
        return Err(binary_err(op, left, right, "array elements must be scalars"));
    };
    scalar_binary_result(BinaryOp::Multiplication, l, r)
        .map_err(|reason| binary_err(op, left, right, reason))
}

/// Computes the result type of `op operand`.
pub fn unary_result(op: UnaryOp, operand: &NadaType) -> Result<NadaType, TypeError> {
    let err = |reason: &'static str| TypeError::new(op.as_str(), [operand.clone()], reason);
    match op {
        UnaryOp::Not => match operand.as_scalar() {
            Some((BaseType::Boolean, _)) => Ok(operand.clone()),
            _ => Err(err("operator requires a boolean operand")),
        },
        UnaryOp::Reveal => match operand.as_scalar() {
            Some((base, Mode::Secret)) => Ok(NadaType::scalar(base, Mode::Public)),
            Some(_) => Err(err("only secret values can be revealed")),
            None => Err(err("operand must be a scalar")),
        },
        UnaryOp::Unzip => match operand {
            NadaType::Array { inner, size } => match &**inner {
                NadaType::Tuple { left, right } => Ok(NadaType::tuple(
                    NadaType::Array {
                        inner: left.clone(),
                        size: *size,
                    },
                    NadaType::Array {
                        inner: right.clone(),
                        size: *size,
                    },
                )),
                _ => Err(err("array elements must be tuples")),
            },
            _ => Err(err("operand must be an array")),
        },
    }
}

/// Computes the result type of casting `from` to `to`.
///
/// Casts may only raise the mode of a scalar; the base type is fixed.
pub fn cast_result(from: &NadaType, to: &NadaType) -> Result<NadaType, TypeError> {
    let err = |reason: &'static str| TypeError::new("cast", [from.clone(), to.clone()], reason);
    let (Some((fb, fm)), Some((tb, tm))) = (from.as_scalar(), to.as_scalar()) else {
        return Err(err("only scalars can be cast"));
    };
    if fb != tb {
        return Err(err("cast cannot change the base type"));
    }
    if tm < fm {
        return Err(err("cast cannot lower the mode"));
    }
    Ok(to.clone())
}

/// Computes the result type of `if cond { first } else { second }`.
pub fn if_else_result(
    cond: &NadaType,
    first: &NadaType,
    second: &NadaType,
) -> Result<NadaType, TypeError> {
    let err = |reason: &'static str| {
        TypeError::new(
            "if-else",
            [cond.clone(), first.clone(), second.clone()],
            reason,
        )
    };
    let Some((BaseType::Boolean, cm)) = cond.as_scalar() else {
        return Err(err("condition must be a boolean"));
    };
    let (Some((fb, fm)), Some((sb, sm))) = (first.as_scalar(), second.as_scalar()) else {
        return Err(err("branches must be scalars"));
    };
    if fb != sb {
        return Err(err("branch base types must match"));
    }
    Ok(NadaType::scalar(fb, cm.max(fm).max(sm)))
}

/// Checks that `ty` can be produced by a random operation.
pub fn random_result(ty: &NadaType) -> Result<NadaType, TypeError> {
    match ty.as_scalar() {
        Some((
            BaseType::Integer | BaseType::UnsignedInteger | BaseType::Boolean,
            Mode::Secret,
        )) => Ok(ty.clone()),
        _ => Err(TypeError::new(
            "random",
            [ty.clone()],
            "only secret integers and booleans can be random",
        )),
    }
}
