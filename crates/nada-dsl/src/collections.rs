//! Typed handles for compound values.
//!
//! None of these implement [`IntoIterator`]. Their elements only exist when
//! the program runs, so they are reached through [`Array::map`],
//! [`Array::reduce`] and the accessors instead.

use std::panic::Location;

use buggy::{Bug, BugExt, bug};
use nada_mir::{AccessorKey, BinaryOp, NadaType, UnaryOp};

use crate::{
    context::Context,
    error::{CompileError, CompileErrorType},
    function::Function,
    node::NodeKind,
    source::SourceLocation,
    types::TypeError,
    value::Value,
};

fn access(
    cx: &mut Context,
    source: &Value,
    key: AccessorKey,
    ty: NadaType,
    location: SourceLocation,
) -> Result<Value, CompileError> {
    cx.check_operand(source)?;
    let kind = NodeKind::Accessor {
        source: source.id,
        key,
    };
    Ok(cx.push(ty, location, kind))
}

fn construct(
    cx: &mut Context,
    elements: &[&Value],
    ty: NadaType,
    location: SourceLocation,
) -> Result<Value, CompileError> {
    for v in elements {
        cx.check_operand(v)?;
    }
    let kind = NodeKind::New {
        elements: elements.iter().map(|v| v.id).collect(),
    };
    Ok(cx.push(ty, location, kind))
}

fn out_of_bounds(index: u32, len: usize, location: SourceLocation) -> CompileError {
    CompileError::at(
        CompileErrorType::IndexOutOfBounds {
            index,
            len: u32::try_from(len).unwrap_or(u32::MAX),
        },
        location,
    )
}

fn wrong_kind(expected: &'static str, ty: &NadaType) -> TypeError {
    TypeError::new(
        format!("into {expected}"),
        [ty.clone()],
        format!("value is not {expected}"),
    )
}

macro_rules! handle_conversions {
    ($name:ident, $pattern:pat, $expected:literal) => {
        impl TryFrom<Value> for $name {
            type Error = TypeError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value.ty {
                    $pattern => Ok(Self(value)),
                    _ => Err(wrong_kind($expected, &value.ty)),
                }
            }
        }

        impl From<$name> for Value {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }

        impl AsRef<Value> for $name {
            fn as_ref(&self) -> &Value {
                &self.0
            }
        }
    };
}

handle_conversions!(Array, NadaType::Array { .. }, "an array");
handle_conversions!(Tuple, NadaType::Tuple { .. }, "a tuple");
handle_conversions!(NTuple, NadaType::NTuple { .. }, "an n-tuple");
handle_conversions!(Object, NadaType::Object { .. }, "an object");

/// A fixed-size homogeneous array.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Array(Value);

#[allow(clippy::len_without_is_empty)]
impl Array {
    /// Builds an array from `elements`, which must all have the same type.
    #[track_caller]
    pub fn new(cx: &mut Context, elements: &[Value]) -> Result<Self, CompileError> {
        let location = cx.capture(Location::caller());
        let Some(first) = elements.first() else {
            return Err(CompileError::at(
                CompileErrorType::EmptyCollection("array"),
                location,
            ));
        };
        if elements.iter().any(|v| v.ty != first.ty) {
            let err = TypeError::new(
                "array",
                elements.iter().map(|v| v.ty.clone()),
                "array elements must have the same type",
            );
            return Err(CompileError::at(err, location));
        }
        let size = u32::try_from(elements.len()).assume("array size must fit in u32")?;
        let ty = NadaType::array(first.ty.clone(), size);
        let refs: Vec<&Value> = elements.iter().collect();
        construct(cx, &refs, ty, location).map(Self)
    }

    fn parts(&self) -> Result<(&NadaType, Option<u32>), Bug> {
        match &self.0.ty {
            NadaType::Array { inner, size } => Ok((inner, *size)),
            _ => bug!("array handle must have an array type"),
        }
    }

    /// The underlying value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The element type.
    pub fn inner_type(&self) -> Option<&NadaType> {
        self.parts().ok().map(|(inner, _)| inner)
    }

    /// The number of elements, if known.
    pub fn len(&self) -> Option<u32> {
        self.parts().ok().and_then(|(_, size)| size)
    }

    /// The element at `index`.
    #[track_caller]
    pub fn get(&self, cx: &mut Context, index: u32) -> Result<Value, CompileError> {
        let location = cx.capture(Location::caller());
        let (inner, size) = self.parts()?;
        if let Some(size) = size {
            if index >= size {
                return Err(CompileError::at(
                    CompileErrorType::IndexOutOfBounds { index, len: size },
                    location,
                ));
            }
        }
        let ty = inner.clone();
        access(cx, &self.0, AccessorKey::Index(index), ty, location)
    }

    /// Applies `f` to every element.
    ///
    /// `f` takes one argument of the element type.
    #[track_caller]
    pub fn map(&self, cx: &mut Context, f: &Function) -> Result<Array, CompileError> {
        let location = cx.capture(Location::caller());
        cx.check_operand(&self.0)?;
        let (inner, size) = self.parts()?;
        f.check_arity(1, location)?;
        if let Some(param) = f.params().iter().find(|p| p.ty() != inner) {
            let err = TypeError::new(
                "map",
                [self.0.ty.clone(), param.ty().clone()],
                "function argument must match the array element type",
            );
            return Err(CompileError::at(err, location));
        }
        let traced = f.trace(cx)?;
        let ty = NadaType::Array {
            inner: Box::new(traced.ret),
            size,
        };
        let kind = NodeKind::Map {
            inner: self.0.id,
            function: traced.id,
        };
        Ok(Array(cx.push(ty, location, kind)))
    }

    /// Folds the elements into `initial` with `f`.
    ///
    /// `f` takes the accumulator and an element, and returns the new
    /// accumulator.
    #[track_caller]
    pub fn reduce(
        &self,
        cx: &mut Context,
        f: &Function,
        initial: &Value,
    ) -> Result<Value, CompileError> {
        let location = cx.capture(Location::caller());
        cx.check_operand(&self.0)?;
        cx.check_operand(initial)?;
        let (inner, _) = self.parts()?;
        f.check_arity(2, location)?;
        let mismatch = |reason: &'static str, found: &NadaType| {
            let err = TypeError::new(
                "reduce",
                [self.0.ty.clone(), initial.ty.clone(), found.clone()],
                reason,
            );
            CompileError::at(err, location)
        };
        if let [acc, elem] = f.params() {
            if acc.ty() != &initial.ty {
                return Err(mismatch(
                    "accumulator must match the initial value",
                    acc.ty(),
                ));
            }
            if elem.ty() != inner {
                return Err(mismatch(
                    "function argument must match the array element type",
                    elem.ty(),
                ));
            }
        }

        let mark = cx.registry.next_id();
        let traced = f.trace(cx)?;
        if traced.ret != initial.ty {
            cx.registry.rollback(mark);
            return Err(mismatch(
                "function must return the accumulator type",
                &traced.ret,
            ));
        }
        let kind = NodeKind::Reduce {
            inner: self.0.id,
            function: traced.id,
            initial: initial.id,
        };
        Ok(cx.push(initial.ty.clone(), location, kind))
    }

    /// Pairs up the elements of `self` and `other`.
    #[track_caller]
    pub fn zip(&self, cx: &mut Context, other: &Array) -> Result<Array, CompileError> {
        let location = cx.capture(Location::caller());
        cx.binary_at(BinaryOp::Zip, &self.0, &other.0, location).map(Array)
    }

    /// Splits an array of tuples into a tuple of arrays.
    #[track_caller]
    pub fn unzip(&self, cx: &mut Context) -> Result<Tuple, CompileError> {
        let location = cx.capture(Location::caller());
        cx.unary_at(UnaryOp::Unzip, &self.0, location).map(Tuple)
    }

    /// The sum of the products of corresponding elements.
    #[track_caller]
    pub fn inner_product(&self, cx: &mut Context, other: &Array) -> Result<Value, CompileError> {
        let location = cx.capture(Location::caller());
        cx.binary_at(BinaryOp::InnerProduct, &self.0, &other.0, location)
    }
}

/// A pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tuple(Value);

impl Tuple {
    /// Builds the pair `(left, right)`.
    #[track_caller]
    pub fn new(cx: &mut Context, left: &Value, right: &Value) -> Result<Self, CompileError> {
        let location = cx.capture(Location::caller());
        let ty = NadaType::tuple(left.ty.clone(), right.ty.clone());
        construct(cx, &[left, right], ty, location).map(Self)
    }

    fn parts(&self) -> Result<(&NadaType, &NadaType), Bug> {
        match &self.0.ty {
            NadaType::Tuple { left, right } => Ok((left, right)),
            _ => bug!("tuple handle must have a tuple type"),
        }
    }

    /// The underlying value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The first element.
    #[track_caller]
    pub fn left(&self, cx: &mut Context) -> Result<Value, CompileError> {
        let location = cx.capture(Location::caller());
        let ty = self.parts()?.0.clone();
        access(cx, &self.0, AccessorKey::Index(0), ty, location)
    }

    /// The second element.
    #[track_caller]
    pub fn right(&self, cx: &mut Context) -> Result<Value, CompileError> {
        let location = cx.capture(Location::caller());
        let ty = self.parts()?.1.clone();
        access(cx, &self.0, AccessorKey::Index(1), ty, location)
    }
}

/// A fixed-size tuple whose elements may have different types.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NTuple(Value);

impl NTuple {
    /// Builds an n-tuple from `elements`.
    #[track_caller]
    pub fn new(cx: &mut Context, elements: &[Value]) -> Result<Self, CompileError> {
        let location = cx.capture(Location::caller());
        if elements.is_empty() {
            return Err(CompileError::at(
                CompileErrorType::EmptyCollection("n-tuple"),
                location,
            ));
        }
        let ty = NadaType::NTuple {
            types: elements.iter().map(|v| v.ty.clone()).collect(),
        };
        let refs: Vec<&Value> = elements.iter().collect();
        construct(cx, &refs, ty, location).map(Self)
    }

    /// The underlying value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The element at `index`.
    #[track_caller]
    pub fn get(&self, cx: &mut Context, index: u32) -> Result<Value, CompileError> {
        let location = cx.capture(Location::caller());
        let NadaType::NTuple { types } = &self.0.ty else {
            bug!("n-tuple handle must have an n-tuple type");
        };
        let ty = usize::try_from(index)
            .ok()
            .and_then(|i| types.get(i))
            .ok_or_else(|| out_of_bounds(index, types.len(), location))?
            .clone();
        access(cx, &self.0, AccessorKey::Index(index), ty, location)
    }
}

/// A record with named fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Object(Value);

impl Object {
    /// Builds an object. Field order is kept.
    #[track_caller]
    pub fn new(cx: &mut Context, fields: &[(&str, &Value)]) -> Result<Self, CompileError> {
        let location = cx.capture(Location::caller());
        if fields.is_empty() {
            return Err(CompileError::at(
                CompileErrorType::EmptyCollection("object"),
                location,
            ));
        }
        for (i, (name, _)) in fields.iter().enumerate() {
            if fields.iter().take(i).any(|(prev, _)| prev == name) {
                let err = TypeError::new(
                    "object",
                    fields.iter().map(|(_, v)| v.ty.clone()),
                    format!("field `{name}` is defined more than once"),
                );
                return Err(CompileError::at(err, location));
            }
        }
        let ty = NadaType::Object {
            fields: fields
                .iter()
                .map(|(name, v)| ((*name).to_owned(), v.ty.clone()))
                .collect(),
        };
        let elements: Vec<&Value> = fields.iter().map(|(_, v)| *v).collect();
        construct(cx, &elements, ty, location).map(Self)
    }

    /// The underlying value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The field called `name`.
    #[track_caller]
    pub fn get(&self, cx: &mut Context, name: &str) -> Result<Value, CompileError> {
        let location = cx.capture(Location::caller());
        let NadaType::Object { fields } = &self.0.ty else {
            bug!("object handle must have an object type");
        };
        let Some((_, ty)) = fields.iter().find(|(field, _)| field == name) else {
            return Err(CompileError::at(
                CompileErrorType::UnknownField(name.to_owned()),
                location,
            ));
        };
        let ty = ty.clone();
        access(cx, &self.0, AccessorKey::Field(name.to_owned()), ty, location)
    }
}
