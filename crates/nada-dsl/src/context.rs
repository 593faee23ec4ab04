//! The compilation context and its graph-building entry points.

use std::{panic::Location, sync::Arc};

use nada_mir::{BaseType, BinaryOp, LiteralValue, Mir, NadaType, UnaryOp};

use crate::{
    compile::Compiler,
    decl::{Output, Party},
    error::{CompileError, CompileErrorType},
    node::{Node, NodeId, NodeKind},
    registry::Registry,
    source::{SourceCache, SourceLocation},
    types,
    value::Value,
};

/// Holds the graph of one compilation.
///
/// Build values with the methods here and on [`Value`] and the collection
/// handles, then lower the graph with [`Context::compile`]. Handles are only
/// meaningful in the context that created them. Call [`Context::reset`]
/// before reusing a context for an unrelated program.
#[derive(Debug)]
pub struct Context {
    pub(crate) registry: Registry,
    cache: Arc<SourceCache>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a context that uses the process-wide [`SourceCache`].
    pub fn new() -> Self {
        Self::with_source_cache(SourceCache::shared())
    }

    /// Creates a context with its own source cache.
    pub fn with_source_cache(cache: Arc<SourceCache>) -> Self {
        Self {
            registry: Registry::new(),
            cache,
        }
    }

    /// The cache holding the text of files that created nodes.
    pub fn source_cache(&self) -> &Arc<SourceCache> {
        &self.cache
    }

    /// The number of registered nodes.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Reports whether no nodes have been registered.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Looks up a registered node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.registry.get(id)
    }

    /// Iterates over the registered nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.registry.iter()
    }

    /// Clears the graph. Ids start over from zero and previously created
    /// handles are rejected from then on.
    pub fn reset(&mut self) {
        self.registry.reset();
    }

    /// Lowers the graph reachable from `outputs` into MIR.
    ///
    /// Shorthand for [`Compiler::new`] with default settings.
    pub fn compile(&self, outputs: &[Output]) -> Result<Mir, CompileError> {
        Compiler::new(self, outputs).compile()
    }

    pub(crate) fn capture(&self, caller: &'static Location<'static>) -> SourceLocation {
        SourceLocation::capture(caller, &self.cache)
    }

    /// Checks that `value` refers to a live node of this context.
    pub(crate) fn check_operand(&self, value: &Value) -> Result<(), CompileError> {
        match self.registry.get(value.id) {
            Some(node) if node.stamp == value.stamp => Ok(()),
            _ => Err(CompileErrorType::InvalidHandle(format!(
                "`{value}` was not created by this context or has been discarded"
            ))
            .into()),
        }
    }

    pub(crate) fn push(
        &mut self,
        ty: NadaType,
        location: SourceLocation,
        kind: NodeKind,
    ) -> Value {
        self.registry.insert(ty, location, kind)
    }

    /// Declares a party.
    #[track_caller]
    pub fn party(&self, name: impl Into<String>) -> Party {
        Party {
            name: name.into(),
            location: self.capture(Location::caller()),
        }
    }

    /// Declares an input of type `ty` provided by `party`.
    #[track_caller]
    pub fn input(
        &mut self,
        name: impl Into<String>,
        ty: NadaType,
        party: &Party,
    ) -> Result<Value, CompileError> {
        let location = self.capture(Location::caller());
        self.input_at(name.into(), ty, party, String::new(), location)
    }

    /// Like [`input`][Self::input], with documentation for the input.
    #[track_caller]
    pub fn input_with_doc(
        &mut self,
        name: impl Into<String>,
        ty: NadaType,
        party: &Party,
        doc: impl Into<String>,
    ) -> Result<Value, CompileError> {
        let location = self.capture(Location::caller());
        self.input_at(name.into(), ty, party, doc.into(), location)
    }

    fn input_at(
        &mut self,
        name: String,
        ty: NadaType,
        party: &Party,
        doc: String,
        location: SourceLocation,
    ) -> Result<Value, CompileError> {
        if name.is_empty() {
            return Err(CompileError::at(
                CompileErrorType::InvalidInput("input name must not be empty".into()),
                location,
            ));
        }
        if !ty.is_variable() {
            return Err(CompileError::at(
                CompileErrorType::InvalidInput(format!(
                    "input `{name}` has type `{ty}`, but inputs must be public or secret"
                )),
                location,
            ));
        }
        let kind = NodeKind::Input {
            name,
            party: party.clone(),
            doc,
        };
        Ok(self.push(ty, location, kind))
    }

    /// A constant `Integer`.
    #[track_caller]
    pub fn integer(&mut self, value: i64) -> Value {
        self.literal(LiteralValue::Integer(value))
    }

    /// A constant `UnsignedInteger`.
    #[track_caller]
    pub fn unsigned_integer(&mut self, value: u64) -> Value {
        self.literal(LiteralValue::UnsignedInteger(value))
    }

    /// A constant `Boolean`.
    #[track_caller]
    pub fn boolean(&mut self, value: bool) -> Value {
        self.literal(LiteralValue::Boolean(value))
    }

    /// A constant `Rational` equal to `mantissa / 10^digits`.
    #[track_caller]
    pub fn rational(&mut self, mantissa: i64, digits: u32) -> Value {
        self.literal(LiteralValue::Rational { mantissa, digits })
    }

    /// A constant.
    ///
    /// Equal literals share a node.
    #[track_caller]
    pub fn literal(&mut self, value: LiteralValue) -> Value {
        let location = self.capture(Location::caller());
        self.literal_at(value, location)
    }

    fn literal_at(&mut self, value: LiteralValue, location: SourceLocation) -> Value {
        self.registry.literal(value, location)
    }

    /// A fresh secret random value of type `ty`.
    #[track_caller]
    pub fn random(&mut self, ty: NadaType) -> Result<Value, CompileError> {
        let location = self.capture(Location::caller());
        let ty = types::random_result(&ty).map_err(|err| CompileError::at(err, location))?;
        Ok(self.push(ty, location, NodeKind::Random))
    }

    /// Adds up `values`, starting from the zero of the first value's base
    /// type.
    ///
    /// An empty slice sums to the `Integer` zero.
    #[track_caller]
    pub fn sum(&mut self, values: &[Value]) -> Result<Value, CompileError> {
        let location = self.capture(Location::caller());
        let base = values
            .first()
            .and_then(|v| v.ty.as_scalar())
            .map_or(BaseType::Integer, |(base, _)| base);
        let mark = self.registry.next_id();
        let zero = self.literal_at(LiteralValue::zero(base), location);
        let result = values.iter().try_fold(zero, |acc, v| {
            self.binary_at(BinaryOp::Addition, &acc, v, location)
        });
        if result.is_err() {
            self.registry.rollback(mark);
        }
        result
    }

    /// Applies `op` to `left` and `right`.
    #[track_caller]
    pub fn apply_binary(
        &mut self,
        op: BinaryOp,
        left: &Value,
        right: &Value,
    ) -> Result<Value, CompileError> {
        let location = self.capture(Location::caller());
        self.binary_at(op, left, right, location)
    }

    pub(crate) fn binary_at(
        &mut self,
        op: BinaryOp,
        left: &Value,
        right: &Value,
        location: SourceLocation,
    ) -> Result<Value, CompileError> {
        self.check_operand(left)?;
        self.check_operand(right)?;
        let ty = types::binary_result(op, &left.ty, &right.ty)
            .map_err(|err| CompileError::at(err, location))?;
        let kind = NodeKind::Binary {
            op,
            left: left.id,
            right: right.id,
        };
        Ok(self.push(ty, location, kind))
    }

    /// Applies `op` to `operand`.
    #[track_caller]
    pub fn apply_unary(&mut self, op: UnaryOp, operand: &Value) -> Result<Value, CompileError> {
        let location = self.capture(Location::caller());
        self.unary_at(op, operand, location)
    }

    pub(crate) fn unary_at(
        &mut self,
        op: UnaryOp,
        operand: &Value,
        location: SourceLocation,
    ) -> Result<Value, CompileError> {
        self.check_operand(operand)?;
        let ty =
            types::unary_result(op, &operand.ty).map_err(|err| CompileError::at(err, location))?;
        let kind = NodeKind::Unary {
            op,
            operand: operand.id,
        };
        Ok(self.push(ty, location, kind))
    }

    /// Converts `value` to `ty`, which may only raise its mode.
    #[track_caller]
    pub fn cast(&mut self, value: &Value, ty: NadaType) -> Result<Value, CompileError> {
        let location = self.capture(Location::caller());
        self.check_operand(value)?;
        let ty = types::cast_result(&value.ty, &ty).map_err(|err| CompileError::at(err, location))?;
        Ok(self.push(ty, location, NodeKind::Cast { target: value.id }))
    }

    /// Selects `first` if `cond` holds and `second` otherwise.
    #[track_caller]
    pub fn if_else(
        &mut self,
        cond: &Value,
        first: &Value,
        second: &Value,
    ) -> Result<Value, CompileError> {
        let location = self.capture(Location::caller());
        for v in [cond, first, second] {
            self.check_operand(v)?;
        }
        let ty = types::if_else_result(&cond.ty, &first.ty, &second.ty)
            .map_err(|err| CompileError::at(err, location))?;
        let kind = NodeKind::IfElse {
            cond: cond.id,
            first: first.id,
            second: second.id,
        };
        Ok(self.push(ty, location, kind))
    }
}
