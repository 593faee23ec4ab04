//! User-defined functions for `map`, `reduce` and direct calls.

use std::{
    fmt,
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use nada_mir::NadaType;
use tracing::debug;

use crate::{
    context::Context,
    error::{CompileError, CompileErrorType},
    node::{NodeId, NodeKind},
    registry::FunctionState,
    source::SourceLocation,
    types::TypeError,
    value::Value,
};

/// Process-unique identity of a [`Function`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct FunctionKey(u64);

impl FunctionKey {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A function parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    name: String,
    ty: NadaType,
}

impl Param {
    /// Creates a parameter.
    pub fn new(name: impl Into<String>, ty: NadaType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// The parameter's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter's type.
    pub fn ty(&self) -> &NadaType {
        &self.ty
    }
}

type Body = dyn Fn(&mut Context, &[Value]) -> Result<Value, CompileError>;

/// A function whose body builds graph nodes.
///
/// The body runs once per context, the first time the function is used,
/// with one argument handle per parameter. The nodes it creates become the
/// function's definition, which every later use shares. Clones of a
/// function share its identity.
#[derive(Clone)]
pub struct Function {
    key: FunctionKey,
    name: String,
    params: Vec<Param>,
    body: Arc<Body>,
    caller: &'static Location<'static>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A traced function's definition node and signature.
#[derive(Clone, Debug)]
pub(crate) struct Traced {
    pub id: NodeId,
    pub ret: NadaType,
}

impl Function {
    /// Creates a function.
    #[track_caller]
    pub fn new<F>(
        name: impl Into<String>,
        params: impl IntoIterator<Item = Param>,
        body: F,
    ) -> Self
    where
        F: Fn(&mut Context, &[Value]) -> Result<Value, CompileError> + 'static,
    {
        Self {
            key: FunctionKey::new(),
            name: name.into(),
            params: params.into_iter().collect(),
            body: Arc::new(body),
            caller: Location::caller(),
        }
    }

    /// The function's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function's parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn check_arity(
        &self,
        found: usize,
        location: SourceLocation,
    ) -> Result<(), CompileError> {
        if self.params.len() != found {
            return Err(CompileError::at(
                CompileErrorType::ArityMismatch {
                    function: self.name.clone(),
                    expected: self.params.len(),
                    found,
                },
                location,
            ));
        }
        Ok(())
    }

    /// Returns the function's definition in `cx`, tracing the body if this
    /// is the function's first use there.
    pub(crate) fn trace(&self, cx: &mut Context) -> Result<Traced, CompileError> {
        match cx.registry.function_state(self.key) {
            Some(FunctionState::Traced(id)) => return Self::traced(cx, id),
            Some(FunctionState::Tracing) => {
                let location = cx.capture(self.caller);
                return Err(CompileError::at(
                    CompileErrorType::RecursiveFunction(self.name.clone()),
                    location,
                ));
            }
            None => {}
        }

        let mark = cx.registry.next_id();
        cx.registry.set_function_state(self.key, FunctionState::Tracing);
        match self.trace_body(cx) {
            Ok(traced) => {
                cx.registry.set_function_state(self.key, FunctionState::Traced(traced.id));
                debug!(name = %self.name, id = %traced.id, ret = %traced.ret, "traced function");
                Ok(traced)
            }
            Err(err) => {
                cx.registry.rollback(mark);
                cx.registry.remove_function(self.key);
                debug!(name = %self.name, %err, "failed to trace function");
                Err(err)
            }
        }
    }

    fn traced(cx: &Context, id: NodeId) -> Result<Traced, CompileError> {
        match &cx.registry.node(id)?.ty {
            NadaType::Function { ret, .. } => Ok(Traced {
                id,
                ret: (**ret).clone(),
            }),
            _ => buggy::bug!("function definition must have a function type"),
        }
    }

    fn trace_body(&self, cx: &mut Context) -> Result<Traced, CompileError> {
        let location = cx.capture(self.caller);
        let arg_types: Vec<NadaType> = self.params.iter().map(|p| p.ty.clone()).collect();
        // The return type is unknown until the body has run.
        let def = cx.registry.insert(
            NadaType::Function {
                args: arg_types.clone(),
                ret: Box::new(NadaType::NTuple { types: Vec::new() }),
            },
            location,
            NodeKind::FunctionDef {
                name: self.name.clone(),
                args: Vec::new(),
                body: None,
            },
        )
        .id;

        let args: Vec<Value> = self
            .params
            .iter()
            .map(|param| {
                cx.push(
                    param.ty.clone(),
                    location,
                    NodeKind::FunctionArgRef {
                        function: def,
                        name: param.name.clone(),
                    },
                )
            })
            .collect();

        let ret = (self.body)(cx, &args)?;
        cx.check_operand(&ret)?;

        let node = cx.registry.node_mut(def)?;
        node.ty = NadaType::Function {
            args: arg_types,
            ret: Box::new(ret.ty.clone()),
        };
        node.kind = NodeKind::FunctionDef {
            name: self.name.clone(),
            args: args.iter().map(|a| a.id).collect(),
            body: Some(ret.id),
        };
        Ok(Traced {
            id: def,
            ret: ret.ty,
        })
    }

    /// Calls the function with `args`.
    #[track_caller]
    pub fn call(&self, cx: &mut Context, args: &[Value]) -> Result<Value, CompileError> {
        let location = cx.capture(Location::caller());
        self.check_arity(args.len(), location)?;
        for (param, arg) in self.params.iter().zip(args) {
            cx.check_operand(arg)?;
            if param.ty != arg.ty {
                return Err(CompileError::at(
                    TypeError::new(
                        "call",
                        [param.ty.clone(), arg.ty.clone()],
                        format!("argument `{}` of `{}` has the wrong type", param.name, self.name),
                    ),
                    location,
                ));
            }
        }
        let traced = self.trace(cx)?;
        let kind = NodeKind::Call {
            function: traced.id,
            args: args.iter().map(|a| a.id).collect(),
        };
        Ok(cx.push(traced.ret, location, kind))
    }
}
