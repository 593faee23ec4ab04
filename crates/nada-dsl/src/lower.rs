//! Flattens the node graph into MIR.

use std::collections::{BTreeMap, HashSet};

use buggy::{BugExt, bug};
use indexmap::{IndexMap, IndexSet};
use nada_mir::{self as mir, NadaType, Operation, OperationKind, SourceRef};
use tracing::{debug, trace};

use crate::{
    decl::{Output, Party},
    error::{CompileError, CompileErrorType, InputConflict},
    node::{Node, NodeId, NodeKind},
    registry::Registry,
    source::{SourceCache, SourceLocation},
};

/// The state of one lowering pass.
pub(crate) struct Lowering<'a> {
    registry: &'a Registry,
    cache: &'a SourceCache,
    embed_sources: bool,
    parties: IndexMap<String, mir::Party>,
    /// Input name to the node that declared it.
    inputs: IndexMap<String, (NodeId, mir::Input)>,
    literals: IndexMap<String, mir::Literal>,
    source_refs: IndexSet<SourceRef>,
    source_files: BTreeMap<String, String>,
    functions: IndexMap<NodeId, mir::Function>,
    /// Functions whose bodies are being lowered.
    in_progress: HashSet<NodeId>,
}

impl<'a> Lowering<'a> {
    pub fn new(registry: &'a Registry, cache: &'a SourceCache, embed_sources: bool) -> Self {
        Self {
            registry,
            cache,
            embed_sources,
            parties: IndexMap::new(),
            inputs: IndexMap::new(),
            literals: IndexMap::new(),
            source_refs: IndexSet::new(),
            source_files: BTreeMap::new(),
            functions: IndexMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Lowers everything reachable from `outputs`.
    pub fn lower(mut self, outputs: &[Output]) -> Result<mir::ProgramV0, CompileError> {
        let roots: Vec<NodeId> = outputs.iter().map(|o| o.value.id).collect();
        let operations = self.lower_scope(&roots, None)?;
        let registry = self.registry;

        let mut mir_outputs = Vec::with_capacity(outputs.len());
        for output in outputs {
            self.add_party(&output.party)?;
            let node = registry.node(output.value.id)?;
            mir_outputs.push(mir::Output {
                name: output.name.clone(),
                operation_id: node.id.to_operation_id(),
                party: output.party.name.clone(),
                ty: node.ty.clone(),
                source_ref_index: self.source_ref(output.location)?,
            });
        }

        debug!(
            operations = operations.len(),
            functions = self.functions.len(),
            inputs = self.inputs.len(),
            literals = self.literals.len(),
            "lowered program"
        );
        Ok(mir::ProgramV0 {
            functions: self.functions.into_values().collect(),
            parties: self.parties.into_values().collect(),
            inputs: self.inputs.into_values().map(|(_, input)| input).collect(),
            literals: self.literals.into_values().collect(),
            outputs: mir_outputs,
            operations,
            source_files: self.source_files,
            source_refs: self.source_refs.into_iter().collect(),
        })
    }

    /// Lowers the nodes reachable from `roots` in post-order, so every
    /// operation follows its operands. Shared nodes are lowered once.
    ///
    /// `function` is the definition whose body is being lowered, or `None`
    /// at the top level. Only that function's arguments may be reached.
    fn lower_scope(
        &mut self,
        roots: &[NodeId],
        function: Option<NodeId>,
    ) -> Result<Vec<Operation>, CompileError> {
        let mut operations = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<(NodeId, bool)> = roots.iter().rev().map(|&id| (id, false)).collect();
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                operations.push(self.lower_node(id)?);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            let node = self.registry.node(id)?;
            if let NodeKind::FunctionArgRef { function: owner, name } = &node.kind {
                if function != Some(*owner) {
                    return Err(CompileError::at(
                        CompileErrorType::InvalidHandle(format!(
                            "argument `{name}` of function {owner} is used outside its body"
                        )),
                        node.location,
                    ));
                }
            }
            stack.push((id, true));
            for child in node.kind.children().into_iter().rev() {
                // Operands are always created before their users.
                if child >= id {
                    bug!("operand does not precede its user");
                }
                if !visited.contains(&child) {
                    stack.push((child, false));
                }
            }
        }
        Ok(operations)
    }

    fn lower_node(&mut self, id: NodeId) -> Result<Operation, CompileError> {
        let registry = self.registry;
        let node = registry.node(id)?;
        trace!(%id, kind = node.kind.name(), "lowering node");
        let kind = match &node.kind {
            NodeKind::Binary { op, left, right } => OperationKind::Binary {
                op: *op,
                left: left.to_operation_id(),
                right: right.to_operation_id(),
            },
            NodeKind::Unary { op, operand } => OperationKind::Unary {
                op: *op,
                operand: operand.to_operation_id(),
            },
            NodeKind::Input { name, party, doc } => {
                self.add_input(node, name, party, doc)?;
                OperationKind::InputReference {
                    refers_to: name.clone(),
                }
            }
            NodeKind::Literal { value, key } => {
                self.literals
                    .entry(key.clone())
                    .or_insert_with(|| mir::Literal {
                        name: key.clone(),
                        value: *value,
                        ty: node.ty.clone(),
                    });
                OperationKind::LiteralReference {
                    refers_to: key.clone(),
                }
            }
            NodeKind::Cast { target } => OperationKind::Cast {
                target: target.to_operation_id(),
            },
            NodeKind::IfElse {
                cond,
                first,
                second,
            } => OperationKind::IfElse {
                cond: cond.to_operation_id(),
                first: first.to_operation_id(),
                second: second.to_operation_id(),
            },
            NodeKind::Random => OperationKind::Random,
            NodeKind::Map { inner, function } => OperationKind::Map {
                function_id: self.function(*function)?,
                inner: inner.to_operation_id(),
            },
            NodeKind::Reduce {
                inner,
                function,
                initial,
            } => OperationKind::Reduce {
                function_id: self.function(*function)?,
                inner: inner.to_operation_id(),
                initial: initial.to_operation_id(),
            },
            NodeKind::New { elements } => OperationKind::New {
                elements: elements.iter().map(|e| e.to_operation_id()).collect(),
            },
            NodeKind::Accessor { source, key } => OperationKind::Accessor {
                source: source.to_operation_id(),
                key: key.clone(),
            },
            NodeKind::FunctionArgRef { function, name } => OperationKind::FunctionArgRef {
                function_id: function.to_operation_id(),
                refers_to: name.clone(),
            },
            NodeKind::Call { function, args } => OperationKind::FunctionCall {
                function_id: self.function(*function)?,
                args: args.iter().map(|a| a.to_operation_id()).collect(),
            },
            NodeKind::FunctionDef { .. } => {
                bug!("function definition reached as an operand")
            }
        };
        Ok(Operation {
            id: id.to_operation_id(),
            ty: node.ty.clone(),
            source_ref_index: self.source_ref(node.location)?,
            kind,
        })
    }

    /// Lowers the function defined by `id` unless it already has been, and
    /// returns its MIR id.
    fn function(&mut self, id: NodeId) -> Result<mir::OperationId, CompileError> {
        if self.functions.contains_key(&id) {
            return Ok(id.to_operation_id());
        }
        if !self.in_progress.insert(id) {
            bug!("function body refers to its own definition");
        }

        let registry = self.registry;
        let node = registry.node(id)?;
        let NodeKind::FunctionDef { name, args, body } = &node.kind else {
            bug!("map, reduce or call must refer to a function definition");
        };
        let body = (*body).assume("function must be traced before it is lowered")?;
        let NadaType::Function { ret, .. } = &node.ty else {
            bug!("function definition must have a function type");
        };

        let source_ref_index = self.source_ref(node.location)?;
        let mut mir_args = Vec::with_capacity(args.len());
        for arg in args {
            let arg = registry.node(*arg)?;
            let NodeKind::FunctionArgRef { name, .. } = &arg.kind else {
                bug!("function argument must be an argument reference");
            };
            mir_args.push(mir::FunctionArg {
                name: name.clone(),
                ty: arg.ty.clone(),
                source_ref_index,
            });
        }

        let operations = self.lower_scope(&[body], Some(id))?;
        let function = mir::Function {
            id: id.to_operation_id(),
            name: name.clone(),
            args: mir_args,
            operations,
            return_operation_id: body.to_operation_id(),
            return_type: (**ret).clone(),
            source_ref_index,
        };
        debug!(
            %id,
            name = %function.name,
            operations = function.operations.len(),
            "lowered function"
        );

        self.in_progress.remove(&id);
        self.functions.insert(id, function);
        Ok(id.to_operation_id())
    }

    fn add_party(&mut self, party: &Party) -> Result<(), CompileError> {
        if !self.parties.contains_key(&party.name) {
            let source_ref_index = self.source_ref(party.location)?;
            self.parties.insert(
                party.name.clone(),
                mir::Party {
                    name: party.name.clone(),
                    source_ref_index,
                },
            );
        }
        Ok(())
    }

    /// Records an input, rejecting a different input with the same name.
    fn add_input(
        &mut self,
        node: &Node,
        name: &str,
        party: &Party,
        doc: &str,
    ) -> Result<(), CompileError> {
        if let Some((prev, input)) = self.inputs.get(name) {
            if *prev == node.id {
                return Ok(());
            }
            let conflict = if input.party != party.name {
                InputConflict::Party {
                    first: input.party.clone(),
                    second: party.name.clone(),
                }
            } else if input.ty != node.ty {
                InputConflict::Type {
                    first: input.ty.clone(),
                    second: node.ty.clone(),
                }
            } else {
                InputConflict::Redeclared
            };
            return Err(CompileError::at(
                CompileErrorType::DuplicateInput {
                    name: name.to_owned(),
                    conflict,
                },
                node.location,
            ));
        }

        self.add_party(party)?;
        let input = mir::Input {
            name: name.to_owned(),
            party: party.name.clone(),
            ty: node.ty.clone(),
            doc: doc.to_owned(),
            source_ref_index: self.source_ref(node.location)?,
        };
        self.inputs.insert(name.to_owned(), (node.id, input));
        Ok(())
    }

    /// Returns the index of `location` in the source reference table.
    fn source_ref(&mut self, location: SourceLocation) -> Result<u32, CompileError> {
        if self.embed_sources && !self.source_files.contains_key(location.file()) {
            if let Some(text) = self.cache.cached(location.path()) {
                self.source_files
                    .insert(location.file().to_owned(), text.as_ref().to_owned());
            }
        }
        let (index, _) = self.source_refs.insert_full(location.to_source_ref());
        Ok(u32::try_from(index).assume("source ref index must fit in u32")?)
    }
}
