//! Graph nodes.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use nada_mir::{AccessorKey, BinaryOp, LiteralValue, NadaType, OperationId, UnaryOp};

use crate::{arena::new_key_type, decl::Party, source::SourceLocation};

new_key_type! {
    /// Identifies a node within one compilation.
    ///
    /// Ids are handed out in increasing order. Ids freed by a failed
    /// function trace or a reset are handed out again.
    pub struct NodeId;
}

impl NodeId {
    /// The MIR identifier of this node.
    pub fn to_operation_id(self) -> OperationId {
        OperationId(self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Process-unique identity of a registered node.
///
/// Unlike a [`NodeId`], a stamp is never handed out twice, so a handle
/// whose node was rolled back, reset or registered in another context no
/// longer matches the node at its id.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Stamp(u64);

impl Stamp {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A typed unit of computation.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) stamp: Stamp,
    pub(crate) ty: NadaType,
    pub(crate) location: SourceLocation,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// The node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's result type.
    pub fn ty(&self) -> &NadaType {
        &self.ty
    }

    /// Where the node was created.
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// What the node does.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
}

/// The operation a [`Node`] performs.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Input {
        name: String,
        party: Party,
        doc: String,
    },
    Literal {
        value: LiteralValue,
        /// The dedup key, also used as the literal's MIR name.
        key: String,
    },
    Cast {
        target: NodeId,
    },
    IfElse {
        cond: NodeId,
        first: NodeId,
        second: NodeId,
    },
    Random,
    Map {
        inner: NodeId,
        function: NodeId,
    },
    Reduce {
        inner: NodeId,
        function: NodeId,
        initial: NodeId,
    },
    /// Builds an array, tuple, n-tuple or object; which one is given by
    /// the node's type.
    New {
        elements: Vec<NodeId>,
    },
    Accessor {
        source: NodeId,
        key: AccessorKey,
    },
    FunctionArgRef {
        function: NodeId,
        name: String,
    },
    /// `body` is `None` while the function is being traced.
    FunctionDef {
        name: String,
        args: Vec<NodeId>,
        body: Option<NodeId>,
    },
    Call {
        function: NodeId,
        args: Vec<NodeId>,
    },
}

impl NodeKind {
    /// The ids this node reads as operands, in order.
    ///
    /// Function definitions are not operands: `Map`, `Reduce` and `Call`
    /// refer to them separately, and a definition's own arguments and body
    /// are lowered with the function.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Binary { left, right, .. } => vec![*left, *right],
            Self::Unary { operand, .. } => vec![*operand],
            Self::Cast { target } => vec![*target],
            Self::IfElse {
                cond,
                first,
                second,
            } => vec![*cond, *first, *second],
            Self::Map { inner, .. } => vec![*inner],
            Self::Reduce { inner, initial, .. } => vec![*inner, *initial],
            Self::New { elements } => elements.clone(),
            Self::Accessor { source, .. } => vec![*source],
            Self::Call { args, .. } => args.clone(),
            Self::Input { .. }
            | Self::Literal { .. }
            | Self::Random
            | Self::FunctionArgRef { .. }
            | Self::FunctionDef { .. } => Vec::new(),
        }
    }

    /// A short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binary { op, .. } => op.as_str(),
            Self::Unary { op, .. } => op.as_str(),
            Self::Input { .. } => "input",
            Self::Literal { .. } => "literal",
            Self::Cast { .. } => "cast",
            Self::IfElse { .. } => "if-else",
            Self::Random => "random",
            Self::Map { .. } => "map",
            Self::Reduce { .. } => "reduce",
            Self::New { .. } => "new",
            Self::Accessor { .. } => "accessor",
            Self::FunctionArgRef { .. } => "arg",
            Self::FunctionDef { .. } => "function",
            Self::Call { .. } => "call",
        }
    }
}
