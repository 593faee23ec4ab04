//! Text rendering of a program.

use core::fmt::{self, Display};

use crate::{AccessorKey, Function, Mir, MirData, Operation, OperationId, OperationKind, ProgramV0};

impl Display for Mir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            MirData::V0(program) => program.fmt(f),
        }
    }
}

impl Display for ProgramV0 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for party in &self.parties {
            writeln!(f, "party {}", party.name)?;
        }
        for input in &self.inputs {
            writeln!(f, "input {}: {} from {}", input.name, input.ty, input.party)?;
        }
        for literal in &self.literals {
            writeln!(f, "literal {} = {}: {}", literal.name, literal.value, literal.ty)?;
        }
        for function in &self.functions {
            function.fmt(f)?;
        }
        for op in &self.operations {
            writeln!(f, "{op}")?;
        }
        for output in &self.outputs {
            writeln!(
                f,
                "output {} = {} to {}: {}",
                output.name, output.operation_id, output.party, output.ty
            )?;
        }
        Ok(())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {} {}(", self.name, self.id)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", arg.name, arg.ty)?;
        }
        writeln!(f, ") -> {} {{", self.return_type)?;
        for op in &self.operations {
            writeln!(f, "  {op}")?;
        }
        writeln!(f, "  return {}", self.return_operation_id)?;
        writeln!(f, "}}")
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ", self.id)?;
        match &self.kind {
            OperationKind::Binary { op, left, right } => write!(f, "{op} {left}, {right}")?,
            OperationKind::Unary { op, operand } => write!(f, "{op} {operand}")?,
            OperationKind::InputReference { refers_to } => write!(f, "input {refers_to}")?,
            OperationKind::LiteralReference { refers_to } => write!(f, "literal {refers_to}")?,
            OperationKind::Cast { target } => write!(f, "cast {target}")?,
            OperationKind::IfElse {
                cond,
                first,
                second,
            } => write!(f, "if-else {cond}, {first}, {second}")?,
            OperationKind::Random => f.write_str("random")?,
            OperationKind::Map { function_id, inner } => write!(f, "map {function_id}, {inner}")?,
            OperationKind::Reduce {
                function_id,
                inner,
                initial,
            } => write!(f, "reduce {function_id}, {inner}, {initial}")?,
            OperationKind::New { elements } => {
                f.write_str("new [")?;
                write_ids(f, elements)?;
                f.write_str("]")?;
            }
            OperationKind::Accessor { source, key } => match key {
                AccessorKey::Index(idx) => write!(f, "access {source}[{idx}]")?,
                AccessorKey::Field(name) => write!(f, "access {source}.{name}")?,
            },
            OperationKind::FunctionArgRef { refers_to, .. } => write!(f, "arg {refers_to}")?,
            OperationKind::FunctionCall { function_id, args } => {
                write!(f, "call {function_id}(")?;
                write_ids(f, args)?;
                f.write_str(")")?;
            }
        }
        write!(f, " : {}", self.ty)
    }
}

fn write_ids(f: &mut fmt::Formatter<'_>, ids: &[OperationId]) -> fmt::Result {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{id}")?;
    }
    Ok(())
}
