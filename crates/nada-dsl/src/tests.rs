#![cfg(test)]

use std::{
    cell::{OnceCell, RefCell},
    rc::Rc,
};

use anyhow::Result;
use nada_mir::{AccessorKey, Operation, OperationId, OperationKind, ProgramV0};
use pretty_assertions::assert_eq;
use test_log::test;

use crate::{
    Array, BinaryOp, CompileErrorType, Compiler, Context, Function, InputConflict, LiteralValue,
    Mir, Mode, NTuple, NadaType, Object, Output, Param, Tuple, Value,
};

fn binaries(ops: &[Operation], op: BinaryOp) -> Vec<&Operation> {
    ops.iter()
        .filter(|o| matches!(o.kind, OperationKind::Binary { op: found, .. } if found == op))
        .collect()
}

fn op_id(v: &Value) -> OperationId {
    v.id().to_operation_id()
}

fn v0(mir: &Mir) -> &ProgramV0 {
    match mir.as_v0() {
        Ok(p) => p,
        Err(err) => panic!("{err}"),
    }
}

#[test]
fn test_scenario_single_addition() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::secret_integer(), &p)?;
    let b = cx.input("b", NadaType::secret_integer(), &p)?;
    let c = a.add(&mut cx, &b)?;

    let mir = cx.compile(&[Output::new(&cx, &c, "c", &p)])?;
    let program = v0(&mir);
    assert_eq!(program.parties.len(), 1);
    assert_eq!(program.inputs.len(), 2);
    assert_eq!(program.literals.len(), 0);
    assert_eq!(program.outputs.len(), 1);
    assert_eq!(program.operations.len(), 3);

    let additions = binaries(&program.operations, BinaryOp::Addition);
    assert_eq!(additions.len(), 1);
    assert_eq!(
        additions[0].kind,
        OperationKind::Binary {
            op: BinaryOp::Addition,
            left: op_id(&a),
            right: op_id(&b),
        }
    );
    assert_eq!(additions[0].ty, NadaType::secret_integer());
    assert_eq!(program.outputs[0].operation_id, op_id(&c));
    assert_eq!(program.outputs[0].party, "P");
    Ok(())
}

#[test]
fn test_scenario_sum_starts_from_zero() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let x = cx.input("x", NadaType::public_integer(), &p)?;
    let y = cx.input("y", NadaType::secret_integer(), &p)?;
    let total = cx.sum(&[x.clone(), y.clone()])?;
    assert_eq!(total.ty(), &NadaType::secret_integer());

    let mir = cx.compile(&[Output::new(&cx, &total, "total", &p)])?;
    let program = v0(&mir);
    assert_eq!(program.literals.len(), 1);
    assert_eq!(program.literals[0].value, LiteralValue::Integer(0));
    assert_eq!(program.literals[0].ty, NadaType::integer());

    let additions = binaries(&program.operations, BinaryOp::Addition);
    assert_eq!(additions.len(), 2);
    let OperationKind::Binary { left, right, .. } = &additions[0].kind else {
        panic!("expected a binary operation");
    };
    assert!(matches!(
        program.operation(*left).map(|o| &o.kind),
        Some(OperationKind::LiteralReference { .. })
    ));
    assert_eq!(*right, op_id(&x));
    assert_eq!(
        additions[1].kind,
        OperationKind::Binary {
            op: BinaryOp::Addition,
            left: additions[0].id,
            right: op_id(&y),
        }
    );
    Ok(())
}

#[test]
fn test_empty_sum_is_integer_zero() -> Result<()> {
    let mut cx = Context::new();
    let zero = cx.sum(&[])?;
    assert_eq!(zero.ty(), &NadaType::integer());
    assert_eq!(cx.len(), 1);
    Ok(())
}

#[test]
fn test_failed_sum_registers_nothing() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let x = cx.input("x", NadaType::secret_integer(), &p)?;
    let flag = cx.input("flag", NadaType::secret_boolean(), &p)?;
    let before = cx.len();
    assert!(cx.sum(&[x, flag]).is_err());
    assert_eq!(cx.len(), before);
    Ok(())
}

#[test]
fn test_scenario_map_with_captured_input() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let arr = cx.input("arr", NadaType::array(NadaType::secret_integer(), 3), &p)?;
    let arr = Array::try_from(arr)?;
    let k = cx.input("k", NadaType::secret_integer(), &p)?;

    let captured = k.clone();
    let add_k = Function::new(
        "add_k",
        [Param::new("a", NadaType::secret_integer())],
        move |cx, args| args[0].add(cx, &captured),
    );
    let mapped = arr.map(&mut cx, &add_k)?;
    assert_eq!(
        mapped.value().ty(),
        &NadaType::array(NadaType::secret_integer(), 3)
    );

    let mir = cx.compile(&[Output::new(&cx, mapped.value(), "out", &p)])?;
    let program = v0(&mir);
    assert_eq!(program.functions.len(), 1);
    let function = &program.functions[0];
    assert_eq!(function.name, "add_k");
    assert_eq!(function.args.len(), 1);
    assert_eq!(function.args[0].name, "a");

    let additions = binaries(&function.operations, BinaryOp::Addition);
    assert_eq!(additions.len(), 1);
    let OperationKind::Binary { left, right, .. } = &additions[0].kind else {
        panic!("expected a binary operation");
    };
    assert!(matches!(
        function.operation(*left).map(|o| &o.kind),
        Some(OperationKind::FunctionArgRef { refers_to, .. }) if refers_to == "a"
    ));
    assert_eq!(*right, op_id(&k));
    assert_eq!(function.return_operation_id, additions[0].id);

    let maps: Vec<_> = program
        .operations
        .iter()
        .filter(|o| matches!(o.kind, OperationKind::Map { .. }))
        .collect();
    assert_eq!(maps.len(), 1);
    assert_eq!(
        maps[0].kind,
        OperationKind::Map {
            function_id: function.id,
            inner: op_id(arr.value()),
        }
    );
    assert!(program.input("arr").is_some());
    assert!(program.input("k").is_some());
    Ok(())
}

#[test]
fn test_scenario_rational_digits_mismatch() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::rational(2, Mode::Secret), &p)?;
    let b = cx.input("b", NadaType::rational(3, Mode::Secret), &p)?;
    let before = cx.len();

    let err = a.add(&mut cx, &b).unwrap_err();
    let CompileErrorType::InvalidType(err) = err.err_type() else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(err.op(), "addition");
    assert_eq!(cx.len(), before);
    Ok(())
}

#[test]
fn test_error_points_at_call_site() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::secret_integer(), &p)?;
    let b = cx.input("b", NadaType::secret_boolean(), &p)?;
    let line = line!();
    let err = a.mul(&mut cx, &b).unwrap_err();
    let location = err.location().expect("type errors carry a location");
    assert_eq!(location.file(), "tests.rs");
    assert_eq!(location.line(), line + 1);
    assert!(err.to_string().contains("Type Error: `multiplication`"));
    Ok(())
}

#[test]
fn test_literals_share_a_node() -> Result<()> {
    let mut cx = Context::new();
    let a = cx.integer(42);
    let b = cx.literal(LiteralValue::Integer(42));
    let c = cx.unsigned_integer(42);
    assert_eq!(a.id(), b.id());
    assert_ne!(a.id(), c.id());

    let p = cx.party("P");
    let x = cx.input("x", NadaType::secret_integer(), &p)?;
    let y = x.add(&mut cx, &a)?.mul(&mut cx, &b)?;
    let mir = cx.compile(&[Output::new(&cx, &y, "y", &p)])?;
    assert_eq!(v0(&mir).literals.len(), 1);
    Ok(())
}

#[test]
fn test_duplicate_input_different_parties() -> Result<()> {
    let mut cx = Context::new();
    let alice = cx.party("Alice");
    let bob = cx.party("Bob");
    let a = cx.input("x", NadaType::secret_integer(), &alice)?;
    let b = cx.input("x", NadaType::secret_integer(), &bob)?;
    let sum = a.add(&mut cx, &b)?;

    let err = cx
        .compile(&[Output::new(&cx, &sum, "sum", &alice)])
        .unwrap_err();
    assert_eq!(
        err.err_type(),
        &CompileErrorType::DuplicateInput {
            name: "x".into(),
            conflict: InputConflict::Party {
                first: "Alice".into(),
                second: "Bob".into(),
            },
        }
    );
    Ok(())
}

#[test]
fn test_duplicate_input_conflicts() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("x", NadaType::secret_integer(), &p)?;
    let b = cx.input("x", NadaType::public_integer(), &p)?;
    let c = cx.input("x", NadaType::secret_integer(), &p)?;

    let ab = a.add(&mut cx, &b)?;
    let err = cx.compile(&[Output::new(&cx, &ab, "out", &p)]).unwrap_err();
    assert!(matches!(
        err.err_type(),
        CompileErrorType::DuplicateInput {
            conflict: InputConflict::Type { .. },
            ..
        }
    ));

    let ac = a.add(&mut cx, &c)?;
    let err = cx.compile(&[Output::new(&cx, &ac, "out", &p)]).unwrap_err();
    assert!(matches!(
        err.err_type(),
        CompileErrorType::DuplicateInput {
            conflict: InputConflict::Redeclared,
            ..
        }
    ));
    Ok(())
}

#[test]
fn test_same_input_referenced_twice() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::secret_integer(), &p)?;
    let double = a.add(&mut cx, &a)?;
    let square = a.mul(&mut cx, &a)?;
    let mir = cx.compile(&[
        Output::new(&cx, &double, "double", &p),
        Output::new(&cx, &square, "square", &p),
    ])?;
    let program = v0(&mir);
    assert_eq!(program.inputs.len(), 1);
    // The input reference is shared by both outputs.
    assert_eq!(program.operations.len(), 3);
    Ok(())
}

#[test]
fn test_operands_precede_users() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::secret_integer(), &p)?;
    let b = cx.input("b", NadaType::secret_integer(), &p)?;
    let ab = a.add(&mut cx, &b)?;
    let left = ab.mul(&mut cx, &a)?;
    let right = ab.sub(&mut cx, &b)?;
    let top = left.lt(&mut cx, &right)?;
    let mir = cx.compile(&[Output::new(&cx, &top, "top", &p)])?;

    let ops = &v0(&mir).operations;
    let position = |id: OperationId| ops.iter().position(|o| o.id == id);
    for (i, op) in ops.iter().enumerate() {
        for operand in op.kind.operands() {
            assert!(position(operand).is_some_and(|j| j < i));
        }
    }
    let mut ids: Vec<_> = ops.iter().map(|o| o.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 6);
    Ok(())
}

#[test]
fn test_function_lowered_once() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let ty = NadaType::array(NadaType::secret_integer(), 2);
    let xs = Array::try_from(cx.input("xs", ty.clone(), &p)?)?;
    let ys = Array::try_from(cx.input("ys", ty, &p)?)?;

    let double = Function::new(
        "double",
        [Param::new("v", NadaType::secret_integer())],
        |cx, args| args[0].add(cx, &args[0]),
    );
    let a = xs.map(&mut cx, &double)?;
    let b = ys.map(&mut cx, &double.clone())?;
    let defs = cx
        .nodes()
        .filter(|n| matches!(n.kind(), crate::NodeKind::FunctionDef { .. }))
        .count();
    assert_eq!(defs, 1);

    let mir = cx.compile(&[
        Output::new(&cx, a.value(), "a", &p),
        Output::new(&cx, b.value(), "b", &p),
    ])?;
    let program = v0(&mir);
    assert_eq!(program.functions.len(), 1);
    assert_eq!(program.functions[0].operations.len(), 2);
    let function_id = program.functions[0].id;
    let maps: Vec<OperationId> = program
        .operations
        .iter()
        .filter_map(|o| match &o.kind {
            OperationKind::Map { function_id, .. } => Some(*function_id),
            _ => None,
        })
        .collect();
    assert_eq!(maps, [function_id, function_id]);
    Ok(())
}

#[test]
fn test_reduce_and_call() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let xs = Array::try_from(cx.input(
        "xs",
        NadaType::array(NadaType::secret_integer(), 4),
        &p,
    )?)?;

    let add = Function::new(
        "add",
        [
            Param::new("acc", NadaType::secret_integer()),
            Param::new("x", NadaType::secret_integer()),
        ],
        |cx, args| args[0].add(cx, &args[1]),
    );
    let wrapper = Function::new(
        "twice",
        [Param::new("x", NadaType::secret_integer())],
        {
            let add = add.clone();
            move |cx: &mut Context, args: &[Value]| {
                add.call(cx, &[args[0].clone(), args[0].clone()])
            }
        },
    );

    let zero = cx.integer(0).cast(&mut cx, NadaType::secret_integer())?;
    let total = xs.reduce(&mut cx, &add, &zero)?;
    let twice = wrapper.call(&mut cx, &[total.clone()])?;
    assert_eq!(twice.ty(), &NadaType::secret_integer());

    let mir = cx.compile(&[Output::new(&cx, &twice, "twice", &p)])?;
    let program = v0(&mir);
    let names: Vec<_> = program.functions.iter().map(|f| f.name.as_str()).collect();
    // Callees come before callers.
    assert_eq!(names, ["add", "twice"]);
    assert!(
        program.functions[1]
            .operations
            .iter()
            .any(|o| matches!(o.kind, OperationKind::FunctionCall { .. }))
    );
    assert!(
        program
            .operations
            .iter()
            .any(|o| matches!(o.kind, OperationKind::Reduce { .. }))
    );
    Ok(())
}

#[test]
fn test_function_signature_checks() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let xs = Array::try_from(cx.input(
        "xs",
        NadaType::array(NadaType::secret_integer(), 2),
        &p,
    )?)?;
    let not = Function::new(
        "not",
        [Param::new("b", NadaType::secret_boolean())],
        |cx, args| args[0].not(cx),
    );
    let before = cx.len();

    let err = xs.map(&mut cx, &not).unwrap_err();
    assert!(matches!(err.err_type(), CompileErrorType::InvalidType(_)));

    let err = not.call(&mut cx, &[]).unwrap_err();
    assert_eq!(
        err.err_type(),
        &CompileErrorType::ArityMismatch {
            function: "not".into(),
            expected: 1,
            found: 0,
        }
    );
    assert_eq!(cx.len(), before);
    Ok(())
}

#[test]
fn test_failed_trace_rolls_back() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let xs = Array::try_from(cx.input(
        "xs",
        NadaType::array(NadaType::secret_integer(), 2),
        &p,
    )?)?;
    let broken = Function::new(
        "broken",
        [Param::new("x", NadaType::secret_integer())],
        |cx, args| {
            let one = cx.integer(1);
            let t = cx.boolean(true);
            args[0].add(cx, &one)?.add(cx, &t)
        },
    );
    let before = cx.len();
    assert!(xs.map(&mut cx, &broken).is_err());
    assert_eq!(cx.len(), before);

    // The literals created by the failed trace were dropped too.
    let one = cx.integer(1);
    assert_eq!(one.id().to_operation_id(), OperationId(u32::try_from(before)?));
    Ok(())
}

#[test]
fn test_recursive_function() -> Result<()> {
    let mut cx = Context::new();
    let cell: Rc<OnceCell<Function>> = Rc::new(OnceCell::new());
    let f = Function::new("loop", [Param::new("x", NadaType::integer())], {
        let cell = Rc::clone(&cell);
        move |cx: &mut Context, args: &[Value]| match cell.get() {
            Some(f) => f.call(cx, args),
            None => panic!("function not set"),
        }
    });
    assert!(cell.set(f.clone()).is_ok());

    let x = cx.integer(3);
    let before = cx.len();
    let err = f.call(&mut cx, &[x]).unwrap_err();
    assert_eq!(
        err.err_type(),
        &CompileErrorType::RecursiveFunction("loop".into())
    );
    assert_eq!(cx.len(), before);
    Ok(())
}

#[test]
fn test_collections() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::secret_integer(), &p)?;
    let b = cx.input("b", NadaType::public_boolean(), &p)?;

    let pair = Tuple::new(&mut cx, &a, &b)?;
    assert_eq!(pair.right(&mut cx)?.ty(), &NadaType::public_boolean());

    let triple = NTuple::new(&mut cx, &[a.clone(), b.clone(), a.clone()])?;
    assert_eq!(triple.get(&mut cx, 2)?.ty(), &NadaType::secret_integer());
    let err = triple.get(&mut cx, 3).unwrap_err();
    assert_eq!(
        err.err_type(),
        &CompileErrorType::IndexOutOfBounds { index: 3, len: 3 }
    );

    let obj = Object::new(&mut cx, &[("amount", &a), ("flag", &b)])?;
    let flag = obj.get(&mut cx, "flag")?;
    assert_eq!(flag.ty(), &NadaType::public_boolean());
    let err = obj.get(&mut cx, "missing").unwrap_err();
    assert_eq!(
        err.err_type(),
        &CompileErrorType::UnknownField("missing".into())
    );

    let arr = Array::new(&mut cx, &[a.clone(), a.clone()])?;
    assert_eq!(arr.len(), Some(2));
    assert!(arr.get(&mut cx, 2).is_err());
    assert!(Array::new(&mut cx, &[a.clone(), b.clone()]).is_err());
    assert_eq!(
        Array::new(&mut cx, &[]).unwrap_err().err_type(),
        &CompileErrorType::EmptyCollection("array")
    );
    assert!(Array::try_from(a.clone()).is_err());

    let mir = cx.compile(&[Output::new(&cx, &flag, "flag", &p)])?;
    let program = v0(&mir);
    let access = program
        .operation(op_id(&flag))
        .map(|o| o.kind.clone());
    assert_eq!(
        access,
        Some(OperationKind::Accessor {
            source: op_id(obj.value()),
            key: AccessorKey::Field("flag".into()),
        })
    );
    Ok(())
}

#[test]
fn test_zip_unzip_inner_product() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let xs = Array::try_from(cx.input(
        "xs",
        NadaType::array(NadaType::secret_integer(), 3),
        &p,
    )?)?;
    let ys = Array::try_from(cx.input(
        "ys",
        NadaType::array(NadaType::public_integer(), 3),
        &p,
    )?)?;

    let zipped = xs.zip(&mut cx, &ys)?;
    assert_eq!(
        zipped.value().ty(),
        &NadaType::array(
            NadaType::tuple(NadaType::secret_integer(), NadaType::public_integer()),
            3
        )
    );
    let unzipped = zipped.unzip(&mut cx)?;
    assert_eq!(
        unzipped.left(&mut cx)?.ty(),
        &NadaType::array(NadaType::secret_integer(), 3)
    );
    let dot = xs.inner_product(&mut cx, &ys)?;
    assert_eq!(dot.ty(), &NadaType::secret_integer());
    Ok(())
}

#[test]
fn test_output_list_checks() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::secret_integer(), &p)?;

    let err = cx.compile(&[]).unwrap_err();
    assert_eq!(err.err_type(), &CompileErrorType::NoOutputs);

    let err = cx
        .compile(&[
            Output::new(&cx, &a, "same", &p),
            Output::new(&cx, &a, "same", &p),
        ])
        .unwrap_err();
    assert_eq!(
        err.err_type(),
        &CompileErrorType::DuplicateOutput("same".into())
    );
    Ok(())
}

#[test]
fn test_input_must_be_variable() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let err = cx.input("c", NadaType::integer(), &p).unwrap_err();
    assert!(matches!(err.err_type(), CompileErrorType::InvalidInput(_)));
    let err = cx.input("", NadaType::secret_integer(), &p).unwrap_err();
    assert!(matches!(err.err_type(), CompileErrorType::InvalidInput(_)));
    assert!(cx.is_empty());

    let doc = cx.input_with_doc("d", NadaType::secret_integer(), &p, "the d")?;
    let mir = cx.compile(&[Output::new(&cx, &doc, "d", &p)])?;
    assert_eq!(v0(&mir).inputs[0].doc, "the d");
    Ok(())
}

#[test]
fn test_reset_restarts_ids() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let first = cx.input("a", NadaType::secret_integer(), &p)?;
    let _ = cx.integer(5);
    cx.reset();
    assert!(cx.is_empty());
    let again = cx.input("a", NadaType::secret_integer(), &p)?;
    assert_eq!(first.id(), again.id());
    assert_eq!(op_id(&again), OperationId(0));
    Ok(())
}

#[test]
fn test_source_refs_match_file_text() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::secret_integer(), &p)?;
    let b = cx.input("b", NadaType::secret_integer(), &p)?;
    let c = a.sub(&mut cx, &b)?; // subtraction site

    let outputs = [Output::new(&cx, &c, "c", &p)];
    let mir = cx.compile(&outputs)?;
    let program = v0(&mir);
    let op = program.operation(op_id(&c)).expect("subtraction is lowered");
    let source_ref = program
        .source_ref(op.source_ref_index)
        .expect("operation has a source ref");
    assert_eq!(source_ref.file, "tests.rs");
    // Embedded files are keyed by base name only.
    let files: Vec<&str> = program.source_files.keys().map(String::as_str).collect();
    assert_eq!(files, ["tests.rs"]);
    let text = source_ref.text(&program.source_files)?;
    assert!(text.contains("// subtraction site"));

    let mir = Compiler::new(&cx, &outputs).source_files(false).compile()?;
    assert!(v0(&mir).source_files.is_empty());
    Ok(())
}

#[test]
fn test_postcard_round_trip() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::secret_integer(), &p)?;
    let t = cx.rational(15, 1);
    let r = cx.input("r", NadaType::rational(1, Mode::Public), &p)?;
    let scaled = r.mul(&mut cx, &t)?;
    let ten = cx.integer(10);
    let cmp = a.gt(&mut cx, &ten)?;
    let revealed = cmp.reveal(&mut cx)?;

    let mir = cx.compile(&[
        Output::new(&cx, &revealed, "big", &p),
        Output::new(&cx, &scaled, "scaled", &p),
    ])?;
    let bytes = mir.to_bytes()?;
    assert_eq!(Mir::from_bytes(&bytes)?, mir);
    Ok(())
}

fn is_invalid_handle(err: &crate::CompileError) -> bool {
    matches!(err.err_type(), CompileErrorType::InvalidHandle(_))
}

#[test]
fn test_foreign_handle_is_rejected() {
    let mut a = Context::new();
    let mut b = Context::new();
    let x = a.integer(1);
    // Same id and type in the other context.
    let y = b.integer(5);
    assert_eq!(x.id(), y.id());
    assert_eq!(x.ty(), y.ty());

    let err = b.apply_binary(BinaryOp::Addition, &x, &x).unwrap_err();
    assert!(is_invalid_handle(&err), "{err}");
    assert!(!err.is_bug());
    assert!(y.add(&mut b, &y).is_ok());
}

#[test]
fn test_handle_from_before_reset_is_rejected() {
    let mut cx = Context::new();
    let old = cx.integer(1);
    cx.reset();
    let new = cx.integer(2);
    assert_eq!(old.id(), new.id());

    let err = old.add(&mut cx, &new).unwrap_err();
    assert!(is_invalid_handle(&err), "{err}");
}

#[test]
fn test_argument_of_failed_trace_is_rejected() {
    let mut cx = Context::new();
    let leaked: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));
    let f = Function::new("negate", [Param::new("x", NadaType::integer())], {
        let leaked = Rc::clone(&leaked);
        move |cx: &mut Context, args: &[Value]| {
            *leaked.borrow_mut() = Some(args[0].clone());
            args[0].not(cx)
        }
    });

    let one = cx.integer(1);
    assert!(f.call(&mut cx, &[one]).is_err());
    let Some(arg) = leaked.borrow_mut().take() else {
        panic!("body did not run");
    };
    // Refill the ids freed by the rollback with nodes of the same type.
    let _ = cx.integer(2);
    let reused = cx.integer(3);
    assert_eq!(reused.id(), arg.id());

    let err = arg.add(&mut cx, &reused).unwrap_err();
    assert!(is_invalid_handle(&err), "{err}");
}

#[test]
fn test_argument_outside_its_body_is_rejected() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let xs = Array::try_from(cx.input(
        "xs",
        NadaType::array(NadaType::secret_integer(), 3),
        &p,
    )?)?;
    let leaked: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));
    let identity = Function::new("identity", [Param::new("x", NadaType::secret_integer())], {
        let leaked = Rc::clone(&leaked);
        move |_: &mut Context, args: &[Value]| -> Result<Value, crate::CompileError> {
            *leaked.borrow_mut() = Some(args[0].clone());
            Ok(args[0].clone())
        }
    });
    let mapped = xs.map(&mut cx, &identity)?;
    let Some(arg) = leaked.borrow_mut().take() else {
        panic!("body did not run");
    };

    // Lowering the map on its own is fine.
    cx.compile(&[Output::new(&cx, mapped.value(), "mapped", &p)])?;

    let err = cx
        .compile(&[
            Output::new(&cx, mapped.value(), "mapped", &p),
            Output::new(&cx, &arg, "leaked", &p),
        ])
        .unwrap_err();
    assert!(is_invalid_handle(&err), "{err}");
    assert!(err.location().is_some());

    let doubled = arg.add(&mut cx, &arg)?;
    let err = cx
        .compile(&[Output::new(&cx, &doubled, "doubled", &p)])
        .unwrap_err();
    assert!(is_invalid_handle(&err), "{err}");
    Ok(())
}

mod properties {
    use nada_mir::BaseType;
    use proptest::prelude::*;

    use crate::{BinaryOp, Context, Mode, NadaType, types::binary_result};

    fn scalar() -> impl Strategy<Value = NadaType> {
        let base = prop_oneof![
            Just(BaseType::Integer),
            Just(BaseType::UnsignedInteger),
            Just(BaseType::Boolean),
            (0u32..3).prop_map(|digits| BaseType::Rational { digits }),
        ];
        let mode = prop_oneof![Just(Mode::Constant), Just(Mode::Public), Just(Mode::Secret)];
        (base, mode).prop_map(|(base, mode)| NadaType::scalar(base, mode))
    }

    fn commutative() -> impl Strategy<Value = BinaryOp> {
        let ops: Vec<BinaryOp> = BinaryOp::ALL
            .iter()
            .copied()
            .filter(BinaryOp::is_commutative)
            .collect();
        proptest::sample::select(ops)
    }

    proptest! {
        #[test]
        fn literal_dedup_is_idempotent(v in any::<i64>(), repeats in 1usize..5) {
            let mut cx = Context::new();
            let first = cx.integer(v);
            for _ in 0..repeats {
                prop_assert_eq!(cx.integer(v).id(), first.id());
            }
            prop_assert_eq!(cx.len(), 1);
        }

        #[test]
        fn ids_increase(choices in proptest::collection::vec(0u8..3, 1..32)) {
            let mut cx = Context::new();
            let p = cx.party("P");
            let first = cx.input("x0", NadaType::secret_integer(), &p).unwrap();
            let mut last = first.clone();
            for (i, choice) in choices.iter().enumerate() {
                let next = match *choice {
                    0 => cx.input(format!("x{}", i + 1), NadaType::secret_integer(), &p),
                    1 => last.add(&mut cx, &first),
                    _ => last.mul(&mut cx, &last),
                }
                .unwrap();
                prop_assert!(next.id() > last.id());
                last = next;
            }
        }

        #[test]
        fn commutative_ops_are_symmetric(op in commutative(), l in scalar(), r in scalar()) {
            prop_assert_eq!(
                binary_result(op, &l, &r).ok(),
                binary_result(op, &r, &l).ok()
            );
        }
    }
}
