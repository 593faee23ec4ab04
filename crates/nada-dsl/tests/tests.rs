use std::{sync::Arc, thread};

use anyhow::Result;
use nada_dsl::{
    Array, CompileErrorType, Context, Function, Mir, NadaType, Output, Param, SourceCache,
};
use pretty_assertions::assert_eq;
use test_log::test;

/// Builds a program comparing two parties' wealth and revealing the
/// larger one's index.
fn millionaires(cx: &mut Context) -> Result<Vec<Output>> {
    let alice = cx.party("Alice");
    let bob = cx.party("Bob");
    let judge = cx.party("Judge");
    let a = cx.input("alice_wealth", NadaType::secret_unsigned_integer(), &alice)?;
    let b = cx.input("bob_wealth", NadaType::secret_unsigned_integer(), &bob)?;

    let richer = a.gt(cx, &b)?;
    let zero = cx
        .unsigned_integer(0)
        .cast(cx, NadaType::secret_unsigned_integer())?;
    let one = cx
        .unsigned_integer(1)
        .cast(cx, NadaType::secret_unsigned_integer())?;
    let winner = richer.if_else(cx, &zero, &one)?.reveal(cx)?;
    Ok(vec![Output::new(cx, &winner, "winner", &judge)])
}

#[test]
fn test_millionaires_text() -> Result<()> {
    let mut cx = Context::with_source_cache(Arc::new(SourceCache::new()));
    let alice = cx.party("Alice");
    let a = cx.input("a", NadaType::secret_integer(), &alice)?;
    let b = cx.input("b", NadaType::public_integer(), &alice)?;
    let c = a.sub(&mut cx, &b)?.reveal(&mut cx)?;
    let mir = cx.compile(&[Output::new(&cx, &c, "c", &alice)])?;

    let expected = "\
party Alice
input a: SecretInteger from Alice
input b: PublicInteger from Alice
%0 = input a : SecretInteger
%1 = input b : PublicInteger
%2 = subtraction %0, %1 : SecretInteger
%3 = reveal %2 : PublicInteger
output c = %3 to Alice: PublicInteger
";
    assert_eq!(mir.to_string(), expected);

    let mut cx = Context::new();
    let outputs = millionaires(&mut cx)?;
    let mir = cx.compile(&outputs)?;
    let program = mir.as_v0()?;
    let parties: Vec<_> = program.parties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(parties, ["Alice", "Bob", "Judge"]);
    assert_eq!(program.literals.len(), 2);
    assert_eq!(program.outputs[0].ty, NadaType::public_unsigned_integer());
    Ok(())
}

#[test]
fn test_recompiling_after_reset_is_stable() -> Result<()> {
    let mut cx = Context::new();
    let outputs = millionaires(&mut cx)?;
    let first = cx.compile(&outputs)?;

    cx.reset();
    let outputs = millionaires(&mut cx)?;
    let second = cx.compile(&outputs)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_independent_contexts_across_threads() -> Result<()> {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| -> Result<Mir> {
                let mut cx = Context::new();
                let outputs = millionaires(&mut cx)?;
                Ok(cx.compile(&outputs)?)
            })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        match handle.join() {
            Ok(result) => results.push(result?),
            Err(_) => panic!("compilation thread panicked"),
        }
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    Ok(())
}

#[test]
fn test_map_reduce_pipeline() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let votes = Array::try_from(cx.input(
        "votes",
        NadaType::array(NadaType::secret_unsigned_integer(), 5),
        &p,
    )?)?;
    let double = Function::new(
        "double",
        [Param::new("v", NadaType::secret_unsigned_integer())],
        |cx, args| args[0].add(cx, &args[0]),
    );
    let add = Function::new(
        "add",
        [
            Param::new("acc", NadaType::secret_unsigned_integer()),
            Param::new("v", NadaType::secret_unsigned_integer()),
        ],
        |cx, args| args[0].add(cx, &args[1]),
    );
    let doubled = votes.map(&mut cx, &double)?;
    let zero = cx
        .unsigned_integer(0)
        .cast(&mut cx, NadaType::secret_unsigned_integer())?;
    let total = doubled.reduce(&mut cx, &add, &zero)?;
    let mir = cx.compile(&[Output::new(&cx, &total, "total", &p)])?;

    let text = mir.to_string();
    assert!(text.contains("function double"));
    assert!(text.contains("function add"));
    let program = mir.as_v0()?;
    assert_eq!(program.functions.len(), 2);
    let bytes = mir.to_bytes()?;
    assert_eq!(Mir::from_bytes(&bytes)?, mir);
    Ok(())
}

#[test]
fn test_errors_name_the_operation() -> Result<()> {
    let mut cx = Context::new();
    let p = cx.party("P");
    let a = cx.input("a", NadaType::secret_integer(), &p)?;
    let b = cx.input("b", NadaType::secret_integer(), &p)?;

    let err = a.pow(&mut cx, &b).unwrap_err();
    assert!(matches!(err.err_type(), CompileErrorType::InvalidType(_)));
    let msg = err.to_string();
    assert!(msg.contains("`power`"), "{msg}");
    assert!(msg.contains("tests.rs"), "{msg}");

    let shift = cx.unsigned_integer(2);
    assert!(a.shl(&mut cx, &shift).is_ok());
    assert!(a.trunc_pr(&mut cx, &shift).is_ok());
    let public = cx.input("c", NadaType::public_integer(), &p)?;
    assert!(public.trunc_pr(&mut cx, &shift).is_err());
    Ok(())
}
