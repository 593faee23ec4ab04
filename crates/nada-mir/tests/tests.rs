use std::collections::BTreeMap;

use nada_mir::{
    BinaryOp, Input, Literal, LiteralValue, Mir, NadaType, Operation, OperationId,
    OperationKind, Output, Party, ProgramV0, SourceRef, Version,
};
use pretty_assertions::assert_eq;

fn addition_program() -> ProgramV0 {
    let sref = SourceRef {
        file: "main.rs".into(),
        lineno: 1,
        offset: 0,
        length: 5,
    };
    ProgramV0 {
        functions: vec![],
        parties: vec![Party {
            name: "Alice".into(),
            source_ref_index: 0,
        }],
        inputs: vec![Input {
            name: "a".into(),
            party: "Alice".into(),
            ty: NadaType::secret_integer(),
            doc: String::new(),
            source_ref_index: 0,
        }],
        literals: vec![Literal {
            name: "0000000000000001".into(),
            value: LiteralValue::Integer(7),
            ty: NadaType::integer(),
        }],
        outputs: vec![Output {
            name: "out".into(),
            operation_id: OperationId(2),
            party: "Alice".into(),
            ty: NadaType::secret_integer(),
            source_ref_index: 0,
        }],
        operations: vec![
            Operation {
                id: OperationId(0),
                ty: NadaType::secret_integer(),
                source_ref_index: 0,
                kind: OperationKind::InputReference {
                    refers_to: "a".into(),
                },
            },
            Operation {
                id: OperationId(1),
                ty: NadaType::integer(),
                source_ref_index: 0,
                kind: OperationKind::LiteralReference {
                    refers_to: "0000000000000001".into(),
                },
            },
            Operation {
                id: OperationId(2),
                ty: NadaType::secret_integer(),
                source_ref_index: 0,
                kind: OperationKind::Binary {
                    op: BinaryOp::Addition,
                    left: OperationId(0),
                    right: OperationId(1),
                },
            },
        ],
        source_files: BTreeMap::from([("main.rs".to_string(), "a + 7".to_string())]),
        source_refs: vec![sref],
    }
}

#[test]
fn test_postcard_round_trip() {
    let mir = Mir::v0(addition_program());
    let bytes = mir.to_bytes().expect("encodes");
    let decoded = Mir::from_bytes(&bytes).expect("decodes");
    assert_eq!(decoded, mir);
    assert_eq!(decoded.version(), Version::V0);
}

#[test]
fn test_decode_garbage() {
    assert!(Mir::from_bytes(&[0xff, 0xff, 0xff]).is_err());
}

#[test]
fn test_display() {
    let mir = Mir::v0(addition_program());
    let expected = "\
party Alice
input a: SecretInteger from Alice
literal 0000000000000001 = 7: Integer
%0 = input a : SecretInteger
%1 = literal 0000000000000001 : Integer
%2 = addition %0, %1 : SecretInteger
output out = %2 to Alice: SecretInteger
";
    assert_eq!(mir.to_string(), expected);
}

#[test]
fn test_lookups() {
    let program = addition_program();
    assert!(program.input("a").is_some());
    assert!(program.output("out").is_some());
    assert_eq!(
        program.operation(OperationId(2)).map(|op| op.kind.operands()),
        Some(vec![OperationId(0), OperationId(1)])
    );
    let sref = program.source_ref(0).expect("source ref");
    assert_eq!(sref.text(&program.source_files).ok(), Some("a + 7"));
}
