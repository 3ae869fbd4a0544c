use super::api::{parse_to_ast, PainlessParser, Rule};
use super::ast::*;
use crate::runner::ds::error::CompileErrorKind;

use pest::consumes_to;
use pest::fails_with;
use pest::parses_to;

#[test]
fn test_integer_literal() {
    parses_to! {
        parser: PainlessParser,
        input: "10",
        rule: Rule::literal,
        tokens: [
            literal(0, 2, [
                integer(0, 2)
            ])
        ]
    };
}

#[test]
fn test_float_literal_with_exponent() {
    parses_to! {
        parser: PainlessParser,
        input: "1.5e3f",
        rule: Rule::literal,
        tokens: [
            literal(0, 6, [
                decimal(0, 6)
            ])
        ]
    };
}

#[test]
fn test_hex_literal() {
    parses_to! {
        parser: PainlessParser,
        input: "0x1F",
        rule: Rule::literal,
        tokens: [
            literal(0, 4, [
                hex(0, 4)
            ])
        ]
    };
}

#[test]
fn test_single_quoted_string_with_escape() {
    parses_to! {
        parser: PainlessParser,
        input: "'it\\'s'",
        rule: Rule::literal,
        tokens: [
            literal(0, 7, [
                string(0, 7)
            ])
        ]
    };
}

#[test]
fn test_array_decltype() {
    parses_to! {
        parser: PainlessParser,
        input: "int[][]",
        rule: Rule::decltype,
        tokens: [
            decltype(0, 7, [
                base_type(0, 3, [
                    primitive_type(0, 3)
                ]),
                dims(3, 7)
            ])
        ]
    };
}

#[test]
fn test_reference_decltype() {
    parses_to! {
        parser: PainlessParser,
        input: "Map",
        rule: Rule::decltype,
        tokens: [
            decltype(0, 3, [
                base_type(0, 3, [
                    ident(0, 3)
                ])
            ])
        ]
    };
}

#[test]
fn test_unsigned_shift_operator() {
    parses_to! {
        parser: PainlessParser,
        input: ">>>",
        rule: Rule::shift_op,
        tokens: [
            shift_op(0, 3)
        ]
    };
}

#[test]
fn test_identifier_starting_with_keyword() {
    parses_to! {
        parser: PainlessParser,
        input: "format",
        rule: Rule::ident,
        tokens: [
            ident(0, 6)
        ]
    };
}

#[test]
fn test_keyword_is_not_identifier() {
    fails_with! {
        parser: PainlessParser,
        input: "for",
        rule: Rule::ident,
        positives: vec![Rule::ident],
        negatives: vec![],
        pos: 0
    };
}

// ==== Tree building ====

fn parse(source: &str) -> SourceData {
    match parse_to_ast(source, false) {
        Ok(data) => data,
        Err(e) => panic!("failed to parse {:?}: {}", source, e),
    }
}

fn single_expression(source: &str) -> ExpressionType {
    let mut data = parse(source);
    assert_eq!(data.statements.len(), 1);
    match data.statements.remove(0) {
        StatementType::Expression { expression, .. } => expression,
        StatementType::Return {
            argument: Some(expression),
            ..
        } => expression,
        other => panic!("not an expression statement: {:?}", other),
    }
}

#[test]
fn test_declaration_then_return() {
    let data = parse("int x = 1; return x + 2");
    assert_eq!(data.statements.len(), 2);
    match &data.statements[0] {
        StatementType::Declaration(d) => {
            assert_eq!(d.typ.canonical(), "int");
            assert_eq!(d.declarators[0].name, "x");
        }
        other => panic!("{:?}", other),
    }
    assert!(matches!(
        &data.statements[1],
        StatementType::Return {
            argument: Some(ExpressionType::Binary {
                operator: BinaryOperator::Add,
                ..
            }),
            ..
        }
    ));
}

#[test]
fn test_multiplication_binds_tighter() {
    match single_expression("1 + 2 * 3") {
        ExpressionType::Binary {
            operator: BinaryOperator::Add,
            right,
            ..
        } => assert!(matches!(
            *right,
            ExpressionType::Binary {
                operator: BinaryOperator::Multiply,
                ..
            }
        )),
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_negative_int_minimum() {
    match single_expression("-2147483648") {
        ExpressionType::Literal(data) => assert_eq!(data.value, LiteralType::IntLiteral(i32::MIN)),
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_positive_int_overflow_is_rejected() {
    let err = parse_to_ast("2147483648", false).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Syntax);
    assert_eq!(err.message, "Invalid int constant [2147483648].");
}

#[test]
fn test_hex_int_wraps() {
    match single_expression("0xFFFFFFFF") {
        ExpressionType::Literal(data) => assert_eq!(data.value, LiteralType::IntLiteral(-1)),
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_long_and_float_suffixes() {
    match single_expression("5L") {
        ExpressionType::Literal(data) => assert_eq!(data.value, LiteralType::LongLiteral(5)),
        other => panic!("{:?}", other),
    }
    match single_expression("2.5f") {
        ExpressionType::Literal(data) => assert_eq!(data.value, LiteralType::FloatLiteral(2.5)),
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_parenthesised_variable_is_not_a_cast() {
    match single_expression("(list)[0]") {
        ExpressionType::Chain { head, links, .. } => {
            assert!(matches!(*head, ExpressionType::Variable { ref name, .. } if name == "list"));
            assert!(matches!(links[0], LinkType::Brace { .. }));
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_casts() {
    assert!(matches!(
        single_expression("(int) x"),
        ExpressionType::Cast { ref typ, .. } if typ.name == "int"
    ));
    assert!(matches!(
        single_expression("(Map) x"),
        ExpressionType::Cast { ref typ, .. } if typ.name == "Map"
    ));
}

#[test]
fn test_untyped_lambda() {
    match single_expression("x -> x + 1") {
        ExpressionType::Lambda(data) => {
            assert_eq!(data.parameters.len(), 1);
            assert!(data.parameters[0].typ.is_none());
            assert!(matches!(data.body, LambdaBody::Expression(_)));
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_function_references() {
    assert!(matches!(
        single_expression("Integer::parseInt"),
        ExpressionType::FunctionReference { owner: Some(_), ref method, .. } if method == "parseInt"
    ));
    assert!(matches!(
        single_expression("this::helper"),
        ExpressionType::FunctionReference { owner: None, .. }
    ));
    assert!(matches!(
        single_expression("ArrayList::new"),
        ExpressionType::FunctionReference { ref method, .. } if method == "new"
    ));
}

#[test]
fn test_collection_initializers() {
    assert!(matches!(
        single_expression("[:]"),
        ExpressionType::MapInitializer { ref entries, .. } if entries.is_empty()
    ));
    assert!(matches!(
        single_expression("[1, 2]"),
        ExpressionType::ListInitializer { ref values, .. } if values.len() == 2
    ));
    assert!(matches!(
        single_expression("['a': 1]"),
        ExpressionType::MapInitializer { ref entries, .. } if entries.len() == 1
    ));
}

#[test]
fn test_sized_array_keeps_extra_dimensions() {
    match single_expression("new int[2][]") {
        ExpressionType::NewArray { typ, sizes, .. } => {
            assert_eq!(typ.dimensions, 2);
            assert_eq!(sizes.len(), 1);
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_functions_precede_statements() {
    let data = parse("int twice(int a) { return a * 2; } twice(3)");
    assert_eq!(data.functions.len(), 1);
    assert_eq!(data.functions[0].name, "twice");
    assert_eq!(data.statements.len(), 1);
}

#[test]
fn test_reserved_variable_usage() {
    let data = parse("_score * 2");
    assert!(data.uses_score);
    assert!(!data.uses_ctx);
    let data = parse("ctx.x = 1");
    assert!(data.uses_ctx);
}

#[test]
fn test_loops() {
    let data = parse("for (int i = 0; i < 3; ++i) {} for (x in list) {} for (def y : list) {} while (true) ;");
    assert!(matches!(data.statements[0], StatementType::For { init: Some(_), .. }));
    assert!(matches!(data.statements[1], StatementType::ForEach { typ: None, .. }));
    assert!(matches!(data.statements[2], StatementType::ForEach { typ: Some(_), .. }));
    assert!(matches!(data.statements[3], StatementType::While { ref body, .. } if body.is_empty()));
}

#[test]
fn test_dangling_else_is_ambiguous_when_picky() {
    let source = "if (a) if (b) return 1; else return 2;";
    assert!(parse_to_ast(source, false).is_ok());
    let err = parse_to_ast(source, true).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Ambiguity);
    assert!(parse_to_ast("if (a) { if (b) return 1; else return 2; }", true).is_ok());
}

#[test]
fn test_syntax_error_location() {
    let err = parse_to_ast("int x = 1;\nint y = ;", false).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Syntax);
    assert_eq!(err.location.line, 2);
    assert_eq!(err.location.source_line, "int y = ;");
}

#[test]
fn test_mixed_collection_entries_are_rejected() {
    let err = parse_to_ast("[1, 'a': 2]", false).unwrap_err();
    assert_eq!(err.kind, CompileErrorKind::Syntax);
    assert_eq!(err.message, "A map initializer needs a value for every key.");
}

/// Runs `f` on a thread with room for deep grammar recursion.
fn with_large_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn test_deeply_nested_list_parses_quickly() {
    let depth = 24;
    let levels = with_large_stack(move || {
        let source = format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
        let start = std::time::Instant::now();
        let mut current = single_expression(&source);
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
        let mut levels = 0;
        while let ExpressionType::ListInitializer { mut values, .. } = current {
            levels += 1;
            current = values.remove(0);
        }
        levels
    });
    assert_eq!(levels, depth);
}

#[test]
fn test_nested_map_of_lists() {
    match single_expression("['a': [1, 2], 'b': [:]]") {
        ExpressionType::MapInitializer { entries, .. } => {
            assert_eq!(entries.len(), 2);
            assert!(matches!(entries[0].1, ExpressionType::ListInitializer { ref values, .. } if values.len() == 2));
            assert!(matches!(entries[1].1, ExpressionType::MapInitializer { ref entries, .. } if entries.is_empty()));
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_logical_operators_bind_loosest() {
    match single_expression("a || b && c == d") {
        ExpressionType::Logical {
            operator: LogicalOperator::Or,
            right,
            ..
        } => match *right {
            ExpressionType::Logical {
                operator: LogicalOperator::And,
                right,
                ..
            } => assert!(matches!(
                *right,
                ExpressionType::Comparison {
                    operator: ComparisonOperator::Equal,
                    ..
                }
            )),
            other => panic!("{:?}", other),
        },
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_subtraction_is_left_associative() {
    match single_expression("10 - 4 - 3") {
        ExpressionType::Binary {
            operator: BinaryOperator::Subtract,
            left,
            right,
            ..
        } => {
            assert!(matches!(
                *left,
                ExpressionType::Binary {
                    operator: BinaryOperator::Subtract,
                    ..
                }
            ));
            assert!(matches!(
                *right,
                ExpressionType::Literal(LiteralData {
                    value: LiteralType::IntLiteral(3),
                    ..
                })
            ));
        }
        other => panic!("{:?}", other),
    }
}

#[test]
fn test_instanceof_binds_looser_than_addition() {
    match single_expression("a + b instanceof String") {
        ExpressionType::InstanceOf { argument, typ, .. } => {
            assert_eq!(typ.name, "String");
            assert!(matches!(
                *argument,
                ExpressionType::Binary {
                    operator: BinaryOperator::Add,
                    ..
                }
            ));
        }
        other => panic!("{:?}", other),
    }
    assert!(matches!(
        single_expression("x instanceof List && y"),
        ExpressionType::Logical {
            operator: LogicalOperator::And,
            ..
        }
    ));
}

#[test]
fn test_signed_operand_after_parentheses_is_arithmetic() {
    assert!(matches!(
        single_expression("(X) - 1"),
        ExpressionType::Binary {
            operator: BinaryOperator::Subtract,
            ..
        }
    ));
    assert!(matches!(
        single_expression("(X) !y"),
        ExpressionType::Cast { ref typ, .. } if typ.name == "X"
    ));
}
