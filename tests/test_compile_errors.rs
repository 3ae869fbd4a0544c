//! Tests for scripts rejected at compile time: syntax, ambiguity and
//! semantic errors, with their messages and positions.

extern crate painless;

use painless::runner::compiler::{compile, CompilerSettings};
use painless::runner::ds::error::{CompileError, CompileErrorKind};

fn compile_error_with(code: &str, settings: &CompilerSettings) -> CompileError {
    match compile(code, settings) {
        Ok(_) => panic!("expected a compile error for: {}", code),
        Err(e) => e,
    }
}

fn compile_error(code: &str) -> CompileError {
    compile_error_with(code, &CompilerSettings::default())
}

/// Asserts a semantic error with exactly `message`.
fn assert_semantic(code: &str, message: &str) {
    let err = compile_error(code);
    assert_eq!(err.kind, CompileErrorKind::Semantic, "for: {}", code);
    assert_eq!(err.message, message, "for: {}", code);
}

// ============================================================================
// Syntax and ambiguity
// ============================================================================

#[test]
fn test_syntax_error() {
    let err = compile_error("int x = ;");
    assert_eq!(err.kind, CompileErrorKind::Syntax);
    assert_eq!(err.location.line, 1);
}

#[test]
fn test_unbalanced_braces() {
    assert_eq!(compile_error("if (true) { int x = 1;").kind, CompileErrorKind::Syntax);
}

#[test]
fn test_dangling_else_is_ambiguous_when_picky() {
    let code = "int x = 0; if (x == 0) if (x == 1) x = 1; else x = 2; x";
    let settings = CompilerSettings {
        picky: true,
        ..CompilerSettings::default()
    };
    let err = compile_error_with(code, &settings);
    assert_eq!(err.kind, CompileErrorKind::Ambiguity);
    assert!(compile(code, &CompilerSettings::default()).is_ok());
}

// ============================================================================
// Names and types
// ============================================================================

#[test]
fn test_undefined_variable() {
    assert_semantic("y + 1", "Variable [y] is not defined.");
}

#[test]
fn test_unknown_type() {
    assert_semantic("Foo x = null;", "Unknown type [Foo].");
}

#[test]
fn test_redefined_variable() {
    assert_semantic("int x = 1; int x = 2;", "Variable [x] is already defined.");
}

#[test]
fn test_reserved_variable() {
    assert_semantic("int _score = 1;", "Variable [_score] is reserved.");
}

#[test]
fn test_read_only_binding() {
    assert_semantic("params = null;", "Variable [params] is read-only.");
}

#[test]
fn test_void_variable() {
    assert_semantic("void v;", "Cannot declare a variable of type [void].");
}

#[test]
fn test_type_is_not_a_value() {
    assert_semantic("def x = Math; x", "Cannot use type [Math] as a value.");
}

// ============================================================================
// Casts
// ============================================================================

#[test]
fn test_string_to_int() {
    assert_semantic("int x = 'hello';", "Cannot cast from [String] to [int].");
}

#[test]
fn test_narrowing_needs_explicit_cast() {
    assert_semantic("long l = 5L; int i = l;", "Cannot cast from [long] to [int].");
}

#[test]
fn test_constant_out_of_byte_range() {
    assert_semantic("byte b = 1000;", "Cannot cast from [int] to [byte].");
}

#[test]
fn test_null_to_primitive() {
    assert_semantic("int x = null;", "Cannot cast null to a primitive type [int].");
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_illegal_binary_operands() {
    assert_semantic("String s = 'a'; s - 1", "Cannot apply [-] to types [String] and [int].");
}

#[test]
fn test_not_requires_a_boolean() {
    assert_semantic("!5", "Cannot cast from [int] to [boolean].");
}

#[test]
fn test_constant_division_by_zero() {
    assert_semantic("int x = 1 / 0;", "/ by zero");
}

#[test]
fn test_constant_overflow_when_checked() {
    let settings = CompilerSettings {
        numeric_overflow: false,
        ..CompilerSettings::default()
    };
    let err = compile_error_with("int x = 2147483647 + 1;", &settings);
    assert_eq!(err.kind, CompileErrorKind::Semantic);
    assert_eq!(err.message, "int overflow");
    assert!(compile("int x = 2147483647 + 1;", &CompilerSettings::default()).is_ok());
}

#[test]
fn test_literal_is_not_assignable() {
    assert_semantic("1 = 2;", "Left-hand side cannot be assigned a value.");
}

// ============================================================================
// Calls and members
// ============================================================================

#[test]
fn test_unknown_local_function() {
    assert_semantic("foo()", "Unknown call [foo] with [0] arguments.");
}

#[test]
fn test_unknown_constructor() {
    assert_semantic(
        "new ArrayList(1, 2, 3)",
        "Unknown new call on type [ArrayList] with [3] arguments.",
    );
}

#[test]
fn test_unknown_method() {
    assert_semantic(
        "List l = []; l.frob()",
        "Unknown call [frob] with [0] arguments on type [List].",
    );
}

#[test]
fn test_unknown_static_field() {
    assert_semantic("Math.TAU", "Unknown static field [TAU] for type [Math].");
}

#[test]
fn test_array_access_on_string() {
    assert_semantic("String s = 'abc'; s[0]", "Illegal array access on type [String].");
}

#[test]
fn test_wrong_argument_count_for_function() {
    assert_semantic(
        "int twice(int x) { return x * 2; } twice(1, 2)",
        "Unknown call [twice] with [2] arguments.",
    );
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_not_a_statement() {
    assert_semantic("int x = 1; x + 1; x", "Not a statement.");
}

#[test]
fn test_unreachable_statement() {
    assert_semantic("return 1; int x = 2;", "Unreachable statement.");
}

#[test]
fn test_extraneous_if() {
    assert_semantic("int x = 1; if (true) { x = 2; } x", "Extraneous if statement.");
}

#[test]
fn test_extraneous_while() {
    assert_semantic("while (false) { int x = 1; }", "Extraneous while loop.");
}

#[test]
fn test_while_without_escape() {
    assert_semantic("while (true) {}", "While loop has no escape.");
}

#[test]
fn test_for_without_escape() {
    assert_semantic("for (;;) {}", "For loop has no escape.");
}

#[test]
fn test_break_outside_loop() {
    assert_semantic("break;", "Break statement outside of a loop.");
}

#[test]
fn test_continue_outside_loop() {
    assert_semantic("continue;", "Continue statement outside of a loop.");
}

#[test]
fn test_break_inside_lambda_does_not_see_outer_loop() {
    assert_semantic(
        "List l = [1]; while (l.size() > 0) { l.forEach(x -> { break; }); }",
        "Break statement outside of a loop.",
    );
}

#[test]
fn test_missing_return() {
    assert_semantic(
        "int f(int x) { if (x > 0) { return 1; } } f(1)",
        "Not all paths provide a return value for function [f].",
    );
}

#[test]
fn test_duplicate_function() {
    assert_semantic(
        "void f() {} void f() {} f()",
        "Duplicate function [f] with [0] parameters.",
    );
}

#[test]
fn test_return_value_from_void_function() {
    assert_semantic("void f() { return 1; } f()", "Cannot return a value from a void function.");
}

// ============================================================================
// Lambdas and references
// ============================================================================

#[test]
fn test_lambda_arity_mismatch() {
    assert_semantic(
        "Function f = (a, b) -> a; f",
        "Incorrect number of parameters for [Function] in lambda: expected [1], found [2].",
    );
}

#[test]
fn test_lambda_to_non_functional_type() {
    assert_semantic(
        "List l = x -> x;",
        "Cannot convert lambda to [List], not a functional interface.",
    );
}

#[test]
fn test_captured_variable_is_read_only() {
    assert_semantic(
        "int total = 0; List l = [1]; l.forEach(x -> { total = 1; });",
        "Variable [total] is read-only.",
    );
}

#[test]
fn test_unknown_function_reference() {
    assert_semantic("Function f = String::explode; f", "Unknown reference [String::explode] matching [Function]");
}

// ============================================================================
// Locations
// ============================================================================

#[test]
fn test_error_location() {
    let err = compile_error("int x = 1;\nint y = z;");
    assert_eq!(err.location.line, 2);
    assert_eq!(err.location.column, 9);
    assert_eq!(err.location.source_line, "int y = z;");
}

#[test]
fn test_error_display() {
    let err = compile_error("int x = 1;\nint y = z;");
    let text = err.to_string();
    assert!(text.contains("Variable [z] is not defined."));
    assert!(text.contains("line 2, column 9"));
}
