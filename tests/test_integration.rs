//! Integration tests for the script engine.
//!
//! These tests compile script source and execute it on the VM to verify
//! end-to-end behavior: typing, dynamic dispatch, collections, functions,
//! lambdas and runtime errors.

extern crate painless;

use painless::runner::compiler::{compile, CompilerSettings, ScriptCompiler};
use painless::runner::ds::error::{ScriptError, SettingsError};
use painless::runner::ds::value::Value;
use painless::runner::script::{Script, ScriptInputs, Scorer};
use std::collections::HashMap;

/// Helper to compile and execute a script with no inputs.
fn run(code: &str) -> Result<Value, ScriptError> {
    run_with(code, &CompilerSettings::default())
}

fn run_with(code: &str, settings: &CompilerSettings) -> Result<Value, ScriptError> {
    let script = compile(code, settings).unwrap_or_else(|e| panic!("failed to compile {}: {}", code, e));
    script.execute(ScriptInputs::new())
}

/// Helper to run a script and render its result the way `String.valueOf` would.
fn run_to_string(code: &str) -> String {
    run(code).unwrap().to_string()
}

struct FixedScore(f64);

impl Scorer for FixedScore {
    fn score(&self) -> f64 {
        self.0
    }
}

// ============================================================================
// Arithmetic
// ============================================================================

#[test]
fn test_integer_arithmetic() {
    assert_eq!(run("1 + 2 * 3").unwrap(), Value::Int(7));
    assert_eq!(run("(1 + 2) * 3").unwrap(), Value::Int(9));
    assert_eq!(run("7 / 2").unwrap(), Value::Int(3));
    assert_eq!(run("-7 % 3").unwrap(), Value::Int(-1));
}

#[test]
fn test_numeric_promotion() {
    assert_eq!(run("5.0 / 2").unwrap(), Value::Double(2.5));
    assert_eq!(run("long l = 2147483647; l + 1").unwrap(), Value::Long(2147483648));
    assert_eq!(run("double d = 5; d").unwrap(), Value::Double(5.0));
    assert_eq!(run("float f = 1.5f; f * 2").unwrap(), Value::Float(3.0));
}

#[test]
fn test_explicit_casts() {
    assert_eq!(run("(int) 3.9").unwrap(), Value::Int(3));
    assert_eq!(run("(long) 3").unwrap(), Value::Long(3));
    assert_eq!(run("(byte) 300").unwrap(), Value::Byte(44));
    assert_eq!(run("(char) 65").unwrap(), Value::Char(65));
}

#[test]
fn test_bitwise_and_shifts() {
    assert_eq!(run("6 & 3").unwrap(), Value::Int(2));
    assert_eq!(run("6 | 3").unwrap(), Value::Int(7));
    assert_eq!(run("6 ^ 3").unwrap(), Value::Int(5));
    assert_eq!(run("~0").unwrap(), Value::Int(-1));
    assert_eq!(run("-16 >> 2").unwrap(), Value::Int(-4));
    assert_eq!(run("-16 >>> 28").unwrap(), Value::Int(15));
    assert_eq!(run("1 << 33").unwrap(), Value::Int(2));
}

#[test]
fn test_increments_and_compound_assignment() {
    assert_eq!(run("int i = 5; i++ + ++i").unwrap(), Value::Int(12));
    assert_eq!(
        run("int x = 10; x += 5; x -= 3; x *= 2; x /= 4; x %= 4; x").unwrap(),
        Value::Int(2)
    );
}

#[test]
fn test_overflow_wraps_by_default() {
    assert_eq!(run("int x = 2147483647; x + 1").unwrap(), Value::Int(i32::MIN));
}

#[test]
fn test_overflow_raises_when_checked() {
    let settings = CompilerSettings {
        numeric_overflow: false,
        ..CompilerSettings::default()
    };
    let result = run_with("int x = 2147483647; x + 1", &settings);
    assert!(matches!(result, Err(ScriptError::Arithmetic(_))));
}

#[test]
fn test_def_arithmetic_wraps_even_when_checked() {
    let settings = CompilerSettings {
        numeric_overflow: false,
        ..CompilerSettings::default()
    };
    assert_eq!(
        run_with("def x = 2147483647; x + 1", &settings).unwrap(),
        Value::Int(i32::MIN)
    );
}

#[test]
fn test_division_by_zero() {
    assert_eq!(
        run("int z = 0; 1 / z").unwrap_err(),
        ScriptError::Arithmetic("/ by zero".to_string())
    );
}

#[test]
fn test_conditionals_and_logic() {
    assert_eq!(run("int x = 3; x > 2 ? 'big' : 'small'").unwrap(), Value::string("big"));
    assert_eq!(run("boolean a = true; boolean b = false; a && !b").unwrap(), Value::Bool(true));
    assert_eq!(run("int z = 0; z < 2 || 1 / z == 0").unwrap(), Value::Bool(true));
}

#[test]
fn test_checked_negation_only_guards_integers() {
    let settings = CompilerSettings {
        numeric_overflow: false,
        ..CompilerSettings::default()
    };
    assert!(matches!(
        run_with("int m = Integer.MIN_VALUE; -m", &settings),
        Err(ScriptError::Arithmetic(_))
    ));
    assert_eq!(
        run_with("double d = Double.MAX_VALUE; -d", &settings).unwrap(),
        Value::Double(-f64::MAX)
    );
}

#[test]
fn test_folding_matches_dynamic_operators() {
    for (folded, dynamic) in &[
        ("3 + 4", "def a = 3; def b = 4; a + b"),
        ("7 / 2", "def a = 7; def b = 2; a / b"),
        ("-9 % 4", "def a = -9; def b = 4; a % b"),
        ("5 << 3", "def a = 5; def b = 3; a << b"),
        ("2147483647 * 2", "def a = 2147483647; def b = 2; a * b"),
    ] {
        assert_eq!(run(folded).unwrap(), run(dynamic).unwrap(), "{} vs {}", folded, dynamic);
    }
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_string_concatenation() {
    assert_eq!(run("'a' + 1 + 2").unwrap(), Value::string("a12"));
    assert_eq!(run("1 + 2 + 'a'").unwrap(), Value::string("3a"));
    assert_eq!(run("String s = 'x'; s += 2.5; s").unwrap(), Value::string("x2.5"));
}

#[test]
fn test_string_methods() {
    assert_eq!(run("'Painless'.length()").unwrap(), Value::Int(8));
    assert_eq!(run("'Painless'.substring(0, 4)").unwrap(), Value::string("Pain"));
    assert_eq!(run("'Painless'.toUpperCase()").unwrap(), Value::string("PAINLESS"));
    assert_eq!(run("'  trim me '.trim()").unwrap(), Value::string("trim me"));
    assert_eq!(run("'abc'.charAt(1)").unwrap(), Value::Char(98));
    assert_eq!(run("'a-b-c'.replace('-', '+')").unwrap(), Value::string("a+b+c"));
    assert_eq!(run("String.join(',', ['x', 'y'])").unwrap(), Value::string("x,y"));
}

#[test]
fn test_string_equality_uses_equals() {
    assert_eq!(run("String a = 'ab'; String b = 'a'; b += 'b'; a == b").unwrap(), Value::Bool(true));
    assert_eq!(run("'abc'.equalsIgnoreCase('ABC')").unwrap(), Value::Bool(true));
}

#[test]
fn test_char_conversions() {
    assert_eq!(run("char c = (char) 'z'; c").unwrap(), Value::Char(122));
    assert_eq!(run("char c = (char) 'q'; (String) c").unwrap(), Value::string("q"));
}

// ============================================================================
// Static members
// ============================================================================

#[test]
fn test_math_and_boxes() {
    assert_eq!(run("Math.max(2, 7.5)").unwrap(), Value::Double(7.5));
    assert_eq!(run("Math.round(2.5)").unwrap(), Value::Long(3));
    assert_eq!(run("Integer.parseInt('42') + 1").unwrap(), Value::Int(43));
    assert_eq!(run("Integer.MAX_VALUE").unwrap(), Value::Int(i32::MAX));
}

#[test]
fn test_number_format_error() {
    assert!(matches!(run("Integer.parseInt('forty')"), Err(ScriptError::NumberFormat(_))));
}

// ============================================================================
// def and dynamic dispatch
// ============================================================================

#[test]
fn test_def_method_calls() {
    assert_eq!(run("def x = 'hello'; x.length()").unwrap(), Value::Int(5));
    assert_eq!(run("def x = [1, 2, 3]; x.size()").unwrap(), Value::Int(3));
}

#[test]
fn test_def_arithmetic_promotes() {
    assert_eq!(run("def a = 1; def b = 2L; a + b").unwrap(), Value::Long(3));
    assert_eq!(run("def a = 'x'; def b = 1; a + b").unwrap(), Value::string("x1"));
    assert_eq!(run("def a = 3; a * 1.5").unwrap(), Value::Double(4.5));
}

#[test]
fn test_def_call_site_sees_many_receivers() {
    let code = "
        List items = ['abc', [1, 2], ['k': 1], 'de', [3]];
        int total = 0;
        for (def item : items) {
            if (item instanceof String) { total += item.length(); } else { total += item.size(); }
        }
        total
    ";
    assert_eq!(run(code).unwrap(), Value::Int(3 + 2 + 1 + 2 + 1));
}

#[test]
fn test_def_to_typed_conversion() {
    assert_eq!(run("def x = 5; long l = x; l").unwrap(), Value::Long(5));
    assert_eq!(
        run("def x = 'str'; int i = x; i").unwrap_err(),
        ScriptError::class_cast("String", "int")
    );
}

#[test]
fn test_unknown_dynamic_method() {
    assert_eq!(
        run("def x = [1]; x.explode()").unwrap_err(),
        ScriptError::IllegalArgument(
            "Unable to find dynamic method [explode] with [0] arguments for class [ArrayList].".to_string()
        )
    );
}

#[test]
fn test_null_receiver() {
    assert!(matches!(run("def x = null; x.size()"), Err(ScriptError::NullPointer(_))));
}

#[test]
fn test_instanceof_and_identity() {
    assert_eq!(run("def x = [1]; x instanceof List").unwrap(), Value::Bool(true));
    assert_eq!(run("def x = [1]; x instanceof Map").unwrap(), Value::Bool(false));
    assert_eq!(run("List a = [1]; List b = [1]; a == b").unwrap(), Value::Bool(true));
    assert_eq!(run("List a = [1]; List b = [1]; a === b").unwrap(), Value::Bool(false));
    assert_eq!(run("List a = [1]; List b = a; a === b").unwrap(), Value::Bool(true));
}

// ============================================================================
// Collections and shortcuts
// ============================================================================

#[test]
fn test_list_literal_and_methods() {
    assert_eq!(run_to_string("List l = [3, 1, 2]; l.add(4); l"), "[3, 1, 2, 4]");
    assert_eq!(run("List l = [3, 1, 2]; l.get(0) + l[1]").unwrap(), Value::Int(4));
    assert_eq!(run("List l = [10, 20]; l[1] = 5; l[1]").unwrap(), Value::Int(5));
    assert_eq!(run("List l = [1, 2, 3]; l.indexOf(3)").unwrap(), Value::Int(2));
}

#[test]
fn test_list_index_out_of_bounds() {
    assert!(matches!(run("List l = [1]; l.get(5)"), Err(ScriptError::IndexOutOfBounds(_))));
}

#[test]
fn test_map_literal_and_shortcuts() {
    assert_eq!(run("Map m = ['a': 1, 'b': 2]; m.a + m['b']").unwrap(), Value::Int(3));
    assert_eq!(run("Map m = [:]; m.count = 5; m.count += 1; m.count").unwrap(), Value::Int(6));
    assert_eq!(run("Map m = [:]; m.missing").unwrap(), Value::Null);
    assert_eq!(run("Map m = ['k': 1]; m.getOrDefault('z', 9)").unwrap(), Value::Int(9));
}

#[test]
fn test_def_map_and_list_shortcuts() {
    assert_eq!(run("def m = [:]; m.b = 2; m.b").unwrap(), Value::Int(2));
    assert_eq!(run("def l = [10, 20]; l.1").unwrap(), Value::Int(20));
    assert_eq!(run("def l = [10, 20]; l[0] = 7; l[0]").unwrap(), Value::Int(7));
}

#[test]
fn test_nested_collections() {
    let code = "Map m = ['xs': [1, 2, 3]]; m.xs.add(4); m.xs.size()";
    assert_eq!(run(code).unwrap(), Value::Int(4));
}

#[test]
fn test_map_can_hold_itself_as_key() {
    assert_eq!(run("Map m = [:]; m.put(m, 1); m.size()").unwrap(), Value::Int(1));
    assert_eq!(run("Set s = new HashSet(); s.add(s); s.size()").unwrap(), Value::Int(1));
}

#[test]
fn test_self_referencing_collections_render() {
    assert_eq!(
        run_to_string("List l = [1]; l.add(l); l.toString()"),
        "[1, (this Collection)]"
    );
    assert_eq!(
        run_to_string("Map m = [:]; m.put('self', m); m.toString()"),
        "{self=(this Map)}"
    );
    assert_eq!(
        run_to_string("List inner = [2]; List outer = [inner]; inner.add(outer); outer"),
        "[[2, (this Collection)]]"
    );
}

#[test]
fn test_self_referencing_list_hashes_and_compares() {
    assert_eq!(run("List l = [1]; l.add(l); l.hashCode()").unwrap(), Value::Int(992));
    assert_eq!(run("List l = [1]; l.add(l); l.equals(l)").unwrap(), Value::Bool(true));
    assert_eq!(
        run("List a = []; a.add(a); List b = []; b.add(b); a.equals(b)").unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn test_map_iteration_order_is_stable() {
    let code = "
        Map m = [:];
        for (String k : ['e', 'a', 'd', 'b', 'c', 'f', 'g']) { m.put(k, 1); }
        String keys = '';
        for (def k : m.keySet()) { keys += k; }
        keys
    ";
    let script = compile(code, &CompilerSettings::default()).unwrap();
    let first = script.execute(ScriptInputs::new()).unwrap();
    for _ in 0..5 {
        assert_eq!(script.execute(ScriptInputs::new()).unwrap(), first);
    }
    assert_eq!(run(code).unwrap(), first);
    let set = "Set s = new HashSet(); for (int i = 20; i > 0; --i) { s.add('k' + i); } s";
    assert_eq!(run_to_string(set), run_to_string(set));
}

#[test]
fn test_collection_constructors() {
    assert_eq!(run("List l = new ArrayList(); l.add(1); l.size()").unwrap(), Value::Int(1));
    assert_eq!(run("List a = [1, 2]; List b = new ArrayList(a); b.add(3); a.size()").unwrap(), Value::Int(2));
    assert_eq!(run("Set s = new HashSet([1, 1, 2]); s.size()").unwrap(), Value::Int(2));
    assert_eq!(run("Map m = new HashMap(); m.put('a', 1); m.size()").unwrap(), Value::Int(1));
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_arrays() {
    assert_eq!(run("int[] a = new int[3]; a[0] = 5; a.length").unwrap(), Value::Int(3));
    assert_eq!(run("int[] a = new int[3]; a[2]").unwrap(), Value::Int(0));
    assert_eq!(
        run("int[] a = new int[] {1, 2, 3}; int s = 0; for (int x : a) { s += x; } s").unwrap(),
        Value::Int(6)
    );
    assert_eq!(run("int[][] m = new int[2][3]; m[1][2] = 7; m[1][2]").unwrap(), Value::Int(7));
    assert_eq!(run("String[] s = new String[2]; s[0]").unwrap(), Value::Null);
}

#[test]
fn test_array_bounds() {
    assert!(matches!(
        run("int[] a = new int[2]; a[2]"),
        Err(ScriptError::IndexOutOfBounds(_))
    ));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_loops() {
    assert_eq!(run("int s = 0; for (int i = 0; i < 5; i++) { s += i; } s").unwrap(), Value::Int(10));
    assert_eq!(run("int i = 0; while (i < 10) { i += 3; } i").unwrap(), Value::Int(12));
    assert_eq!(run("int i = 0; do { i++; } while (i < 0); i").unwrap(), Value::Int(1));
    assert_eq!(run("int s = 0; for (x in [1, 2, 3]) { s += x; } s").unwrap(), Value::Int(6));
}

#[test]
fn test_break_and_continue() {
    let code = "
        int s = 0;
        for (int i = 0; i < 10; i++) {
            if (i % 2 == 0) { continue; }
            if (i > 7) { break; }
            s += i;
        }
        s
    ";
    assert_eq!(run(code).unwrap(), Value::Int(1 + 3 + 5 + 7));
}

#[test]
fn test_infinite_loop_with_escape() {
    assert_eq!(run("int i = 0; while (true) { if (++i == 4) { break; } } i").unwrap(), Value::Int(4));
}

#[test]
fn test_explicit_return_from_main() {
    assert_eq!(run("int x = 1; if (x > 0) { return 'yes'; } return 'no';").unwrap(), Value::string("yes"));
}

#[test]
fn test_no_result() {
    assert_eq!(run("int x = 1;").unwrap(), Value::Null);
}

#[test]
fn test_loop_counter_limit() {
    let settings = CompilerSettings {
        max_loop_counter: 10,
        ..CompilerSettings::default()
    };
    let code = "int i = 0; while (i < 100) { i++; } i";
    assert_eq!(run_with(code, &settings).unwrap_err(), ScriptError::LoopLimit);

    let unlimited = CompilerSettings {
        max_loop_counter: 0,
        ..CompilerSettings::default()
    };
    assert_eq!(run_with(code, &unlimited).unwrap(), Value::Int(100));
}

#[test]
fn test_loop_limit_applies_inside_lambdas() {
    let settings = CompilerSettings {
        max_loop_counter: 50,
        ..CompilerSettings::default()
    };
    let code = "
        List l = [1, 2, 3];
        l.forEach(x -> { int i = 0; while (i < 1000) { i++; } });
    ";
    assert_eq!(run_with(code, &settings).unwrap_err(), ScriptError::LoopLimit);
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_user_functions() {
    let code = "
        int twice(int x) { return x * 2; }
        String greet(String name) { return 'hi ' + name; }
        greet('bob') + twice(21)
    ";
    assert_eq!(run(code).unwrap(), Value::string("hi bob42"));
}

#[test]
fn test_overloading_by_arity() {
    let code = "
        int f(int a) { return a; }
        int f(int a, int b) { return a + b; }
        f(1) + f(2, 3)
    ";
    assert_eq!(run(code).unwrap(), Value::Int(6));
}

#[test]
fn test_recursion() {
    let code = "int fib(int n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(15)";
    assert_eq!(run(code).unwrap(), Value::Int(610));
}

#[test]
fn test_function_arguments_are_cast() {
    let code = "double half(double d) { return d / 2; } half(3)";
    assert_eq!(run(code).unwrap(), Value::Double(1.5));
}

#[test]
fn test_stack_overflow() {
    let code = "int down(int n) { return down(n + 1); } down(0)";
    assert!(matches!(run(code), Err(ScriptError::StackOverflow(_))));
}

// ============================================================================
// Lambdas and references
// ============================================================================

#[test]
fn test_lambda_with_captures() {
    let code = "
        int k = 2;
        List out = [];
        [1, 2, 3].forEach(x -> out.add(x * k));
        out
    ";
    assert_eq!(run_to_string(code), "[2, 4, 6]");
}

#[test]
fn test_lambda_as_comparator() {
    assert_eq!(
        run_to_string("List l = [3, 1, 2]; l.sort((a, b) -> b - a); l"),
        "[3, 2, 1]"
    );
    assert_eq!(
        run_to_string("List l = [3, 1, 2]; l.sort(Comparator.naturalOrder()); l"),
        "[1, 2, 3]"
    );
}

#[test]
fn test_comparator_that_grows_the_list_fails() {
    let result = run("List l = [3, 1, 2]; l.sort((a, b) -> { l.add(0); return a - b; }); l");
    assert!(matches!(result, Err(ScriptError::IllegalState(_))));
}

#[test]
fn test_lambda_block_body() {
    let code = "
        Function f = x -> { int y = x + 1; return y * y; };
        f.apply(3)
    ";
    assert_eq!(run(code).unwrap(), Value::Int(16));
}

#[test]
fn test_remove_if_with_typed_lambda() {
    let code = "List l = [1, 2, 3, 4, 5]; l.removeIf((int x) -> x % 2 == 0); l";
    assert_eq!(run_to_string(code), "[1, 3, 5]");
}

#[test]
fn test_predicate_negate() {
    let code = "Predicate even = x -> x % 2 == 0; Predicate odd = even.negate(); odd.test(3)";
    assert_eq!(run(code).unwrap(), Value::Bool(true));
}

#[test]
fn test_static_method_reference() {
    let code = "Function parse = Integer::parseInt; parse.apply('42')";
    assert_eq!(run(code).unwrap(), Value::Int(42));
}

#[test]
fn test_instance_method_reference() {
    let code = "Function len = String::length; len.apply('four')";
    assert_eq!(run(code).unwrap(), Value::Int(4));
}

#[test]
fn test_constructor_reference() {
    let code = "Supplier make = ArrayList::new; List l = make.get(); l.add(1); l.size()";
    assert_eq!(run(code).unwrap(), Value::Int(1));
}

#[test]
fn test_local_function_reference() {
    let code = "
        boolean isEven(def x) { return x % 2 == 0; }
        List l = [1, 2, 3, 4];
        l.removeIf(this::isEven);
        l
    ";
    assert_eq!(run_to_string(code), "[1, 3]");
}

#[test]
fn test_lambda_stored_in_def() {
    let code = "def f = (a, b) -> a * b; BiFunction g = f; g.apply(6, 7)";
    assert_eq!(run(code).unwrap(), Value::Int(42));
}

#[test]
fn test_map_for_each() {
    let code = "
        Map m = ['a': 1, 'b': 2, 'c': 3];
        List sums = [0];
        m.forEach((k, v) -> sums[0] += v);
        sums[0]
    ";
    assert_eq!(run(code).unwrap(), Value::Int(6));
}

#[test]
fn test_capture_is_a_snapshot() {
    let code = "int x = 1; Supplier s = () -> x; x = 5; s.get()";
    assert_eq!(run(code).unwrap(), Value::Int(1));
}

// ============================================================================
// Inputs
// ============================================================================

#[test]
fn test_simplest_script() {
    assert_eq!(run("1 + 1").unwrap(), Value::Int(2));
    assert!(compile("1 +", &CompilerSettings::default()).is_err());
}

#[test]
fn test_nested_expression_compiles_on_a_small_thread() {
    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| run_to_string("int[] a = new int[] {5}; ((((((((a[0])))))))) + 1"))
        .unwrap();
    assert_eq!(handle.join().unwrap(), "6");
}

#[test]
fn test_deeply_nested_list_literal() {
    let depth = 24;
    let code = format!("{}1{}.size()", "[".repeat(depth), "]".repeat(depth));
    assert_eq!(run(&code).unwrap(), Value::Int(1));
}

#[test]
fn test_field_of_bound_input() {
    let script = ScriptCompiler::new().input("a").compile("a.b").unwrap();
    let mut map = HashMap::new();
    map.insert(Value::string("b"), Value::Int(5));
    let result = script.execute(ScriptInputs::new().param("a", Value::new_map(map))).unwrap();
    assert_eq!(result, Value::Int(5));
}

#[test]
fn test_params() {
    let script = compile("int x = 5; x * params.factor", &CompilerSettings::default()).unwrap();
    let result = script.execute(ScriptInputs::new().param("factor", Value::Int(3))).unwrap();
    assert_eq!(result, Value::Int(15));
    assert_eq!(
        script.execute(ScriptInputs::new().param("factor", Value::Int(4))).unwrap(),
        Value::Int(20)
    );
}

#[test]
fn test_params_are_a_fresh_map_per_call() {
    let script = compile("params.seen = true; params.size()", &CompilerSettings::default()).unwrap();
    assert_eq!(script.execute(ScriptInputs::new()).unwrap(), Value::Int(1));
    assert_eq!(script.execute(ScriptInputs::new()).unwrap(), Value::Int(1));
}

#[test]
fn test_named_inputs() {
    let script = ScriptCompiler::new()
        .input("x")
        .input("y")
        .compile("x * 2 + y")
        .unwrap();
    let inputs = ScriptInputs::new().param("x", Value::Int(4)).param("y", Value::Int(1));
    assert_eq!(script.execute(inputs).unwrap(), Value::Int(9));
}

#[test]
fn test_score() {
    let script = compile("_score * 2", &CompilerSettings::default()).unwrap();
    assert!(script.uses_score());
    let scorer = FixedScore(1.5);
    assert_eq!(script.execute(ScriptInputs::new().scorer(&scorer)).unwrap(), Value::Double(3.0));
    assert!(matches!(
        script.execute(ScriptInputs::new()),
        Err(ScriptError::NullPointer(_))
    ));
}

#[test]
fn test_ctx() {
    let script = compile("ctx.count = ctx.count + 1; ctx.count", &CompilerSettings::default()).unwrap();
    assert!(script.uses_ctx());
    assert!(!script.uses_score());
    let mut map = HashMap::new();
    map.insert(Value::string("count"), Value::Int(41));
    let ctx = Value::new_map(map);
    assert_eq!(script.execute(ScriptInputs::new().ctx(ctx.clone())).unwrap(), Value::Int(42));
    assert_eq!(script.execute(ScriptInputs::new().ctx(ctx)).unwrap(), Value::Int(43));
}

#[test]
fn test_doc_and_aggregation_value() {
    let script = compile("doc.price * _value", &CompilerSettings::default()).unwrap();
    let mut map = HashMap::new();
    map.insert(Value::string("price"), Value::Double(2.5));
    let inputs = ScriptInputs::new()
        .doc(Value::new_map(map))
        .aggregation_value(Value::Int(4));
    assert_eq!(script.execute(inputs).unwrap(), Value::Double(10.0));
}

// ============================================================================
// Settings and scripts
// ============================================================================

#[test]
fn test_settings_from_params() {
    let mut params = HashMap::new();
    params.insert("picky".to_string(), "true".to_string());
    params.insert("max_loop_counter".to_string(), "25".to_string());
    let settings = CompilerSettings::from_params(&params).unwrap();
    assert!(settings.picky);
    assert!(settings.numeric_overflow);
    assert_eq!(settings.max_loop_counter, 25);
}

#[test]
fn test_settings_rejects_bad_input() {
    let mut params = HashMap::new();
    params.insert("max_loop_counter".to_string(), "lots".to_string());
    assert_eq!(
        CompilerSettings::from_params(&params).unwrap_err(),
        SettingsError::InvalidValue {
            key: "max_loop_counter".to_string(),
            value: "lots".to_string(),
        }
    );

    let mut params = HashMap::new();
    params.insert("speed".to_string(), "fast".to_string());
    assert_eq!(
        CompilerSettings::from_params(&params).unwrap_err(),
        SettingsError::UnknownKey("speed".to_string())
    );
}

#[test]
fn test_scripts_are_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Script>();

    let script = compile("int s = 0; for (int i = 0; i < 10; i++) { s += i; } s", &CompilerSettings::default())
        .unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let script = script.clone();
            std::thread::spawn(move || script.execute(ScriptInputs::new()).map(|v| v.to_string()))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), "45");
    }
}

#[test]
fn test_disassembly_lists_functions() {
    let script = compile("int f(int x) { return x; } f(1)", &CompilerSettings::default()).unwrap();
    let listing = script.disassemble();
    assert!(listing.contains("f"));
    assert_eq!(script.source(), "int f(int x) { return x; } f(1)");
}
