/// Benchmark runner for the painless VM.
///
/// Each workload runs twice: once with static types and once with `def`
/// locals, which go through the dynamic dispatch caches.

extern crate painless;

use painless::runner::compiler::{compile, CompilerSettings};
use painless::runner::ds::value::Value;
use painless::runner::script::{Script, ScriptInputs};
use std::time::{Duration, Instant};

fn compile_benchmark(name: &str, code: &str) -> Script {
    let settings = CompilerSettings {
        max_loop_counter: 0,
        ..CompilerSettings::default()
    };
    compile(code, &settings).unwrap_or_else(|e| panic!("Failed to compile benchmark {}: {}", name, e))
}

/// Run a benchmark and return the execution time.
fn run_benchmark(name: &str, code: &str, iterations: u32) -> Duration {
    let script = compile_benchmark(name, code);

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = script.execute(ScriptInputs::new());
    }
    start.elapsed()
}

fn run_and_get_result(code: &str) -> Value {
    compile_benchmark("verification", code)
        .execute(ScriptInputs::new())
        .unwrap_or(Value::Null)
}

// ============================================================================
// Benchmark definitions
// ============================================================================

const BENCH_FIBONACCI: &str = r#"
int n = 20; int a = 0; int b = 1;
for (int i = 0; i < n; i++) { int temp = a; a = b; b = temp + b; }
a
"#;

const BENCH_FIBONACCI_DEF: &str = r#"
def n = 20; def a = 0; def b = 1;
for (def i = 0; i < n; i++) { def temp = a; a = b; b = temp + b; }
a
"#;

const BENCH_LOOP_SUM: &str = r#"
int sum = 0;
for (int i = 0; i < 10000; i++) { sum += i; }
sum
"#;

const BENCH_LOOP_SUM_DEF: &str = r#"
def sum = 0;
for (def i = 0; i < 10000; i++) { sum += i; }
sum
"#;

const BENCH_PRIME_SIEVE: &str = r#"
int count = 0;
for (int n = 2; n < 100; n++) {
    boolean isPrime = true;
    for (int i = 2; i * i <= n; i++) {
        if (n % i == 0) { isPrime = false; break; }
    }
    if (isPrime) { count++; }
}
count
"#;

const BENCH_RECURSION: &str = r#"
int fib(int n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
fib(15)
"#;

const BENCH_COLLECTIONS: &str = r#"
List list = new ArrayList();
for (int i = 0; i < 1000; i++) { list.add(i); }
int total = 0;
for (def x : list) { total += x; }
total
"#;

const BENCH_COLLECTIONS_DEF: &str = r#"
def list = [];
for (int i = 0; i < 1000; i++) { list.add(i); }
def total = 0;
for (x in list) { total += x; }
total
"#;

const BENCH_LAMBDAS: &str = r#"
List list = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
int total = 0;
for (int k = 0; k < 100; k++) {
    List copy = new ArrayList(list);
    copy.removeIf(x -> x % 2 == 0);
    total += copy.size();
}
total
"#;

fn main() {
    println!("=======================================================");
    println!("  Painless VM - Performance Benchmarks");
    println!("  Static types vs def dispatch");
    println!("=======================================================\n");

    let benchmarks: Vec<(&str, &str, &str, u32)> = vec![
        ("Fibonacci (n=20)", BENCH_FIBONACCI, BENCH_FIBONACCI_DEF, 1000),
        ("Loop Sum (10K iterations)", BENCH_LOOP_SUM, BENCH_LOOP_SUM_DEF, 100),
        ("Collections (1K)", BENCH_COLLECTIONS, BENCH_COLLECTIONS_DEF, 100),
    ];

    println!("{:<30} {:>14} {:>14} {:>10}", "Benchmark", "Static", "def", "Ratio");
    println!("{}", "-".repeat(70));

    let mut total_static = Duration::ZERO;
    let mut total_def = Duration::ZERO;

    for (name, typed, untyped, iterations) in &benchmarks {
        let static_dur = run_benchmark(name, typed, *iterations);
        let def_dur = run_benchmark(name, untyped, *iterations);
        total_static += static_dur;
        total_def += def_dur;

        let ratio = def_dur.as_secs_f64() / static_dur.as_secs_f64();
        println!("{:<30} {:>12.2?} {:>12.2?} {:>9.2}x", name, static_dur, def_dur, ratio);
    }

    println!("{}", "-".repeat(70));
    let total_ratio = total_def.as_secs_f64() / total_static.as_secs_f64();
    println!(
        "{:<30} {:>12.2?} {:>12.2?} {:>9.2}x",
        "TOTAL", total_static, total_def, total_ratio
    );

    for (name, code, iterations) in &[
        ("Prime Sieve (<100)", BENCH_PRIME_SIEVE, 200),
        ("Recursion fib(15)", BENCH_RECURSION, 50),
        ("Lambdas (removeIf)", BENCH_LAMBDAS, 200),
    ] {
        println!("{:<30} {:>12.2?}", name, run_benchmark(name, code, *iterations));
    }

    // Verify correctness
    println!("\n=======================================================");
    println!("  Correctness Verification");
    println!("=======================================================\n");

    let verifications: Vec<(&str, &str, i32)> = vec![
        ("Fibonacci", BENCH_FIBONACCI, 6765),
        ("Fibonacci (def)", BENCH_FIBONACCI_DEF, 6765),
        ("Loop Sum", BENCH_LOOP_SUM, 49995000),
        ("Loop Sum (def)", BENCH_LOOP_SUM_DEF, 49995000),
        ("Prime Count", BENCH_PRIME_SIEVE, 25),
        ("Recursion", BENCH_RECURSION, 610),
        ("Collections", BENCH_COLLECTIONS, 499500),
        ("Collections (def)", BENCH_COLLECTIONS_DEF, 499500),
        ("Lambdas", BENCH_LAMBDAS, 500),
    ];

    println!("{:<20} {:>12} {:>12}", "Test", "Expected", "Actual");
    println!("{}", "-".repeat(46));

    for (name, code, expected) in verifications {
        let actual = match run_and_get_result(code) {
            Value::Int(n) => n,
            _ => -1,
        };
        let status = if actual == expected { "✓" } else { "✗" };
        println!("{:<20} {:>12} {:>4} {:>7}", name, expected, status, actual);
    }
}
