//! # painless - a sandboxed scripting language in Rust
//!
//! A small, statically checked, Java-like scripting language featuring:
//! - PEG parser producing a typed-friendly AST
//! - Whitelist-driven type registry: scripts only see what is registered
//! - Semantic analyzer with casts, promotions and constant folding
//! - Stack-based bytecode VM with cached dynamic (`def`) dispatch
//! - Loop guard and call depth limit for untrusted scripts
//!
//! ## Quick Start
//!
//! ### Running a script
//!
//! ```
//! use painless::runner::compiler::{compile, CompilerSettings};
//! use painless::runner::ds::value::Value;
//! use painless::runner::script::ScriptInputs;
//!
//! let script = compile("int x = 5; x * params.factor", &CompilerSettings::default()).unwrap();
//! let result = script
//!     .execute(ScriptInputs::new().param("factor", Value::Int(3)))
//!     .unwrap();
//! assert_eq!(result, Value::Int(15));
//! ```
//!
//! ### Compile errors
//!
//! ```
//! use painless::runner::compiler::{compile, CompilerSettings};
//!
//! let err = compile("int x = 'hello';", &CompilerSettings::default()).unwrap_err();
//! println!("{}", err);
//! ```
//!
//! ## Architecture
//!
//! - **[`parser`]** - PEG parser and AST types
//! - **[`runner`]** - Type registry, compiler and VM
//!   - **[`runner::definition`]** - Whitelisted types, methods, fields and casts
//!   - **[`runner::def`]** - Runtime dispatch for `def` values
//!   - **[`runner::compiler`]** - Analyzer, bytecode emitter and VM
//!   - **[`runner::std_lib`]** - The default whitelist

#[macro_use]
extern crate lazy_static;

pub mod parser;
pub mod runner;

pub use runner::compiler::{compile, CompilerSettings, ScriptCompiler};
pub use runner::script::{Script, ScriptInputs, Scorer};
