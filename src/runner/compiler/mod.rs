//! Compiles script source into an executable [`Script`].
//!
//! The pipeline is parse, analyze, emit. Analysis produces a typed tree and
//! emission only ever sees that tree, so the bytecode always reflects a
//! fully checked program.

pub mod analyzer;
pub mod bytecode;
pub mod emitter;
pub mod locals;
pub mod tree;
pub mod vm;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::parser::ast::SourceData;
use crate::parser::parse_to_ast;
use crate::runner::definition::Definition;
use crate::runner::ds::error::{CompileError, CompileErrorKind, Location, SettingsError};
use crate::runner::script::Script;
use crate::runner::std_lib::default_definition;

pub const NUMERIC_OVERFLOW: &str = "numeric_overflow";
pub const PICKY: &str = "picky";
pub const MAX_LOOP_COUNTER: &str = "max_loop_counter";

/// Stack of the parser thread. Grammar recursion grows with how deeply a
/// script nests its expressions.
const PARSER_STACK_SIZE: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerSettings {
    /// When false, integer arithmetic and decimal overflow to infinity raise
    /// instead of wrapping. Only statically typed operands are checked:
    /// arithmetic on `def` values always wraps.
    pub numeric_overflow: bool,
    /// Report grammar ambiguities as errors instead of resolving them.
    pub picky: bool,
    /// Statement budget for the loops of each function call, charged per
    /// iteration by the size of the loop body; 0 disables the guard.
    pub max_loop_counter: u32,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        CompilerSettings {
            numeric_overflow: true,
            picky: false,
            max_loop_counter: 1_000_000,
        }
    }
}

impl CompilerSettings {
    /// Reads the string-keyed form. Missing keys keep their defaults.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, SettingsError> {
        let mut settings = CompilerSettings::default();
        for (key, value) in params {
            let invalid = || SettingsError::InvalidValue {
                key: key.clone(),
                value: value.clone(),
            };
            match key.as_str() {
                NUMERIC_OVERFLOW => settings.numeric_overflow = value.trim().parse().map_err(|_| invalid())?,
                PICKY => settings.picky = value.trim().parse().map_err(|_| invalid())?,
                MAX_LOOP_COUNTER => settings.max_loop_counter = value.trim().parse().map_err(|_| invalid())?,
                _ => return Err(SettingsError::UnknownKey(key.clone())),
            }
        }
        Ok(settings)
    }
}

/// Compiles `source` against the default registry.
#[tracing::instrument(skip_all)]
pub fn compile(source: &str, settings: &CompilerSettings) -> Result<Script, CompileError> {
    ScriptCompiler::new().settings(settings.clone()).compile(source)
}

/// Compiler with a custom registry or extra input bindings.
#[derive(Default)]
pub struct ScriptCompiler {
    definition: Option<Arc<Definition>>,
    settings: CompilerSettings,
    inputs: Vec<String>,
}

impl ScriptCompiler {
    pub fn new() -> Self {
        ScriptCompiler::default()
    }

    pub fn definition(mut self, definition: Arc<Definition>) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn settings(mut self, settings: CompilerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Declares a read-only `def` variable filled from `params` by name.
    pub fn input(mut self, name: &str) -> Self {
        self.inputs.push(name.to_string());
        self
    }

    pub fn compile(&self, source: &str) -> Result<Script, CompileError> {
        let definition = match &self.definition {
            Some(definition) => definition.clone(),
            None => default_definition().map_err(|e| {
                CompileError::new(CompileErrorKind::Semantic, e.to_string(), Location::default())
            })?,
        };

        let ast = parse_with_stack(source, self.settings.picky)?;
        debug!(
            functions = ast.functions.len(),
            statements = ast.statements.len(),
            "parsed script"
        );

        let typed = analyzer::analyze(&definition, &self.settings, source, &ast, &self.inputs)?;
        debug!(functions = typed.functions.len(), "analyzed script");

        let program = emitter::emit(typed, self.settings.max_loop_counter);
        debug!(
            functions = program.functions.len(),
            constants = program.constants.len(),
            sites = program.sites.len(),
            "emitted bytecode"
        );
        Ok(Script::new(source, definition, program))
    }
}

fn parse_with_stack(source: &str, picky: bool) -> Result<SourceData, CompileError> {
    thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("painless-parser".into())
            .stack_size(PARSER_STACK_SIZE)
            .spawn_scoped(scope, || parse_to_ast(source, picky))
            .map_err(|e| {
                CompileError::new(
                    CompileErrorKind::Syntax,
                    format!("failed to spawn parser thread: {}", e),
                    Location::default(),
                )
            })?;
        match worker.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    })
}
