//! The compiled artifact and its invocation inputs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::runner::compiler::bytecode::Program;
use crate::runner::compiler::vm::Vm;
use crate::runner::definition::Definition;
use crate::runner::ds::error::ScriptError;
use crate::runner::ds::value::Value;

/// Source of the `_score` binding.
pub trait Scorer {
    fn score(&self) -> f64;
}

/// Values bound to the implicit variables of one invocation.
#[derive(Default)]
pub struct ScriptInputs<'a> {
    pub params: HashMap<String, Value>,
    pub scorer: Option<&'a dyn Scorer>,
    pub doc: Option<Value>,
    pub aggregation_value: Option<Value>,
    pub ctx: Option<Value>,
}

impl<'a> ScriptInputs<'a> {
    pub fn new() -> Self {
        ScriptInputs::default()
    }

    pub fn param(mut self, name: &str, value: Value) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn scorer(mut self, scorer: &'a dyn Scorer) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn doc(mut self, doc: Value) -> Self {
        self.doc = Some(doc);
        self
    }

    pub fn aggregation_value(mut self, value: Value) -> Self {
        self.aggregation_value = Some(value);
        self
    }

    pub fn ctx(mut self, ctx: Value) -> Self {
        self.ctx = Some(ctx);
        self
    }
}

/// A compiled script. Immutable and shareable across threads; every
/// [`execute`](Script::execute) call gets fresh VM state.
#[derive(Clone)]
pub struct Script {
    source: Arc<str>,
    definition: Arc<Definition>,
    program: Arc<Program>,
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("source", &self.source)
            .field("functions", &self.program.functions.len())
            .finish()
    }
}

impl Script {
    pub(crate) fn new(source: &str, definition: Arc<Definition>, program: Program) -> Self {
        Script {
            source: Arc::from(source),
            definition,
            program: Arc::new(program),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn uses_score(&self) -> bool {
        self.program.bindings.score.is_some()
    }

    pub fn uses_ctx(&self) -> bool {
        self.program.bindings.ctx.is_some()
    }

    pub fn disassemble(&self) -> String {
        self.program.disassemble()
    }

    pub fn execute(&self, inputs: ScriptInputs<'_>) -> Result<Value, ScriptError> {
        let bindings = &self.program.bindings;
        let mut slots = Vec::with_capacity(5 + bindings.inputs.len());

        for (name, slot) in &bindings.inputs {
            slots.push((*slot, inputs.params.get(name).cloned().unwrap_or(Value::Null)));
        }
        if let Some(slot) = bindings.score {
            let scorer = inputs
                .scorer
                .ok_or_else(|| ScriptError::NullPointer("no scorer is available for [_score]".to_string()))?;
            slots.push((slot, Value::Double(scorer.score())));
        }
        if let Some(slot) = bindings.ctx {
            slots.push((slot, inputs.ctx.unwrap_or(Value::Null)));
        }
        slots.push((bindings.doc, inputs.doc.unwrap_or(Value::Null)));
        slots.push((bindings.value, inputs.aggregation_value.unwrap_or(Value::Null)));
        // Sorted so the map is filled the same way on every run.
        let mut params: Vec<(String, Value)> = inputs.params.into_iter().collect();
        params.sort_by(|a, b| a.0.cmp(&b.0));
        let params = params.into_iter().map(|(name, value)| (Value::from(name), value));
        slots.push((bindings.params, Value::new_map(params)));

        debug!(inputs = bindings.inputs.len(), "executing script");
        Vm::new(&self.program, &self.definition).run_main(slots)
    }
}
