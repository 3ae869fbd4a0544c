use std::fmt;

use thiserror::Error;

/// Runtime failure raised by an executing script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("cannot cast [{from}] to [{to}]")]
    ClassCast { from: String, to: String },
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
    #[error("null pointer: {0}")]
    NullPointer(String),
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(String),
    #[error("number format error: {0}")]
    NumberFormat(String),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("illegal state: {0}")]
    IllegalState(String),
    #[error("the maximum number of statements that can be executed in a loop has been reached")]
    LoopLimit,
    #[error("stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),
}

impl ScriptError {
    pub fn class_cast(from: &str, to: &str) -> Self {
        ScriptError::ClassCast {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn illegal(message: impl Into<String>) -> Self {
        ScriptError::IllegalArgument(message.into())
    }
}

/// Configuration error raised while building a type registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("invalid struct name [{0}]")]
    InvalidName(String),
    #[error("duplicate struct name [{0}]")]
    DuplicateStruct(String),
    #[error("native class [{0}] not found")]
    NativeNotFound(String),
    #[error("native class [{native}] is already registered as [{existing}]")]
    DuplicateNative { native: String, existing: String },
    #[error("unknown type [{0}]")]
    UnknownType(String),
    #[error("malformed type name [{0}]")]
    MalformedType(String),
    #[error("owner struct [{0}] not defined")]
    UnknownOwner(String),
    #[error("duplicate {kind} [{name}/{arity}] for struct [{owner}]")]
    DuplicateMember {
        kind: &'static str,
        owner: String,
        name: String,
        arity: usize,
    },
    #[error("{kind} [{name}/{arity}] not found on native class [{native}]")]
    MemberNotFound {
        kind: &'static str,
        native: String,
        name: String,
        arity: usize,
    },
    #[error("declared type [{declared}] is not compatible with native type [{native}] for [{owner}.{member}]")]
    GenericMismatch {
        owner: String,
        member: String,
        declared: String,
        native: String,
    },
    #[error("duplicate cast from [{from}] to [{to}] (explicit: {explicit})")]
    DuplicateCast { from: String, to: String, explicit: bool },
    #[error("illegal definition: {0}")]
    Illegal(String),
}

/// Invalid string-keyed compiler settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("unknown compiler setting [{0}]")]
    UnknownKey(String),
    #[error("invalid value [{value}] for compiler setting [{key}]")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    Syntax,
    Semantic,
    Ambiguity,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileErrorKind::Syntax => write!(f, "syntax error"),
            CompileErrorKind::Semantic => write!(f, "compile error"),
            CompileErrorKind::Ambiguity => write!(f, "ambiguity error"),
        }
    }
}

/// Position of a diagnostic within the script source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    /// 1-based line.
    pub line: usize,
    /// 1-based column, in characters.
    pub column: usize,
    /// Byte offset from the start of the source.
    pub offset: usize,
    pub source_line: String,
}

impl Location {
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let line_end = source[offset..]
            .find('\n')
            .map(|i| offset + i)
            .unwrap_or_else(|| source.len());
        Location {
            line: before.matches('\n').count() + 1,
            column: source[line_start..offset].chars().count() + 1,
            offset,
            source_line: source[line_start..line_end].trim_end_matches('\r').to_string(),
        }
    }
}

/// A compile failure: the script never produced an artifact.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}\n  at line {}, column {}: {}", .location.line, .location.column, .location.source_line)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub location: Location,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, location: Location) -> Self {
        CompileError {
            kind,
            message: message.into(),
            location,
        }
    }

    pub fn semantic(source: &str, offset: usize, message: impl Into<String>) -> Self {
        Self::new(
            CompileErrorKind::Semantic,
            message,
            Location::from_offset(source, offset),
        )
    }
}
