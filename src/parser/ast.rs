use std::fmt;

use pest::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Meta {
    pub start_index: usize,
    pub end_index: usize,
}

impl Meta {
    pub fn from_span(span: &Span) -> Self {
        Meta {
            start_index: span.start(),
            end_index: span.end(),
        }
    }
}

pub trait HasMeta {
    fn get_meta(&self) -> &Meta;
}

/// A parsed script: top level functions followed by the main body.
#[derive(Debug)]
pub struct SourceData {
    pub meta: Meta,
    pub functions: Vec<FunctionData>,
    pub statements: Vec<StatementType>,
    /// The body reads `_score`.
    pub uses_score: bool,
    /// The body reads `ctx`.
    pub uses_ctx: bool,
}

/// A type as written in the source, e.g. `int[][]` or `Map`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclType {
    pub meta: Meta,
    pub name: String,
    pub dimensions: usize,
}

impl DeclType {
    pub fn canonical(&self) -> String {
        let mut s = self.name.clone();
        for _ in 0..self.dimensions {
            s.push_str("[]");
        }
        s
    }
}

impl fmt::Display for DeclType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[derive(Debug)]
pub struct FunctionData {
    pub meta: Meta,
    pub return_type: DeclType,
    pub name: String,
    pub parameters: Vec<ParameterData>,
    pub body: BlockData,
}

/// Function parameters are always typed; lambda parameters may not be.
#[derive(Debug)]
pub struct ParameterData {
    pub meta: Meta,
    pub typ: Option<DeclType>,
    pub name: String,
}

#[derive(Debug)]
pub struct BlockData {
    pub meta: Meta,
    pub statements: Vec<StatementType>,
}

#[derive(Debug)]
pub struct DeclarationData {
    pub meta: Meta,
    pub typ: DeclType,
    pub declarators: Vec<DeclaratorData>,
}

#[derive(Debug)]
pub struct DeclaratorData {
    pub meta: Meta,
    pub name: String,
    pub initializer: Option<ExpressionType>,
}

#[derive(Debug)]
pub enum ForInit {
    Declaration(DeclarationData),
    Expression(ExpressionType),
}

#[derive(Debug)]
pub enum StatementType {
    Block(BlockData),
    If {
        meta: Meta,
        test: ExpressionType,
        consequent: Box<StatementType>,
        alternate: Option<Box<StatementType>>,
    },
    While {
        meta: Meta,
        test: ExpressionType,
        body: Box<StatementType>,
    },
    DoWhile {
        meta: Meta,
        body: BlockData,
        test: ExpressionType,
    },
    For {
        meta: Meta,
        init: Option<ForInit>,
        test: Option<ExpressionType>,
        update: Option<ExpressionType>,
        body: Box<StatementType>,
    },
    /// `for (T x : e)` when typed, `for (x in e)` otherwise.
    ForEach {
        meta: Meta,
        typ: Option<DeclType>,
        name: String,
        iterable: ExpressionType,
        body: Box<StatementType>,
    },
    Declaration(DeclarationData),
    Continue {
        meta: Meta,
    },
    Break {
        meta: Meta,
    },
    Return {
        meta: Meta,
        argument: Option<ExpressionType>,
    },
    Expression {
        meta: Meta,
        expression: ExpressionType,
    },
    Empty {
        meta: Meta,
    },
}

impl StatementType {
    pub fn is_empty(&self) -> bool {
        match self {
            StatementType::Empty { .. } => true,
            StatementType::Block(b) => b.statements.is_empty(),
            _ => false,
        }
    }
}

impl HasMeta for StatementType {
    fn get_meta(&self) -> &Meta {
        match self {
            StatementType::Block(data) => &data.meta,
            StatementType::If { meta, .. } => meta,
            StatementType::While { meta, .. } => meta,
            StatementType::DoWhile { meta, .. } => meta,
            StatementType::For { meta, .. } => meta,
            StatementType::ForEach { meta, .. } => meta,
            StatementType::Declaration(data) => &data.meta,
            StatementType::Continue { meta } => meta,
            StatementType::Break { meta } => meta,
            StatementType::Return { meta, .. } => meta,
            StatementType::Expression { meta, .. } => meta,
            StatementType::Empty { meta } => meta,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    NullLiteral,
    BooleanLiteral(bool),
    IntLiteral(i32),
    LongLiteral(i64),
    FloatLiteral(f32),
    DoubleLiteral(f64),
    StringLiteral(String),
}

#[derive(Debug)]
pub struct LiteralData {
    pub meta: Meta,
    pub value: LiteralType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Multiply,
    Divide,
    Remainder,
    Add,
    Subtract,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Remainder => "%",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::UnsignedShiftRight => ">>>",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::BitwiseOr => "|",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    BitwiseNot,
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    Increment,
    Decrement,
}

/// One step after the head of a chain: `.name`, `.name(args)` or `[index]`.
#[derive(Debug)]
pub enum LinkType {
    Field {
        meta: Meta,
        name: String,
    },
    Call {
        meta: Meta,
        name: String,
        arguments: Vec<ExpressionType>,
    },
    Brace {
        meta: Meta,
        index: Box<ExpressionType>,
    },
}

impl HasMeta for LinkType {
    fn get_meta(&self) -> &Meta {
        match self {
            LinkType::Field { meta, .. } => meta,
            LinkType::Call { meta, .. } => meta,
            LinkType::Brace { meta, .. } => meta,
        }
    }
}

#[derive(Debug)]
pub enum LambdaBody {
    Block(BlockData),
    Expression(Box<ExpressionType>),
}

#[derive(Debug)]
pub struct LambdaData {
    pub meta: Meta,
    pub parameters: Vec<ParameterData>,
    pub body: LambdaBody,
}

#[derive(Debug)]
pub enum ExpressionType {
    Literal(LiteralData),
    Variable {
        meta: Meta,
        name: String,
    },
    CallLocal {
        meta: Meta,
        name: String,
        arguments: Vec<ExpressionType>,
    },
    NewObject {
        meta: Meta,
        typ: String,
        arguments: Vec<ExpressionType>,
    },
    /// `new int[a][b][]`: `typ` carries every dimension, `sizes` the sized ones.
    NewArray {
        meta: Meta,
        typ: DeclType,
        sizes: Vec<ExpressionType>,
    },
    NewInitializedArray {
        meta: Meta,
        typ: DeclType,
        values: Vec<ExpressionType>,
    },
    ListInitializer {
        meta: Meta,
        values: Vec<ExpressionType>,
    },
    MapInitializer {
        meta: Meta,
        entries: Vec<(ExpressionType, ExpressionType)>,
    },
    /// `owner` is `None` for `this::name`.
    FunctionReference {
        meta: Meta,
        owner: Option<DeclType>,
        method: String,
    },
    Lambda(LambdaData),
    Chain {
        meta: Meta,
        head: Box<ExpressionType>,
        links: Vec<LinkType>,
    },
    Unary {
        meta: Meta,
        operator: UnaryOperator,
        argument: Box<ExpressionType>,
    },
    Binary {
        meta: Meta,
        operator: BinaryOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    Logical {
        meta: Meta,
        operator: LogicalOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    Comparison {
        meta: Meta,
        operator: ComparisonOperator,
        left: Box<ExpressionType>,
        right: Box<ExpressionType>,
    },
    InstanceOf {
        meta: Meta,
        argument: Box<ExpressionType>,
        typ: DeclType,
    },
    Cast {
        meta: Meta,
        typ: DeclType,
        argument: Box<ExpressionType>,
    },
    Conditional {
        meta: Meta,
        test: Box<ExpressionType>,
        consequent: Box<ExpressionType>,
        alternate: Box<ExpressionType>,
    },
    /// `operator` is set for compound assignment.
    Assignment {
        meta: Meta,
        target: Box<ExpressionType>,
        operator: Option<BinaryOperator>,
        value: Box<ExpressionType>,
    },
    Update {
        meta: Meta,
        operator: UpdateOperator,
        prefix: bool,
        target: Box<ExpressionType>,
    },
}

impl HasMeta for ExpressionType {
    fn get_meta(&self) -> &Meta {
        match self {
            ExpressionType::Literal(data) => &data.meta,
            ExpressionType::Variable { meta, .. } => meta,
            ExpressionType::CallLocal { meta, .. } => meta,
            ExpressionType::NewObject { meta, .. } => meta,
            ExpressionType::NewArray { meta, .. } => meta,
            ExpressionType::NewInitializedArray { meta, .. } => meta,
            ExpressionType::ListInitializer { meta, .. } => meta,
            ExpressionType::MapInitializer { meta, .. } => meta,
            ExpressionType::FunctionReference { meta, .. } => meta,
            ExpressionType::Lambda(data) => &data.meta,
            ExpressionType::Chain { meta, .. } => meta,
            ExpressionType::Unary { meta, .. } => meta,
            ExpressionType::Binary { meta, .. } => meta,
            ExpressionType::Logical { meta, .. } => meta,
            ExpressionType::Comparison { meta, .. } => meta,
            ExpressionType::InstanceOf { meta, .. } => meta,
            ExpressionType::Cast { meta, .. } => meta,
            ExpressionType::Conditional { meta, .. } => meta,
            ExpressionType::Assignment { meta, .. } => meta,
            ExpressionType::Update { meta, .. } => meta,
        }
    }
}
