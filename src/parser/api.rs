use std::time::Instant;

use pest::error::{Error, ErrorVariant, InputLocation};
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::{Parser, Span};
use pest_derive::Parser;
use tracing::debug;

use super::ast::*;
use crate::runner::ds::error::{CompileError, CompileErrorKind, Location};

#[derive(Parser)]
#[grammar = "parser/painless_grammar.pest"] // relative to src
pub struct PainlessParser;

const TAB_WIDTH: usize = 2;

lazy_static! {
    /// Binary operator precedence, loosest first. `instanceof` binds like
    /// the relational operators.
    static ref BINARY_PRECEDENCE: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::infix(Rule::bor_op, Assoc::Left))
        .op(Op::infix(Rule::xor_op, Assoc::Left))
        .op(Op::infix(Rule::band_op, Assoc::Left))
        .op(Op::infix(Rule::eq_op, Assoc::Left))
        .op(Op::infix(Rule::rel_op, Assoc::Left) | Op::postfix(Rule::instanceof_test))
        .op(Op::infix(Rule::shift_op, Assoc::Left))
        .op(Op::infix(Rule::add_op, Assoc::Left))
        .op(Op::infix(Rule::mul_op, Assoc::Left));
}

pub fn parse_to_token_tree(source: &str) -> Result<String, CompileError> {
    let mut tree = vec![];
    let start = Instant::now();
    let result = PainlessParser::parse(Rule::source, source);
    let total_time = Instant::now().saturating_duration_since(start);
    debug!("parsed in {}ms", total_time.as_millis());

    let pairs = result.map_err(|e| to_compile_error(source, e))?;
    for pair in pairs {
        tree.push(pair_to_string(pair, 0).join("\n"));
    }
    Ok(tree.join("\n"))
}

fn pair_to_string(pair: Pair<Rule>, level: usize) -> Vec<String> {
    let mut tree = vec![];
    let span = pair.as_span();
    let rule_name = format!(
        "{:?} => ({},{}) #{:?}",
        pair.as_rule(),
        span.start(),
        span.end(),
        span.as_str()
    );
    let string_pads = " ".repeat(level * TAB_WIDTH);
    tree.push(format!("{}{}", string_pads, rule_name));
    for child_pair in pair.into_inner() {
        tree.append(pair_to_string(child_pair, level + 1).as_mut());
    }
    tree
}

pub fn parse_to_pairs(source: &str) -> Result<Pairs<Rule>, Error<Rule>> {
    PainlessParser::parse(Rule::source, source)
}

/// Parse a script into its tree. With `picky` set, an `else` that could
/// belong to either of two nested `if`s is rejected.
pub fn parse_to_ast(source: &str, picky: bool) -> Result<SourceData, CompileError> {
    let pairs = parse_to_pairs(source).map_err(|e| to_compile_error(source, e))?;
    let mut uses_score = false;
    let mut uses_ctx = false;
    for pair in pairs.clone().flatten() {
        if pair.as_rule() == Rule::variable {
            match pair.as_str() {
                "_score" => uses_score = true,
                "ctx" => uses_ctx = true,
                _ => {}
            }
        }
    }
    let mut data = None;
    for pair in pairs {
        if pair.as_rule() == Rule::source {
            data = Some(build_ast_from_source(pair).map_err(|e| to_compile_error(source, e))?);
        }
    }
    let mut data = data.ok_or_else(|| {
        CompileError::new(
            CompileErrorKind::Syntax,
            "empty parse",
            Location::from_offset(source, 0),
        )
    })?;
    data.uses_score = uses_score;
    data.uses_ctx = uses_ctx;
    if picky {
        let mut dangling = None;
        for function in &data.functions {
            find_dangling_else(&function.body.statements, &mut dangling);
        }
        find_dangling_else(&data.statements, &mut dangling);
        if let Some(meta) = dangling {
            return Err(CompileError::new(
                CompileErrorKind::Ambiguity,
                "Ambiguous else; add braces to the enclosing if.",
                Location::from_offset(source, meta.start_index),
            ));
        }
    }
    Ok(data)
}

fn to_compile_error(source: &str, error: Error<Rule>) -> CompileError {
    let offset = match error.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((start, _)) => start,
    };
    let message = match &error.variant {
        ErrorVariant::CustomError { message } => message.clone(),
        ErrorVariant::ParsingError { positives, .. } if positives.is_empty() => {
            "unexpected input".to_string()
        }
        ErrorVariant::ParsingError { positives, .. } => format!(
            "unexpected input, expected one of {}",
            positives
                .iter()
                .map(|r| format!("{:?}", r))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    CompileError::new(
        CompileErrorKind::Syntax,
        message,
        Location::from_offset(source, offset),
    )
}

fn find_dangling_else(statements: &[StatementType], found: &mut Option<Meta>) {
    for statement in statements {
        if found.is_some() {
            return;
        }
        find_dangling_else_in(statement, found);
    }
}

fn find_dangling_else_in(statement: &StatementType, found: &mut Option<Meta>) {
    match statement {
        StatementType::If {
            meta,
            consequent,
            alternate,
            ..
        } => {
            if alternate.is_none() {
                if let StatementType::If {
                    alternate: Some(_), ..
                } = consequent.as_ref()
                {
                    *found = Some(*meta);
                    return;
                }
            }
            find_dangling_else_in(consequent, found);
            if let Some(alternate) = alternate {
                find_dangling_else_in(alternate, found);
            }
        }
        StatementType::Block(block) => find_dangling_else(&block.statements, found),
        StatementType::DoWhile { body, .. } => find_dangling_else(&body.statements, found),
        StatementType::While { body, .. }
        | StatementType::For { body, .. }
        | StatementType::ForEach { body, .. } => find_dangling_else_in(body, found),
        _ => {}
    }
}

fn get_unexpected_error(id: i32, pair: &Pair<Rule>) -> Error<Rule> {
    let message = format!("Unexpected state reached [{:?}] - {}", pair.as_rule(), id);
    Error::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
}

fn get_custom_error(message: String, span: Span) -> Error<Rule> {
    Error::new_from_span(ErrorVariant::CustomError { message }, span)
}

/// Children of a pair with keyword tokens skipped.
struct Children<'i> {
    pairs: Pairs<'i, Rule>,
    span: Span<'i>,
    raw: bool,
}

impl<'i> Children<'i> {
    fn of(pair: Pair<'i, Rule>) -> Self {
        Children {
            span: pair.as_span(),
            pairs: pair.into_inner(),
            raw: false,
        }
    }

    /// Keeps keyword tokens.
    fn raw(pair: Pair<'i, Rule>) -> Self {
        Children {
            raw: true,
            ..Children::of(pair)
        }
    }

    fn skip_keywords(&mut self) {
        if self.raw {
            return;
        }
        while let Some(p) = self.pairs.peek() {
            match p.as_rule() {
                Rule::IF
                | Rule::ELSE
                | Rule::WHILE
                | Rule::DO
                | Rule::FOR
                | Rule::IN
                | Rule::CONTINUE
                | Rule::BREAK
                | Rule::RETURN
                | Rule::NEW
                | Rule::INSTANCEOF => {
                    self.pairs.next();
                }
                _ => return,
            }
        }
    }

    fn next(&mut self, id: i32) -> Result<Pair<'i, Rule>, Error<Rule>> {
        self.skip_keywords();
        match self.pairs.next() {
            Some(p) => Ok(p),
            None => Err(get_custom_error(
                format!("Unexpected end of node - {}", id),
                self.span.clone(),
            )),
        }
    }

    fn peek_rule(&mut self) -> Option<Rule> {
        self.skip_keywords();
        self.pairs.peek().map(|p| p.as_rule())
    }

    fn next_if(&mut self, rule: Rule) -> Option<Pair<'i, Rule>> {
        if self.peek_rule() == Some(rule) {
            self.pairs.next()
        } else {
            None
        }
    }

    fn rest(&mut self) -> Vec<Pair<'i, Rule>> {
        let mut rest = vec![];
        loop {
            self.skip_keywords();
            match self.pairs.next() {
                Some(p) => rest.push(p),
                None => return rest,
            }
        }
    }
}

fn meta_of(pair: &Pair<Rule>) -> Meta {
    Meta::from_span(&pair.as_span())
}

fn spanning(left: &ExpressionType, right: &Meta) -> Meta {
    Meta {
        start_index: left.get_meta().start_index,
        end_index: right.end_index,
    }
}

// ── Declarations ──

fn build_ast_from_source(pair: Pair<Rule>) -> Result<SourceData, Error<Rule>> {
    let meta = meta_of(&pair);
    let mut functions = vec![];
    let mut statements = vec![];
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::function => functions.push(build_ast_from_function(inner_pair)?),
            Rule::statement => statements.push(build_ast_from_statement(inner_pair)?),
            Rule::EOI => { /* Do nothing */ }
            _ => return Err(get_unexpected_error(1, &inner_pair)),
        }
    }
    Ok(SourceData {
        meta,
        functions,
        statements,
        uses_score: false,
        uses_ctx: false,
    })
}

fn build_ast_from_function(pair: Pair<Rule>) -> Result<FunctionData, Error<Rule>> {
    let meta = meta_of(&pair);
    let mut children = Children::of(pair);
    let return_type = build_ast_from_decltype(children.next(2)?)?;
    let name = children.next(3)?.as_str().to_string();
    let mut parameters = vec![];
    for param in children.next(4)?.into_inner() {
        let param_meta = meta_of(&param);
        let mut param_children = Children::of(param);
        let typ = build_ast_from_decltype(param_children.next(5)?)?;
        parameters.push(ParameterData {
            meta: param_meta,
            typ: Some(typ),
            name: param_children.next(6)?.as_str().to_string(),
        });
    }
    let body = build_ast_from_block(children.next(7)?)?;
    Ok(FunctionData {
        meta,
        return_type,
        name,
        parameters,
        body,
    })
}

/// Accepts `decltype`, `array_type`, `reference_type` and bare type tokens.
fn build_ast_from_decltype(pair: Pair<Rule>) -> Result<DeclType, Error<Rule>> {
    let meta = meta_of(&pair);
    match pair.as_rule() {
        Rule::decltype | Rule::array_type | Rule::reference_type | Rule::base_type => {
            let span = pair.as_span();
            let mut name = None;
            let mut dimensions = 0;
            for inner_pair in pair.into_inner() {
                match inner_pair.as_rule() {
                    Rule::base_type => name = Some(build_ast_from_decltype(inner_pair)?.name),
                    Rule::primitive_type | Rule::def_type | Rule::ident | Rule::type_name => {
                        name = Some(inner_pair.as_str().to_string())
                    }
                    Rule::dims => dimensions = inner_pair.as_str().matches('[').count(),
                    _ => return Err(get_unexpected_error(8, &inner_pair)),
                }
            }
            match name {
                Some(name) => Ok(DeclType {
                    meta,
                    name,
                    dimensions,
                }),
                None => Err(get_custom_error("Missing type name".to_string(), span)),
            }
        }
        Rule::primitive_type | Rule::def_type | Rule::ident | Rule::type_name => Ok(DeclType {
            meta,
            name: pair.as_str().to_string(),
            dimensions: 0,
        }),
        _ => Err(get_unexpected_error(9, &pair)),
    }
}

// ── Statements ──

fn build_ast_from_block(pair: Pair<Rule>) -> Result<BlockData, Error<Rule>> {
    let meta = meta_of(&pair);
    let mut statements = vec![];
    for inner_pair in pair.into_inner() {
        statements.push(build_ast_from_statement(inner_pair)?);
    }
    Ok(BlockData { meta, statements })
}

fn build_ast_from_trailer(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let inner_pair = Children::of(pair).next(10)?;
    match inner_pair.as_rule() {
        Rule::block => Ok(StatementType::Block(build_ast_from_block(inner_pair)?)),
        Rule::statement => build_ast_from_statement(inner_pair),
        _ => Err(get_unexpected_error(11, &inner_pair)),
    }
}

fn build_ast_from_statement(pair: Pair<Rule>) -> Result<StatementType, Error<Rule>> {
    let inner_pair = Children::of(pair).next(12)?;
    let meta = meta_of(&inner_pair);
    Ok(match inner_pair.as_rule() {
        Rule::if_statement => {
            let mut children = Children::of(inner_pair);
            let test = build_ast_from_expression(children.next(13)?)?;
            let consequent = Box::new(build_ast_from_trailer(children.next(14)?)?);
            let alternate = match children.next_if(Rule::trailer) {
                Some(p) => Some(Box::new(build_ast_from_trailer(p)?)),
                None => None,
            };
            StatementType::If {
                meta,
                test,
                consequent,
                alternate,
            }
        }
        Rule::while_statement => {
            let mut children = Children::of(inner_pair);
            let test = build_ast_from_expression(children.next(15)?)?;
            let body = Box::new(build_ast_from_trailer(children.next(16)?)?);
            StatementType::While { meta, test, body }
        }
        Rule::do_statement => {
            let mut children = Children::of(inner_pair);
            let body = build_ast_from_block(children.next(17)?)?;
            let test = build_ast_from_expression(children.next(18)?)?;
            StatementType::DoWhile { meta, body, test }
        }
        Rule::for_statement => {
            let mut children = Children::of(inner_pair);
            let init = match children.next_if(Rule::for_init) {
                Some(p) => {
                    let init_pair = Children::of(p).next(19)?;
                    Some(match init_pair.as_rule() {
                        Rule::declaration => {
                            ForInit::Declaration(build_ast_from_declaration(init_pair)?)
                        }
                        _ => ForInit::Expression(build_ast_from_expression(init_pair)?),
                    })
                }
                None => None,
            };
            let test = match children.next_if(Rule::for_condition) {
                Some(p) => Some(build_ast_from_expression(Children::of(p).next(20)?)?),
                None => None,
            };
            let update = match children.next_if(Rule::for_afterthought) {
                Some(p) => Some(build_ast_from_expression(Children::of(p).next(21)?)?),
                None => None,
            };
            let body = Box::new(build_ast_from_trailer(children.next(22)?)?);
            StatementType::For {
                meta,
                init,
                test,
                update,
                body,
            }
        }
        Rule::each_statement => {
            let mut children = Children::of(inner_pair);
            let typ = build_ast_from_decltype(children.next(23)?)?;
            let name = children.next(24)?.as_str().to_string();
            let iterable = build_ast_from_expression(children.next(25)?)?;
            let body = Box::new(build_ast_from_trailer(children.next(26)?)?);
            StatementType::ForEach {
                meta,
                typ: Some(typ),
                name,
                iterable,
                body,
            }
        }
        Rule::ineach_statement => {
            let mut children = Children::of(inner_pair);
            let name = children.next(27)?.as_str().to_string();
            let iterable = build_ast_from_expression(children.next(28)?)?;
            let body = Box::new(build_ast_from_trailer(children.next(29)?)?);
            StatementType::ForEach {
                meta,
                typ: None,
                name,
                iterable,
                body,
            }
        }
        Rule::block => StatementType::Block(build_ast_from_block(inner_pair)?),
        Rule::empty_statement => StatementType::Empty { meta },
        Rule::declaration_statement => StatementType::Declaration(build_ast_from_declaration(
            Children::of(inner_pair).next(30)?,
        )?),
        Rule::continue_statement => StatementType::Continue { meta },
        Rule::break_statement => StatementType::Break { meta },
        Rule::return_statement => {
            let mut children = Children::of(inner_pair);
            let argument = match children.next_if(Rule::expression) {
                Some(p) => Some(build_ast_from_expression(p)?),
                None => None,
            };
            StatementType::Return { meta, argument }
        }
        Rule::expression_statement => StatementType::Expression {
            meta,
            expression: build_ast_from_expression(Children::of(inner_pair).next(31)?)?,
        },
        _ => return Err(get_unexpected_error(32, &inner_pair)),
    })
}

fn build_ast_from_declaration(pair: Pair<Rule>) -> Result<DeclarationData, Error<Rule>> {
    let meta = meta_of(&pair);
    let mut children = Children::of(pair);
    let typ = build_ast_from_decltype(children.next(33)?)?;
    let mut declarators = vec![];
    for declarator in children.rest() {
        let declarator_meta = meta_of(&declarator);
        let mut declarator_children = Children::of(declarator);
        let name = declarator_children.next(34)?.as_str().to_string();
        let initializer = match declarator_children.next_if(Rule::expression) {
            Some(p) => Some(build_ast_from_expression(p)?),
            None => None,
        };
        declarators.push(DeclaratorData {
            meta: declarator_meta,
            name,
            initializer,
        });
    }
    Ok(DeclarationData {
        meta,
        typ,
        declarators,
    })
}

// ── Expressions ──

fn build_ast_from_expression(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = meta_of(&pair);
    match pair.as_rule() {
        Rule::paren_expression => build_ast_from_expression(Children::of(pair).next(35)?),
        Rule::expression => {
            let mut children = Children::of(pair);
            let first = children.next(36)?;
            if first.as_rule() == Rule::lambda {
                return Ok(ExpressionType::Lambda(build_ast_from_lambda(first)?));
            }
            let target = build_ast_from_expression(first)?;
            match children.next_if(Rule::assign_op) {
                Some(op) => {
                    let operator = match op.as_str() {
                        "=" => None,
                        s => Some(binary_operator(&s[..s.len() - 1], &op)?),
                    };
                    let value = build_ast_from_expression(children.next(37)?)?;
                    Ok(ExpressionType::Assignment {
                        meta,
                        target: Box::new(target),
                        operator,
                        value: Box::new(value),
                    })
                }
                None => Ok(target),
            }
        }
        Rule::conditional => {
            let mut children = Children::of(pair);
            let test = build_ast_from_expression(children.next(38)?)?;
            match children.next_if(Rule::expression) {
                Some(consequent) => {
                    let consequent = build_ast_from_expression(consequent)?;
                    let alternate = build_ast_from_expression(children.next(39)?)?;
                    Ok(ExpressionType::Conditional {
                        meta,
                        test: Box::new(test),
                        consequent: Box::new(consequent),
                        alternate: Box::new(alternate),
                    })
                }
                None => Ok(test),
            }
        }
        Rule::binary => build_ast_from_binary(pair),
        Rule::unary => {
            let mut children = Children::of(pair);
            let first = children.next(49)?;
            match first.as_rule() {
                Rule::sign_op => {
                    let argument_pair = children.next(50)?;
                    let negate = first.as_str() == "-";
                    if let Some(number) = numeric_literal_of(&argument_pair) {
                        let value = build_ast_from_numeric(number, negate)?;
                        return Ok(ExpressionType::Literal(LiteralData { meta, value }));
                    }
                    Ok(ExpressionType::Unary {
                        meta,
                        operator: if negate {
                            UnaryOperator::Minus
                        } else {
                            UnaryOperator::Plus
                        },
                        argument: Box::new(build_ast_from_expression(argument_pair)?),
                    })
                }
                Rule::not_op => {
                    let operator = if first.as_str() == "!" {
                        UnaryOperator::Not
                    } else {
                        UnaryOperator::BitwiseNot
                    };
                    let argument = build_ast_from_expression(children.next(51)?)?;
                    Ok(ExpressionType::Unary {
                        meta,
                        operator,
                        argument: Box::new(argument),
                    })
                }
                _ => build_ast_from_expression(first),
            }
        }
        Rule::pre_update => {
            let mut children = Children::of(pair);
            let operator = update_operator(&children.next(52)?);
            let target = build_ast_from_expression(children.next(53)?)?;
            Ok(ExpressionType::Update {
                meta,
                operator,
                prefix: true,
                target: Box::new(target),
            })
        }
        Rule::postfix => {
            let mut children = Children::of(pair);
            let target = build_ast_from_expression(children.next(54)?)?;
            match children.next_if(Rule::incr_op) {
                Some(op) => Ok(ExpressionType::Update {
                    meta,
                    operator: update_operator(&op),
                    prefix: false,
                    target: Box::new(target),
                }),
                None => Ok(target),
            }
        }
        Rule::cast => {
            let mut children = Children::of(pair);
            let typ = build_ast_from_decltype(children.next(55)?)?;
            let argument = build_ast_from_expression(children.next(56)?)?;
            Ok(ExpressionType::Cast {
                meta,
                typ,
                argument: Box::new(argument),
            })
        }
        Rule::chain => {
            let mut children = Children::of(pair);
            let head = build_ast_from_expression(children.next(57)?)?;
            let mut links = vec![];
            for link in children.rest() {
                links.push(build_ast_from_link(link)?);
            }
            if links.is_empty() {
                Ok(head)
            } else {
                Ok(ExpressionType::Chain {
                    meta,
                    head: Box::new(head),
                    links,
                })
            }
        }
        Rule::variable => Ok(ExpressionType::Variable {
            meta,
            name: pair.as_str().to_string(),
        }),
        Rule::call_local => {
            let mut children = Children::of(pair);
            let name = children.next(58)?.as_str().to_string();
            let arguments = build_ast_from_arguments(children.next(59)?)?;
            Ok(ExpressionType::CallLocal {
                meta,
                name,
                arguments,
            })
        }
        Rule::new_object => {
            let mut children = Children::of(pair);
            let typ = children.next(60)?.as_str().to_string();
            let arguments = build_ast_from_arguments(children.next(61)?)?;
            Ok(ExpressionType::NewObject {
                meta,
                typ,
                arguments,
            })
        }
        Rule::new_array => {
            let mut children = Children::of(pair);
            let base = build_ast_from_decltype(children.next(62)?)?;
            let mut sizes = vec![];
            let mut extra = 0;
            for p in children.rest() {
                if p.as_rule() == Rule::dims {
                    extra = p.as_str().matches('[').count();
                } else {
                    sizes.push(build_ast_from_expression(p)?);
                }
            }
            Ok(ExpressionType::NewArray {
                meta,
                typ: DeclType {
                    meta: base.meta,
                    name: base.name,
                    dimensions: sizes.len() + extra,
                },
                sizes,
            })
        }
        Rule::new_initialized_array => {
            let mut children = Children::of(pair);
            let typ = build_ast_from_decltype(children.next(63)?)?;
            let mut values = vec![];
            for p in children.rest() {
                values.push(build_ast_from_expression(p)?);
            }
            Ok(ExpressionType::NewInitializedArray { meta, typ, values })
        }
        Rule::collection_initializer => build_ast_from_collection(pair),
        Rule::function_ref => {
            // NEW is kept here: `Type::new` names the constructor.
            let mut children = Children::raw(pair);
            let owner_pair = children.next(69)?;
            let owner = match owner_pair.as_rule() {
                Rule::THIS => None,
                _ => Some(build_ast_from_decltype(owner_pair)?),
            };
            let method = children.next(70)?.as_str().to_string();
            Ok(ExpressionType::FunctionReference {
                meta,
                owner,
                method,
            })
        }
        Rule::literal => {
            let inner_pair = Children::of(pair).next(66)?;
            let value = match inner_pair.as_rule() {
                Rule::string => LiteralType::StringLiteral(unescape(inner_pair.as_str())),
                Rule::boolean => LiteralType::BooleanLiteral(inner_pair.as_str() == "true"),
                Rule::null => LiteralType::NullLiteral,
                _ => build_ast_from_numeric(inner_pair, false)?,
            };
            Ok(ExpressionType::Literal(LiteralData { meta, value }))
        }
        _ => Err(get_unexpected_error(67, &pair)),
    }
}

/// Applies operator precedence to the flat `operand (op operand)*`
/// sequence of a `binary` node.
fn build_ast_from_binary(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    BINARY_PRECEDENCE
        .map_primary(build_ast_from_expression)
        .map_postfix(|argument, test| {
            let argument = argument?;
            let typ = build_ast_from_decltype(Children::of(test).next(46)?)?;
            Ok(ExpressionType::InstanceOf {
                meta: spanning(&argument, &typ.meta),
                argument: Box::new(argument),
                typ,
            })
        })
        .map_infix(|left, op, right| {
            let (left, right) = (left?, right?);
            let meta = spanning(&left, right.get_meta());
            let (left, right) = (Box::new(left), Box::new(right));
            Ok(match op.as_rule() {
                Rule::or_op | Rule::and_op => ExpressionType::Logical {
                    meta,
                    operator: if op.as_rule() == Rule::and_op {
                        LogicalOperator::And
                    } else {
                        LogicalOperator::Or
                    },
                    left,
                    right,
                },
                Rule::eq_op | Rule::rel_op => ExpressionType::Comparison {
                    meta,
                    operator: comparison_operator(&op)?,
                    left,
                    right,
                },
                _ => ExpressionType::Binary {
                    meta,
                    operator: binary_operator(op.as_str(), &op)?,
                    left,
                    right,
                },
            })
        })
        .parse(pair.into_inner())
}

/// `[...]` is a list when no entry has a value, a map when every entry
/// has one. `[:]` is the empty map.
fn build_ast_from_collection(pair: Pair<Rule>) -> Result<ExpressionType, Error<Rule>> {
    let meta = meta_of(&pair);
    let span = pair.as_span();
    let mut keys = vec![];
    let mut values = vec![];
    let mut is_map = false;
    for inner_pair in pair.into_inner() {
        match inner_pair.as_rule() {
            Rule::empty_map => is_map = true,
            Rule::entry_value => {
                let value = build_ast_from_expression(Children::of(inner_pair).next(64)?)?;
                values.push(value);
            }
            _ => keys.push(build_ast_from_expression(inner_pair)?),
        }
    }
    if values.is_empty() && !is_map {
        return Ok(ExpressionType::ListInitializer { meta, values: keys });
    }
    if values.len() != keys.len() {
        return Err(get_custom_error(
            "A map initializer needs a value for every key.".to_string(),
            span,
        ));
    }
    Ok(ExpressionType::MapInitializer {
        meta,
        entries: keys.into_iter().zip(values).collect(),
    })
}

fn build_ast_from_arguments(pair: Pair<Rule>) -> Result<Vec<ExpressionType>, Error<Rule>> {
    let mut arguments = vec![];
    for inner_pair in pair.into_inner() {
        arguments.push(build_ast_from_expression(inner_pair)?);
    }
    Ok(arguments)
}

fn build_ast_from_link(pair: Pair<Rule>) -> Result<LinkType, Error<Rule>> {
    let inner_pair = Children::of(pair).next(71)?;
    let meta = meta_of(&inner_pair);
    match inner_pair.as_rule() {
        Rule::dot_link => {
            let mut children = Children::of(inner_pair);
            let name = children.next(72)?.as_str().to_string();
            match children.next_if(Rule::arguments) {
                Some(arguments) => Ok(LinkType::Call {
                    meta,
                    name,
                    arguments: build_ast_from_arguments(arguments)?,
                }),
                None => Ok(LinkType::Field { meta, name }),
            }
        }
        Rule::brace_link => Ok(LinkType::Brace {
            meta,
            index: Box::new(build_ast_from_expression(
                Children::of(inner_pair).next(73)?,
            )?),
        }),
        _ => Err(get_unexpected_error(74, &inner_pair)),
    }
}

fn build_ast_from_lambda(pair: Pair<Rule>) -> Result<LambdaData, Error<Rule>> {
    let meta = meta_of(&pair);
    let mut children = Children::of(pair);
    let mut parameters = vec![];
    for param in children.next(75)?.into_inner() {
        let param_meta = meta_of(&param);
        let mut param_children = Children::of(param);
        let first = param_children.next(76)?;
        parameters.push(match param_children.next_if(Rule::ident) {
            Some(name) => ParameterData {
                meta: param_meta,
                typ: Some(build_ast_from_decltype(first)?),
                name: name.as_str().to_string(),
            },
            None => ParameterData {
                meta: param_meta,
                typ: None,
                name: first.as_str().to_string(),
            },
        });
    }
    let body_pair = children.next(77)?;
    let body = match body_pair.as_rule() {
        Rule::block => LambdaBody::Block(build_ast_from_block(body_pair)?),
        _ => LambdaBody::Expression(Box::new(build_ast_from_expression(body_pair)?)),
    };
    Ok(LambdaData {
        meta,
        parameters,
        body,
    })
}

fn binary_operator(op: &str, pair: &Pair<Rule>) -> Result<BinaryOperator, Error<Rule>> {
    Ok(match op {
        "*" => BinaryOperator::Multiply,
        "/" => BinaryOperator::Divide,
        "%" => BinaryOperator::Remainder,
        "+" => BinaryOperator::Add,
        "-" => BinaryOperator::Subtract,
        "<<" => BinaryOperator::ShiftLeft,
        ">>" => BinaryOperator::ShiftRight,
        ">>>" => BinaryOperator::UnsignedShiftRight,
        "&" => BinaryOperator::BitwiseAnd,
        "^" => BinaryOperator::BitwiseXor,
        "|" => BinaryOperator::BitwiseOr,
        _ => return Err(get_unexpected_error(78, pair)),
    })
}

fn comparison_operator(pair: &Pair<Rule>) -> Result<ComparisonOperator, Error<Rule>> {
    Ok(match pair.as_str() {
        "==" => ComparisonOperator::Equal,
        "!=" => ComparisonOperator::NotEqual,
        "===" => ComparisonOperator::StrictEqual,
        "!==" => ComparisonOperator::StrictNotEqual,
        "<" => ComparisonOperator::LessThan,
        "<=" => ComparisonOperator::LessThanEqual,
        ">" => ComparisonOperator::GreaterThan,
        ">=" => ComparisonOperator::GreaterThanEqual,
        _ => return Err(get_unexpected_error(79, pair)),
    })
}

fn update_operator(pair: &Pair<Rule>) -> UpdateOperator {
    if pair.as_str() == "++" {
        UpdateOperator::Increment
    } else {
        UpdateOperator::Decrement
    }
}

/// The numeric token under `unary`, if the operand is nothing but a number.
/// Lets `-2147483648` parse as a single constant.
fn numeric_literal_of<'i>(pair: &Pair<'i, Rule>) -> Option<Pair<'i, Rule>> {
    let mut current = pair.clone();
    loop {
        let mut inner = current.clone().into_inner();
        let only = inner.next()?;
        if inner.next().is_some() {
            return None;
        }
        match current.as_rule() {
            Rule::unary | Rule::postfix | Rule::chain => current = only,
            Rule::literal => {
                return match only.as_rule() {
                    Rule::decimal | Rule::hex | Rule::octal | Rule::integer => Some(only),
                    _ => None,
                }
            }
            _ => return None,
        }
    }
}

fn build_ast_from_numeric(pair: Pair<Rule>, negate: bool) -> Result<LiteralType, Error<Rule>> {
    let text = pair.as_str();
    let shown = if negate {
        format!("-{}", text)
    } else {
        text.to_string()
    };
    let invalid = |kind: &str| {
        get_custom_error(
            format!("Invalid {} constant [{}].", kind, shown),
            pair.as_span(),
        )
    };
    match pair.as_rule() {
        Rule::decimal => {
            let (digits, single) = match text.chars().last() {
                Some('f') | Some('F') => (&text[..text.len() - 1], true),
                Some('d') | Some('D') => (&text[..text.len() - 1], false),
                _ => (text, false),
            };
            if single {
                let value: f32 = digits.parse().map_err(|_| invalid("float"))?;
                if !value.is_finite() {
                    return Err(invalid("float"));
                }
                Ok(LiteralType::FloatLiteral(if negate { -value } else { value }))
            } else {
                let value: f64 = digits.parse().map_err(|_| invalid("double"))?;
                if !value.is_finite() {
                    return Err(invalid("double"));
                }
                Ok(LiteralType::DoubleLiteral(if negate { -value } else { value }))
            }
        }
        Rule::integer | Rule::hex | Rule::octal => {
            let (digits, long) = match text.chars().last() {
                Some('l') | Some('L') => (&text[..text.len() - 1], true),
                _ => (text, false),
            };
            let (digits, radix) = match pair.as_rule() {
                Rule::hex => (&digits[2..], 16),
                Rule::octal => (&digits[1..], 8),
                _ => (digits, 10),
            };
            let kind = if long { "long" } else { "int" };
            let magnitude = u64::from_str_radix(digits, radix).map_err(|_| invalid(kind))?;
            if radix == 10 {
                // Decimal constants carry their sign in the range check.
                let max = if long { i64::MAX as u64 } else { i32::MAX as u64 };
                let limit = max + negate as u64;
                if magnitude > limit {
                    return Err(invalid(kind));
                }
            } else if !long && magnitude > u64::from(u32::MAX) {
                return Err(invalid(kind));
            }
            Ok(if long {
                let value = magnitude as i64;
                LiteralType::LongLiteral(if negate { value.wrapping_neg() } else { value })
            } else {
                let value = magnitude as u32 as i32;
                LiteralType::IntLiteral(if negate { value.wrapping_neg() } else { value })
            })
        }
        _ => Err(get_unexpected_error(80, &pair)),
    }
}

fn unescape(quoted: &str) -> String {
    let body = &quoted[1..quoted.len() - 1];
    let mut s = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                s.push(escaped);
            }
        } else {
            s.push(c);
        }
    }
    s
}
