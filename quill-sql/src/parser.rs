use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use quill_common::error::Position;
use quill_common::{DataType, Error, Result, ScalarValue};
use quill_expr::expr::{Attribute, CaseBranch};
use quill_expr::{Expr, Operator};
use quill_plan::source::Config;
use quill_plan::{Aggregate, Filter, Limit, LogicalPlan, Project, Relation, Sort, SortOrder, Subquery, Union};
use std::cell::RefCell;

/// Parses a single SQL statement (possibly a `union all` of several
/// `select`s) into a logical plan, binding every `from`-clause relation to
/// a concrete `Source` along the way.
///
/// Ported from `original_source/parser/{parser,sql}.go::ParseSql`. The Go
/// parser threads a recursive-descent statement grammar with an inline
/// shunting-yard algorithm for expressions (`wantExpression`); this is the
/// same split, as `want_query`/`want_select`/... versus `want_expression`.
pub fn parse(sql: &str, config: &Config) -> Result<LogicalPlan> {
    log::debug!("parsing sql: {sql}");
    let tokens = Lexer::tokenize(sql)?;
    log::trace!("lexed {} token(s)", tokens.len());
    let mut parser = Parser {
        tokens,
        index: 0,
        config: config.clone(),
    };
    let result = parser.want_query()?;
    parser.want(TokenKind::Eof)?;
    Ok(result)
}

struct Parser {
    tokens: Vec<Token>,
    index: usize,
    config: Config,
}

/// An item of the shunting-yard output queue: either a finished
/// sub-expression or an operator awaiting its two operands, mirroring the
/// Go parser's `queue []expression.Expression` where operator tokens are
/// eagerly converted to empty `BinaryOp` nodes (`tokenStack.popAsExpr`).
enum QueueItem {
    Val(Expr),
    Op(Operator),
}

#[derive(Clone, Copy)]
enum OpStackItem {
    LParen,
    Op(Operator),
}

impl Parser {
    fn cur(&self) -> &Token {
        &self.tokens[self.index]
    }

    fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }

    fn got(&mut self, kind: TokenKind) -> bool {
        if self.cur().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn want(&mut self, kind: TokenKind) -> Result<()> {
        if self.got(kind.clone()) {
            Ok(())
        } else {
            Err(self.expect_err(&kind.to_string()))
        }
    }

    fn back(&mut self) {
        if self.index != 0 {
            self.index -= 1;
        }
    }

    fn expect_err(&self, msg: &str) -> Error {
        let tok = self.cur();
        Error::parse(format!("expect {msg}, got {}", tok.kind), tok.position)
    }

    fn got_name(&mut self) -> Option<String> {
        if let TokenKind::Name(n) = &self.cur().kind {
            let n = n.clone();
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn want_name(&mut self) -> Result<String> {
        self.got_name().ok_or_else(|| self.expect_err("name"))
    }

    fn got_function(&mut self) -> Option<String> {
        if let TokenKind::Function(n) = &self.cur().kind {
            let n = n.clone();
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn got_int_lit(&mut self) -> Option<i64> {
        if let TokenKind::IntLit(n) = self.cur().kind {
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn got_float_lit(&mut self) -> Option<f64> {
        if let TokenKind::FloatLit(n) = self.cur().kind {
            self.advance();
            Some(n)
        } else {
            None
        }
    }

    fn got_string_lit(&mut self) -> Option<String> {
        if let TokenKind::StringLit(s) = &self.cur().kind {
            let s = s.clone();
            self.advance();
            Some(s)
        } else {
            None
        }
    }

    fn got_boolean_lit(&mut self) -> Option<bool> {
        if let TokenKind::BooleanLit(b) = self.cur().kind {
            self.advance();
            Some(b)
        } else {
            None
        }
    }

    fn want_int_lit(&mut self) -> Result<i64> {
        self.got_int_lit().ok_or_else(|| self.expect_err("intLit"))
    }

    fn want_query(&mut self) -> Result<LogicalPlan> {
        let mut plans = vec![self.want_select()?];
        while self.got(TokenKind::Union) {
            self.want(TokenKind::All)?;
            plans.push(self.want_select()?);
        }
        if plans.len() == 1 {
            Ok(plans.into_iter().next().unwrap())
        } else {
            Ok(LogicalPlan::Union(Union { children: plans }))
        }
    }

    fn want_select(&mut self) -> Result<LogicalPlan> {
        self.got(TokenKind::Select);
        let select_list = self.want_expression_list(true)?;
        self.want(TokenKind::From)?;
        let data_source = self.want_source()?;

        let has_filter = self.got(TokenKind::Where);
        let child = if has_filter {
            let condition = self.want_expression()?;
            LogicalPlan::Filter(Filter {
                condition,
                child: Box::new(data_source),
            })
        } else {
            data_source
        };

        let mut root = if self.got(TokenKind::Group) {
            self.want(TokenKind::By)?;
            let group_exprs = self.want_expression_list(false)?;
            LogicalPlan::Aggregate(Aggregate::new(child, group_exprs, select_list))
        } else {
            LogicalPlan::Project(Project::new(select_list, child))
        };

        if self.got(TokenKind::Order) {
            self.want(TokenKind::By)?;
            let mut orders = vec![self.want_sort_order()?];
            while self.got(TokenKind::Comma) {
                orders.push(self.want_sort_order()?);
            }
            root = LogicalPlan::Sort(Sort {
                child: Box::new(root),
                order: orders,
            });
        }

        if self.got(TokenKind::Limit) {
            let count = self.want_int_lit()? as usize;
            root = LogicalPlan::Limit(Limit {
                child: Box::new(root),
                count,
            });
        }

        Ok(root)
    }

    fn want_sort_order(&mut self) -> Result<SortOrder> {
        let expr = self.want_expression()?;
        let reverse = if self.got(TokenKind::Desc) {
            true
        } else {
            self.got(TokenKind::Asc);
            false
        };
        Ok(SortOrder { expr, reverse })
    }

    fn want_source(&mut self) -> Result<LogicalPlan> {
        let input = match self.got_string_lit() {
            Some(s) => Some(s),
            None => self.got_name(),
        };
        if let Some(input) = input {
            let alias = if self.got(TokenKind::As) {
                Some(self.want_name()?)
            } else {
                None
            };
            let source = quill_plan::source::build(&self.config, &input)?;
            return Ok(LogicalPlan::Relation(Relation {
                input,
                alias,
                source,
                push_down_predicate: RefCell::new(Vec::new()),
            }));
        }
        self.want(TokenKind::LParen)?;
        let subquery = self.want_query()?;
        self.want(TokenKind::RParen)?;
        self.want(TokenKind::As)?;
        let alias = self.want_name()?;
        Ok(LogicalPlan::Subquery(Subquery::new(subquery, alias)))
    }

    fn want_expression_list(&mut self, is_project: bool) -> Result<Vec<Expr>> {
        let mut result = vec![self.get_expr(is_project)?];
        while self.got(TokenKind::Comma) {
            result.push(self.get_expr(is_project)?);
        }
        Ok(result)
    }

    /// One item of a select list or a `group by`/function-argument list.
    /// Only a select list (`is_project`) allows a bare `*` or `table.*`.
    fn get_expr(&mut self, is_project: bool) -> Result<Expr> {
        if is_project {
            if self.got(TokenKind::Star) {
                return Ok(Expr::Star(None));
            }
            if let Some(name) = self.got_name() {
                if let Some(table) = name.strip_suffix('.') {
                    let table = table.to_string();
                    self.want(TokenKind::Star)?;
                    return Ok(Expr::Star(Some(table)));
                }
                self.back();
            }
        }
        let e = self.want_expression()?;
        if is_project {
            self.may_alias(e)
        } else {
            Ok(e)
        }
    }

    fn may_alias(&mut self, child: Expr) -> Result<Expr> {
        if self.got(TokenKind::As) {
            let name = self.want_name()?;
            Ok(Expr::Alias {
                expr: Box::new(child),
                name,
            })
        } else {
            Ok(child)
        }
    }

    /// The shunting-yard expression parser. Ported from
    /// `original_source/parser/parser.go::wantExpression`.
    fn want_expression(&mut self) -> Result<Expr> {
        let start_pos = self.cur().position;
        let mut op_stack: Vec<OpStackItem> = Vec::new();
        let mut queue: Vec<QueueItem> = Vec::new();

        loop {
            let need_break = matches!(
                self.cur().kind,
                TokenKind::Comma | TokenKind::Eof | TokenKind::From | TokenKind::As
            );
            if need_break {
                break;
            }

            if let Some(lit) = self.want_lit(false)? {
                queue.push(QueueItem::Val(lit));
            } else if let Some(name) = self.got_name() {
                queue.push(QueueItem::Val(Expr::attribute(name)));
            } else if self.got(TokenKind::If) {
                queue.push(QueueItem::Val(self.want_if()?));
            } else if self.got(TokenKind::Cast) {
                queue.push(QueueItem::Val(self.want_cast()?));
            } else if self.got(TokenKind::Case) {
                queue.push(QueueItem::Val(self.want_case_when()?));
            } else if let Some(name) = self.got_function() {
                queue.push(QueueItem::Val(self.want_function(name)?));
            } else if self.got(TokenKind::LParen) {
                op_stack.push(OpStackItem::LParen);
            } else if self.got(TokenKind::RParen) {
                let mut has_lparen = false;
                while let Some(top) = op_stack.pop() {
                    match top {
                        OpStackItem::LParen => {
                            has_lparen = true;
                            break;
                        }
                        OpStackItem::Op(op) => queue.push(QueueItem::Op(op)),
                    }
                }
                if !has_lparen {
                    if op_stack.is_empty() && queue.len() == 1 {
                        self.back();
                        return queue_into_single_expr(queue, start_pos);
                    } else if op_stack.is_empty() {
                        self.back();
                        break;
                    } else {
                        return Err(Error::parse("expect '(', expression start", start_pos));
                    }
                }
            } else if self.got(TokenKind::Not) {
                if self.got(TokenKind::In) {
                    self.parse_in(&mut queue, start_pos)?;
                } else if self.got(TokenKind::Like) {
                    self.parse_like(&mut queue, start_pos)?;
                } else {
                    return Err(Error::parse("expect 'in', 'like' after 'not'", start_pos));
                }
                negate_last(&mut queue, start_pos)?;
            } else if self.got(TokenKind::In) {
                self.parse_in(&mut queue, start_pos)?;
            } else if self.got(TokenKind::Like) {
                self.parse_like(&mut queue, start_pos)?;
            } else if self.got(TokenKind::Is) {
                let neg = self.got(TokenKind::Not);
                self.want(TokenKind::Null)?;
                let attr_name = pop_attribute_name(&mut queue, start_pos, "before 'is'")?;
                let mut expr = Expr::IsNull(Box::new(Expr::attribute(attr_name)));
                if neg {
                    expr = Expr::Not(Box::new(expr));
                }
                queue.push(QueueItem::Val(expr));
            } else if let Some(op) = binary_operator(&self.cur().kind) {
                self.advance();
                push_operator(&mut op_stack, &mut queue, op);
            } else {
                break;
            }
        }

        while let Some(top) = op_stack.pop() {
            if let OpStackItem::Op(op) = top {
                queue.push(QueueItem::Op(op));
            }
        }

        let mut expr_stack: Vec<Expr> = Vec::new();
        for item in queue {
            match item {
                QueueItem::Op(op) => {
                    let right = expr_stack
                        .pop()
                        .ok_or_else(|| Error::parse("expression is illegal", start_pos))?;
                    let left = expr_stack
                        .pop()
                        .ok_or_else(|| Error::parse("expression is illegal", start_pos))?;
                    expr_stack.push(Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    });
                }
                QueueItem::Val(e) => expr_stack.push(e),
            }
        }
        if expr_stack.len() != 1 {
            return Err(Error::parse("expression is illegal", start_pos));
        }
        Ok(expr_stack.pop().unwrap())
    }

    fn want_lit(&mut self, need_err: bool) -> Result<Option<Expr>> {
        if self.got(TokenKind::Null) {
            return Ok(Some(Expr::Literal(ScalarValue::null_of(DataType::Int))));
        }
        if let Some(n) = self.got_int_lit() {
            return Ok(Some(Expr::Literal(ScalarValue::Int(Some(n)))));
        }
        if let Some(n) = self.got_float_lit() {
            return Ok(Some(Expr::Literal(ScalarValue::Float(Some(n)))));
        }
        if let Some(s) = self.got_string_lit() {
            return Ok(Some(Expr::Literal(ScalarValue::String(Some(s)))));
        }
        if let Some(b) = self.got_boolean_lit() {
            return Ok(Some(Expr::Literal(ScalarValue::Boolean(Some(b)))));
        }
        if need_err {
            Err(self.expect_err("literal"))
        } else {
            Ok(None)
        }
    }

    fn want_function(&mut self, name: String) -> Result<Expr> {
        self.want(TokenKind::LParen)?;
        if self.got(TokenKind::Star) {
            self.want(TokenKind::RParen)?;
            return quill_expr::functions::build(&name, vec![Expr::Literal(ScalarValue::Int(Some(1)))]);
        }
        let args = self.want_expression_list(false)?;
        self.want(TokenKind::RParen)?;
        quill_expr::functions::build(&name, args)
    }

    fn parse_like(&mut self, queue: &mut Vec<QueueItem>, start_pos: Position) -> Result<()> {
        let attr_name = pop_attribute_name(queue, start_pos, "before 'like'")?;
        let right = if let Some(s) = self.got_string_lit() {
            Expr::Literal(ScalarValue::String(Some(s)))
        } else if let Some(name) = self.got_function() {
            self.want_function(name)?
        } else {
            return Err(self.expect_err("string or function after 'like'"));
        };
        queue.push(QueueItem::Val(Expr::Like {
            left: Box::new(Expr::attribute(attr_name)),
            right: Box::new(right),
        }));
        Ok(())
    }

    fn parse_in(&mut self, queue: &mut Vec<QueueItem>, start_pos: Position) -> Result<()> {
        self.want(TokenKind::LParen)?;
        let mut list = vec![self.want_lit(true)?.expect("want_lit(true) never returns None")];
        while self.got(TokenKind::Comma) {
            list.push(self.want_lit(true)?.expect("want_lit(true) never returns None"));
        }
        self.want(TokenKind::RParen)?;
        let attr_name = pop_attribute_name(queue, start_pos, "before 'in'")?;
        queue.push(QueueItem::Val(Expr::In {
            value: Box::new(Expr::attribute(attr_name)),
            list,
        }));
        Ok(())
    }

    fn want_if(&mut self) -> Result<Expr> {
        self.want(TokenKind::LParen)?;
        let predicate = self.want_expression()?;
        self.want(TokenKind::Comma)?;
        let if_true = self.want_expression()?;
        self.want(TokenKind::Comma)?;
        let if_false = self.want_expression()?;
        self.want(TokenKind::RParen)?;
        Ok(Expr::If {
            predicate: Box::new(predicate),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        })
    }

    fn want_cast(&mut self) -> Result<Expr> {
        self.want(TokenKind::LParen)?;
        let expr = self.want_expression()?;
        self.want(TokenKind::As)?;
        let data_type = if self.got(TokenKind::Double) {
            DataType::Float
        } else if self.got(TokenKind::StringKw) {
            DataType::String
        } else {
            // `bigint` is the default when the type token after `as` is
            // omitted entirely; consume it if present, but don't require it.
            self.got(TokenKind::Bigint);
            DataType::Int
        };
        self.want(TokenKind::RParen)?;
        Ok(Expr::Cast {
            expr: Box::new(expr),
            data_type,
        })
    }

    fn want_case_when(&mut self) -> Result<Expr> {
        let mut branches = Vec::new();
        let mut else_branch = None;
        loop {
            if self.got(TokenKind::When) {
                let when = self.want_expression()?;
                self.want(TokenKind::Then)?;
                let then = self.want_expression()?;
                branches.push(CaseBranch { when, then });
            } else if self.got(TokenKind::Else) {
                else_branch = Some(Box::new(self.want_expression()?));
            } else if self.got(TokenKind::End) {
                break;
            } else {
                return Err(self.expect_err("'when', 'else' or 'end'"));
            }
        }
        Ok(Expr::CaseWhen {
            branches,
            else_branch,
        })
    }
}

fn negate_last(queue: &mut Vec<QueueItem>, start_pos: Position) -> Result<()> {
    match queue.pop() {
        Some(QueueItem::Val(e)) => {
            queue.push(QueueItem::Val(Expr::Not(Box::new(e))));
            Ok(())
        }
        _ => Err(Error::parse("expression is illegal", start_pos)),
    }
}

fn pop_attribute_name(queue: &mut Vec<QueueItem>, start_pos: Position, context: &str) -> Result<String> {
    match queue.pop() {
        Some(QueueItem::Val(Expr::Attribute(Attribute { name, .. }))) => Ok(name),
        _ => Err(Error::parse(format!("expect attribute {context}"), start_pos)),
    }
}

fn queue_into_single_expr(mut queue: Vec<QueueItem>, start_pos: Position) -> Result<Expr> {
    match queue.pop() {
        Some(QueueItem::Val(e)) if queue.is_empty() => Ok(e),
        _ => Err(Error::parse("expression is illegal", start_pos)),
    }
}

fn binary_operator(kind: &TokenKind) -> Option<Operator> {
    Some(match kind {
        TokenKind::Plus => Operator::Plus,
        TokenKind::Minus => Operator::Minus,
        TokenKind::Star => Operator::Multiply,
        TokenKind::Slash => Operator::Divide,
        TokenKind::Percent => Operator::Modulo,
        TokenKind::Eq => Operator::Eq,
        TokenKind::NotEq => Operator::NotEq,
        TokenKind::Lt => Operator::Lt,
        TokenKind::Gt => Operator::Gt,
        TokenKind::LtEq => Operator::LtEq,
        TokenKind::GtEq => Operator::GtEq,
        TokenKind::And => Operator::And,
        TokenKind::Or => Operator::Or,
        _ => return None,
    })
}

fn op_precedence(op: Operator) -> u8 {
    match op {
        Operator::Or => 1,
        Operator::And => 2,
        Operator::Eq | Operator::NotEq | Operator::Lt | Operator::LtEq | Operator::Gt | Operator::GtEq => 3,
        Operator::Plus | Operator::Minus => 4,
        Operator::Multiply | Operator::Divide | Operator::Modulo => 5,
    }
}

/// Pushes `op` onto the operator stack, first draining every stacked
/// operator of equal or higher precedence into the output queue. Ported
/// from `wantExpression`'s inline precedence-climbing block.
fn push_operator(op_stack: &mut Vec<OpStackItem>, queue: &mut Vec<QueueItem>, op: Operator) {
    loop {
        match op_stack.last().copied() {
            None => break,
            Some(OpStackItem::LParen) => {
                op_stack.push(OpStackItem::Op(op));
                return;
            }
            Some(OpStackItem::Op(top_op)) => {
                if op_precedence(op) > op_precedence(top_op) {
                    op_stack.push(OpStackItem::Op(op));
                    return;
                }
                op_stack.pop();
                queue.push(QueueItem::Op(top_op));
            }
        }
    }
    op_stack.push(OpStackItem::Op(op));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::default()
    }

    fn parse_over_vec_source(sql: &str) -> Result<LogicalPlan> {
        parse(sql, &cfg())
    }

    #[test]
    fn parses_simple_select() {
        let plan = parse_over_vec_source("select a, b from /tmp").unwrap();
        assert!(matches!(plan, LogicalPlan::Project(_)));
    }

    #[test]
    fn parses_where_and_group_by() {
        let plan = parse_over_vec_source("select a, count(b) from /tmp where a > 1 group by a").unwrap();
        assert!(matches!(plan, LogicalPlan::Aggregate(_)));
    }

    #[test]
    fn parses_order_by_desc_and_limit() {
        let plan = parse_over_vec_source("select a from /tmp order by a desc limit 10").unwrap();
        match plan {
            LogicalPlan::Limit(limit) => {
                assert_eq!(limit.count, 10);
                assert!(matches!(*limit.child, LogicalPlan::Sort(_)));
            }
            other => panic!("expected Limit, got {other:?}"),
        }
    }

    #[test]
    fn parses_union_all() {
        let plan = parse_over_vec_source("select a from /tmp union all select a from /tmp").unwrap();
        assert!(matches!(plan, LogicalPlan::Union(_)));
    }

    #[test]
    fn parses_arithmetic_precedence() {
        let plan = parse_over_vec_source("select 1 + 2 * 3 from /tmp").unwrap();
        let LogicalPlan::Project(project) = plan else {
            panic!("expected Project")
        };
        match &project.project_list[0] {
            Expr::Binary {
                op: Operator::Plus,
                right,
                ..
            } => {
                assert!(matches!(right.as_ref(), Expr::Binary { op: Operator::Multiply, .. }));
            }
            other => panic!("expected top-level '+', got {other:?}"),
        }
    }

    #[test]
    fn parses_count_star() {
        let plan = parse_over_vec_source("select count(*) from /tmp").unwrap();
        let LogicalPlan::Aggregate(agg) = plan else {
            panic!("expected Aggregate")
        };
        match &agg.aggregate_exprs[0] {
            Expr::AggregateFunction { name, args } => {
                assert_eq!(name, "count");
                assert!(matches!(args[0], Expr::Literal(ScalarValue::Int(Some(1)))));
            }
            other => panic!("expected count(1), got {other:?}"),
        }
    }

    #[test]
    fn parses_is_not_null() {
        let plan = parse_over_vec_source("select a from /tmp where a is not null").unwrap();
        let LogicalPlan::Project(project) = plan else {
            panic!("expected Project")
        };
        let LogicalPlan::Filter(filter) = project.child.as_ref() else {
            panic!("expected Filter")
        };
        assert!(matches!(filter.condition, Expr::Not(_)));
    }

    #[test]
    fn parses_not_in_list() {
        let plan = parse_over_vec_source("select a from /tmp where a not in (1, 2, 3)").unwrap();
        let LogicalPlan::Project(project) = plan else {
            panic!("expected Project")
        };
        let LogicalPlan::Filter(filter) = project.child.as_ref() else {
            panic!("expected Filter")
        };
        match &filter.condition {
            Expr::Not(inner) => assert!(matches!(inner.as_ref(), Expr::In { .. })),
            other => panic!("expected not(in(...)), got {other:?}"),
        }
    }

    #[test]
    fn parses_star_projection() {
        let plan = parse_over_vec_source("select * from /tmp").unwrap();
        let LogicalPlan::Project(project) = plan else {
            panic!("expected Project")
        };
        assert!(matches!(project.project_list[0], Expr::Star(None)));
    }

    #[test]
    fn parses_qualified_star_projection() {
        let plan = parse_over_vec_source("select t.* from /tmp as t").unwrap();
        let LogicalPlan::Project(project) = plan else {
            panic!("expected Project")
        };
        assert!(matches!(&project.project_list[0], Expr::Star(Some(t)) if t == "t"));
    }
}
