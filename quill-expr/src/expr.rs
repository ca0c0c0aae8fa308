use quill_common::{DataType, Result, ScalarValue};
use std::cell::Cell;
use std::fmt;

/// The binary operator carried by `Expr::Binary`.
///
/// Grounds on the original source's separate `And`/`Or`/`EqualTo`/... node
/// types, collapsed into one discriminant the way `datafusion_expr::Expr`
/// pairs a `BinaryExpr` struct with an `Operator` enum instead of one
/// struct per operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide | Operator::Modulo
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::NotEq | Operator::Lt | Operator::LtEq | Operator::Gt | Operator::GtEq
        )
    }
}

/// One `when ... then ...` arm of a `CASE WHEN` expression.
#[derive(Debug)]
pub struct CaseBranch {
    pub when: Expr,
    pub then: Expr,
}

/// A reference to a named column of the row being evaluated.
///
/// `idx` is filled in lazily the first time the attribute's schema is
/// derived against a concrete input schema (mirrors the original source's
/// `Attribute.idx` field, populated as a side effect of `GetSchema`).
#[derive(Debug)]
pub struct Attribute {
    pub name: String,
    pub idx: Cell<Option<usize>>,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            idx: Cell::new(None),
        }
    }
}

/// The expression tree.
///
/// Every variant supports evaluation (`eval`), schema derivation
/// (`schema`), printing (`print`) and child iteration (`children`,
/// `map_children`) — the four operations the original source's
/// `Expression` interface requires of every node.
#[derive(Debug)]
pub enum Expr {
    Literal(ScalarValue),
    Attribute(Attribute),
    /// `*` or `table.*` in a projection list; illegal anywhere else.
    Star(Option<String>),
    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    In {
        value: Box<Expr>,
        list: Vec<Expr>,
    },
    Like {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        data_type: DataType,
    },
    If {
        predicate: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    CaseWhen {
        branches: Vec<CaseBranch>,
        else_branch: Option<Box<Expr>>,
    },
    Alias {
        expr: Box<Expr>,
        name: String,
    },
    ScalarFunction {
        name: String,
        args: Vec<Expr>,
        /// Compiled-pattern cache for `regexp_extract`; unused by every
        /// other scalar function. Scoped to this single expression
        /// instance, matching the original source's per-expression
        /// `regxMap`.
        regex_cache: std::cell::RefCell<std::collections::HashMap<String, regex::Regex>>,
    },
    AggregateFunction {
        name: String,
        args: Vec<Expr>,
    },
    /// Inserted by the analyzer around every node of an `Aggregate`'s
    /// `AggregateExprs`. See `proxy` module.
    Proxy(crate::proxy::ExprProxy),
}

impl Expr {
    pub fn attribute(name: impl Into<String>) -> Expr {
        Expr::Attribute(Attribute::new(name))
    }

    pub fn literal(value: ScalarValue) -> Expr {
        Expr::Literal(value)
    }

    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::AggregateFunction { .. } => true,
            Expr::Proxy(p) => p.inner.is_aggregate(),
            _ => self.children().iter().any(|c| c.is_aggregate()),
        }
    }

    /// Borrowed child slots, in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Attribute(_) | Expr::Star(_) => vec![],
            Expr::Binary { left, right, .. } => vec![left, right],
            Expr::Not(e) | Expr::IsNull(e) => vec![e],
            Expr::In { value, list } => {
                let mut v = vec![value.as_ref()];
                v.extend(list.iter());
                v
            }
            Expr::Like { left, right } => vec![left, right],
            Expr::Cast { expr, .. } => vec![expr],
            Expr::If {
                predicate,
                if_true,
                if_false,
            } => vec![predicate, if_true, if_false],
            Expr::CaseWhen {
                branches,
                else_branch,
            } => {
                let mut v = vec![];
                for b in branches {
                    v.push(&b.when);
                    v.push(&b.then);
                }
                if let Some(e) = else_branch {
                    v.push(e.as_ref());
                }
                v
            }
            Expr::Alias { expr, .. } => vec![expr],
            Expr::ScalarFunction { args, .. } | Expr::AggregateFunction { args, .. } => {
                args.iter().collect()
            }
            Expr::Proxy(p) => vec![&p.inner],
        }
    }

    /// Rebuilds this node, post-order, by applying `f` to every child
    /// first and then to the resulting node itself.
    ///
    /// This is the idiomatic-Rust stand-in for the original source's
    /// `Transform(expr, fn)`, which mutates child pointers in place; here
    /// nodes without pointer-assignable slots are rebuilt instead.
    pub fn map_children(self, f: &mut impl FnMut(Expr) -> Result<Expr>) -> Result<Expr> {
        let rebuilt = match self {
            Expr::Literal(_) | Expr::Attribute(_) | Expr::Star(_) => self,
            Expr::Binary { op, left, right } => Expr::Binary {
                op,
                left: Box::new(left.map_children(f)?),
                right: Box::new(right.map_children(f)?),
            },
            Expr::Not(e) => Expr::Not(Box::new(e.map_children(f)?)),
            Expr::IsNull(e) => Expr::IsNull(Box::new(e.map_children(f)?)),
            Expr::In { value, list } => Expr::In {
                value: Box::new(value.map_children(f)?),
                list: list
                    .into_iter()
                    .map(|e| e.map_children(f))
                    .collect::<Result<_>>()?,
            },
            Expr::Like { left, right } => Expr::Like {
                left: Box::new(left.map_children(f)?),
                right: Box::new(right.map_children(f)?),
            },
            Expr::Cast { expr, data_type } => Expr::Cast {
                expr: Box::new(expr.map_children(f)?),
                data_type,
            },
            Expr::If {
                predicate,
                if_true,
                if_false,
            } => Expr::If {
                predicate: Box::new(predicate.map_children(f)?),
                if_true: Box::new(if_true.map_children(f)?),
                if_false: Box::new(if_false.map_children(f)?),
            },
            Expr::CaseWhen {
                branches,
                else_branch,
            } => Expr::CaseWhen {
                branches: branches
                    .into_iter()
                    .map(|b| {
                        Ok(CaseBranch {
                            when: b.when.map_children(f)?,
                            then: b.then.map_children(f)?,
                        })
                    })
                    .collect::<Result<_>>()?,
                else_branch: else_branch
                    .map(|e| e.map_children(f))
                    .transpose()?
                    .map(Box::new),
            },
            Expr::Alias { expr, name } => Expr::Alias {
                expr: Box::new(expr.map_children(f)?),
                name,
            },
            Expr::ScalarFunction { name, args, .. } => Expr::ScalarFunction {
                name,
                args: args
                    .into_iter()
                    .map(|e| e.map_children(f))
                    .collect::<Result<_>>()?,
                regex_cache: Default::default(),
            },
            Expr::AggregateFunction { name, args } => Expr::AggregateFunction {
                name,
                args: args
                    .into_iter()
                    .map(|e| e.map_children(f))
                    .collect::<Result<_>>()?,
            },
            Expr::Proxy(p) => {
                let inner = *p.inner;
                let new_inner = inner.map_children(f)?;
                Expr::Proxy(crate::proxy::ExprProxy {
                    inner: Box::new(new_inner),
                    group_schema: p.group_schema,
                    key_index: p.key_index,
                })
            }
        };
        f(rebuilt)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print())
    }
}
