use crate::expr::Expr;

impl Expr {
    /// Renders a SQL-ish textual form of this expression.
    ///
    /// Used for two purposes beyond diagnostics: it is the fallback
    /// output-column name when a projection item carries no alias, and it
    /// is the string `ExprProxy` compares against group-key schema field
    /// names to decide whether it is looking at a group key reference.
    ///
    /// `Attribute` prints as its bare resolved name (not the original
    /// source's `"#" + name` form) so that the common case — grouping and
    /// projecting the same bare column — produces that column's own name
    /// as the output field name with no further rewriting needed.
    pub fn print(&self) -> String {
        match self {
            Expr::Literal(v) => v.to_string(),
            Expr::Attribute(attr) => attr.name.clone(),
            Expr::Star(Some(table)) => format!("{table}.*"),
            Expr::Star(None) => "*".to_string(),
            Expr::Binary { op, left, right } => {
                format!("({} {} {})", left.print(), op.symbol(), right.print())
            }
            Expr::Not(e) => format!("not ({})", e.print()),
            Expr::IsNull(e) => format!("({} is null)", e.print()),
            Expr::In { value, list } => {
                let items: Vec<String> = list.iter().map(Expr::print).collect();
                format!("{} in ({})", value.print(), items.join(", "))
            }
            Expr::Like { left, right } => format!("({} like {})", left.print(), right.print()),
            Expr::Cast { expr, data_type } => format!("cast({} as {})", expr.print(), data_type),
            Expr::If {
                predicate,
                if_true,
                if_false,
            } => format!(
                "if({}, {}, {})",
                predicate.print(),
                if_true.print(),
                if_false.print()
            ),
            Expr::CaseWhen {
                branches,
                else_branch,
            } => {
                let mut s = String::from("case");
                for branch in branches {
                    s.push_str(&format!(" when {} then {}", branch.when.print(), branch.then.print()));
                }
                if let Some(e) = else_branch {
                    s.push_str(&format!(" else {}", e.print()));
                }
                s.push_str(" end");
                s
            }
            Expr::Alias { expr, name } => format!("{} as {}", expr.print(), name),
            Expr::ScalarFunction { name, args, .. } | Expr::AggregateFunction { name, args } => {
                let items: Vec<String> = args.iter().map(Expr::print).collect();
                format!("{}({})", name, items.join(", "))
            }
            Expr::Proxy(proxy) => proxy.inner_ref().print(),
        }
    }
}
