//! Expressions, predicates and output columns used by plan stages.
//!
//! Identifiers and [`Expr::Raw`] fragments are written by the chart catalog
//! and never carry request input. Anything that comes from a request goes
//! through [`Expr::Param`] and is sent to the store as a bound parameter.

/// A value sent to the store as a typed query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    UInt(u64),
    StrList(Vec<String>),
}

impl Value {
    /// Store type used in the `{name:Type}` placeholder.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "String",
            Value::UInt(_) => "UInt64",
            Value::StrList(_) => "Array(String)",
        }
    }

    /// Text form of the value for the `param_<name>` request field.
    ///
    /// Parameters are parsed in the escaped text format, so backslashes and
    /// control characters are escaped; array items are quoted literals.
    pub fn to_param_text(&self) -> String {
        match self {
            Value::Str(s) => escape_text(s),
            Value::UInt(n) => n.to_string(),
            Value::StrList(items) => {
                let quoted: Vec<String> = items.iter().map(|s| quote(s)).collect();
                format!("[{}]", quoted.join(","))
            }
        }
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Single-quoted string literal with backslash escaping.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Arithmetic and comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "=",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }
}

/// Scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column or alias reference, optionally qualified (`L.userId`)
    Column(String),
    /// Inline numeric literal
    Int(i64),
    /// Inline string literal (catalog constants only)
    Str(String),
    /// Store-native expression text, rendered verbatim
    Raw(String),
    /// Bound query parameter
    Param(Value),
    /// Function call
    Func(String, Vec<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    /// Window aggregate
    Window(Box<WindowFn>),
}

/// Column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column(name.to_string())
}

/// Inline integer literal.
pub fn int(n: i64) -> Expr {
    Expr::Int(n)
}

/// Inline string literal.
pub fn lit(s: &str) -> Expr {
    Expr::Str(s.to_string())
}

/// Verbatim store-native fragment.
pub fn raw(sql: &str) -> Expr {
    Expr::Raw(sql.to_string())
}

/// Bound string parameter.
pub fn param_str(s: &str) -> Expr {
    Expr::Param(Value::Str(s.to_string()))
}

/// Bound unsigned parameter.
pub fn param_u64(n: u64) -> Expr {
    Expr::Param(Value::UInt(n))
}

/// Function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Func(name.to_string(), args)
}

/// `count()`
pub fn count() -> Expr {
    func("count", vec![])
}

impl Expr {
    fn binary(self, op: BinOp, rhs: Expr) -> Expr {
        Expr::Binary(Box::new(self), op, Box::new(rhs))
    }

    pub fn equal_to(self, rhs: Expr) -> Predicate {
        Predicate::Compare(self.binary(BinOp::Eq, rhs))
    }

    pub fn not_equal_to(self, rhs: Expr) -> Predicate {
        Predicate::Compare(self.binary(BinOp::Ne, rhs))
    }

    pub fn less_than(self, rhs: Expr) -> Predicate {
        Predicate::Compare(self.binary(BinOp::Lt, rhs))
    }

    pub fn greater_than(self, rhs: Expr) -> Predicate {
        Predicate::Compare(self.binary(BinOp::Gt, rhs))
    }

    /// Comparison usable as a value (e.g. inside `if`).
    pub fn equals(self, rhs: Expr) -> Expr {
        self.binary(BinOp::Eq, rhs)
    }

    /// Name this expression in the stage output.
    pub fn named(self, alias: &str) -> Column {
        Column {
            expr: self,
            alias: Some(alias.to_string()),
        }
    }

    /// Visit this expression and every sub-expression.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Func(_, args) => {
                for arg in args {
                    arg.walk(visit);
                }
            }
            Expr::Binary(l, _, r) => {
                l.walk(visit);
                r.walk(visit);
            }
            Expr::Window(w) => {
                w.arg.walk(visit);
                for expr in &w.partition_by {
                    expr.walk(visit);
                }
                for key in &w.order_by {
                    key.expr.walk(visit);
                }
            }
            _ => {}
        }
    }
}

macro_rules! arithmetic {
    ($($trait:ident $method:ident $op:ident),*) => {
        $(
            impl std::ops::$trait for Expr {
                type Output = Expr;

                fn $method(self, rhs: Expr) -> Expr {
                    self.binary(BinOp::$op, rhs)
                }
            }
        )*
    };
}

arithmetic!(Add add Add, Sub sub Sub, Mul mul Mul, Div div Div);

/// Filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Boolean comparison expression
    Compare(Expr),
    /// Membership in a bound list; `negated` turns it into exclusion
    InList {
        expr: Expr,
        values: Vec<String>,
        negated: bool,
    },
    /// Store-native boolean fragment
    Raw(String),
}

impl Predicate {
    pub fn in_list(expr: Expr, values: Vec<String>) -> Self {
        Predicate::InList {
            expr,
            values,
            negated: false,
        }
    }

    pub fn not_in_list(expr: Expr, values: Vec<String>) -> Self {
        Predicate::InList {
            expr,
            values,
            negated: true,
        }
    }
}

/// Aggregate applied over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAgg {
    Sum,
    Avg,
}

/// Window frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// No frame clause: the whole partition, or the store default when ordered
    Partition,
    /// `ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW`
    Running,
    /// `ROWS BETWEEN n PRECEDING AND CURRENT ROW`
    Trailing(u32),
}

/// Sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub expr: Expr,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            descending: false,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            descending: true,
        }
    }
}

/// Window aggregate: `agg(arg) OVER (PARTITION BY .. ORDER BY .. frame)`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFn {
    pub agg: WindowAgg,
    pub arg: Expr,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderKey>,
    pub frame: Frame,
}

impl WindowFn {
    pub fn sum(arg: Expr) -> Self {
        Self::new(WindowAgg::Sum, arg)
    }

    pub fn avg(arg: Expr) -> Self {
        Self::new(WindowAgg::Avg, arg)
    }

    fn new(agg: WindowAgg, arg: Expr) -> Self {
        Self {
            agg,
            arg,
            partition_by: Vec::new(),
            order_by: Vec::new(),
            frame: Frame::Partition,
        }
    }

    pub fn partition_by(mut self, expr: Expr) -> Self {
        self.partition_by.push(expr);
        self
    }

    pub fn order_by(mut self, key: OrderKey) -> Self {
        self.order_by.push(key);
        self
    }

    /// Cumulative from the first row of the partition to the current row.
    pub fn running(mut self) -> Self {
        self.frame = Frame::Running;
        self
    }

    /// The current row and the `n` rows before it.
    pub fn trailing(mut self, n: u32) -> Self {
        self.frame = Frame::Trailing(n);
        self
    }

    pub fn named(self, alias: &str) -> Column {
        Expr::from(self).named(alias)
    }
}

impl From<WindowFn> for Expr {
    fn from(w: WindowFn) -> Self {
        Expr::Window(Box::new(w))
    }
}

/// An output column: expression plus optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl From<Expr> for Column {
    fn from(expr: Expr) -> Self {
        Self { expr, alias: None }
    }
}

/// Unaliased column reference, the common case for pass-through outputs.
pub fn keep(name: &str) -> Column {
    Column::from(col(name))
}
