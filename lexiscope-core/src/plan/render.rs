//! Plan rendering
//!
//! Stages are folded into `SELECT` blocks. A stage folds into the block
//! built for its input when the resulting query keeps the stage order;
//! otherwise the input block becomes a derived table and the stage starts a
//! new block on top of it.

use super::expr::{Column, Expr, Frame, OrderKey, Predicate, Value, WindowAgg};
use super::{JoinKind, Sample, Scan, Stage};

/// Query text plus the parameters it references.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<BoundParam>,
}

/// A named, typed query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub name: String,
    pub value: Value,
}

pub(super) fn render(stage: &Stage) -> RenderedQuery {
    let block = build(stage);
    let mut renderer = Renderer::default();
    let sql = renderer.block(&block);
    RenderedQuery {
        sql,
        params: renderer.params,
    }
}

enum Source {
    Table(Scan),
    Derived(Box<Block>),
    Join {
        left: Box<Block>,
        right: Box<Block>,
        kind: JoinKind,
        on: Vec<(String, String)>,
    },
}

struct Block {
    source: Source,
    /// `*` precedes the select list (window over an unprojected input)
    star: bool,
    select: Vec<Column>,
    filters: Vec<Predicate>,
    group_by: Option<Vec<Expr>>,
    having: Vec<Predicate>,
    windowed: bool,
    order_by: Vec<OrderKey>,
    limit: Option<u64>,
}

impl Block {
    fn over(source: Source) -> Self {
        Self {
            source,
            star: false,
            select: Vec::new(),
            filters: Vec::new(),
            group_by: None,
            having: Vec::new(),
            windowed: false,
            order_by: Vec::new(),
            limit: None,
        }
    }

    fn wrap(self) -> Self {
        Self::over(Source::Derived(Box::new(self)))
    }

    /// Nothing selected, grouped, ordered or limited yet: only a source and
    /// filters.
    fn is_plain(&self) -> bool {
        !self.star
            && self.select.is_empty()
            && self.group_by.is_none()
            && self.order_by.is_empty()
            && self.limit.is_none()
    }

    /// A bare table reference, usable directly as a join side.
    fn bare_table(&self) -> Option<&Scan> {
        match &self.source {
            Source::Table(scan) if self.is_plain() && self.filters.is_empty() && scan.sample.is_none() => {
                Some(scan)
            }
            _ => None,
        }
    }

    fn plain(self) -> Self {
        if self.is_plain() {
            self
        } else {
            self.wrap()
        }
    }
}

fn has_window(columns: &[Column]) -> bool {
    columns.iter().any(|c| {
        let mut found = false;
        c.expr.walk(&mut |e| {
            if matches!(e, Expr::Window(_)) {
                found = true;
            }
        });
        found
    })
}

fn build(stage: &Stage) -> Block {
    match stage {
        Stage::Scan(scan) => Block::over(Source::Table(scan.clone())),
        Stage::Filter { input, predicate } => {
            let mut block = build(input).plain();
            block.filters.push(predicate.clone());
            block
        }
        Stage::Group {
            input,
            keys,
            aggregates,
            having,
        } => {
            let mut block = build(input).plain();
            block.group_by = Some(keys.iter().map(|k| k.expr.clone()).collect());
            block.select = keys.iter().chain(aggregates).cloned().collect();
            block.having = having.clone();
            block.windowed = has_window(&block.select);
            block
        }
        Stage::Window { input, columns } => {
            let mut block = build(input);
            if block.limit.is_some() || block.windowed {
                block = block.wrap();
            }
            if block.select.is_empty() {
                block.star = true;
            }
            block.select.extend(columns.iter().cloned());
            block.windowed = true;
            block
        }
        Stage::Project { input, columns } => {
            let mut block = build(input).plain();
            block.select = columns.clone();
            block.windowed = has_window(columns);
            block
        }
        Stage::Join {
            left,
            right,
            kind,
            on,
        } => Block::over(Source::Join {
            left: Box::new(build(left)),
            right: Box::new(build(right)),
            kind: *kind,
            on: on.clone(),
        }),
        Stage::Order { input, keys } => {
            let mut block = build(input);
            if block.limit.is_some() {
                block = block.wrap();
            }
            block.order_by.extend(keys.iter().cloned());
            block
        }
        Stage::Limit { input, count } => {
            let mut block = build(input);
            if block.limit.is_some() {
                block = block.wrap();
            }
            block.limit = Some(*count);
            block
        }
    }
}

#[derive(Default)]
struct Renderer {
    params: Vec<BoundParam>,
}

impl Renderer {
    fn block(&mut self, block: &Block) -> String {
        let mut select: Vec<String> = Vec::new();
        if block.star || block.select.is_empty() {
            select.push("*".to_string());
        }
        for column in &block.select {
            select.push(self.column(column));
        }

        let mut sql = format!("SELECT {} FROM {}", select.join(", "), self.source(&block.source));

        if !block.filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conjunction(&block.filters));
        }
        if let Some(keys) = &block.group_by {
            if !keys.is_empty() {
                let keys: Vec<String> = keys.iter().map(|k| self.expr(k)).collect();
                sql.push_str(" GROUP BY ");
                sql.push_str(&keys.join(", "));
            }
        }
        if !block.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.conjunction(&block.having));
        }
        if !block.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_keys(&block.order_by));
        }
        if let Some(limit) = block.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    fn source(&mut self, source: &Source) -> String {
        match source {
            Source::Table(scan) => {
                let mut sql = scan.table.sql();
                match scan.sample {
                    Some(Sample::Fraction(f)) => sql.push_str(&format!(" SAMPLE {}", f)),
                    Some(Sample::Rows(n)) => sql.push_str(&format!(" SAMPLE {}", n)),
                    None => {}
                }
                sql
            }
            Source::Derived(inner) => format!("({})", self.block(inner)),
            Source::Join {
                left,
                right,
                kind,
                on,
            } => {
                let mut sql = format!(
                    "{} AS L {} {} AS R",
                    self.join_side(left),
                    kind.as_str(),
                    self.join_side(right)
                );
                if !on.is_empty() {
                    let pairs: Vec<String> = on
                        .iter()
                        .map(|(l, r)| format!("L.{} = R.{}", l, r))
                        .collect();
                    sql.push_str(" ON ");
                    sql.push_str(&pairs.join(" AND "));
                }
                sql
            }
        }
    }

    fn join_side(&mut self, block: &Block) -> String {
        match block.bare_table() {
            Some(scan) => scan.table.sql(),
            None => format!("({})", self.block(block)),
        }
    }

    fn column(&mut self, column: &Column) -> String {
        let expr = self.expr(&column.expr);
        match (&column.expr, &column.alias) {
            (Expr::Column(name), Some(alias)) if name == alias => expr,
            (_, Some(alias)) => format!("{} AS {}", expr, alias),
            (_, None) => expr,
        }
    }

    fn conjunction(&mut self, predicates: &[Predicate]) -> String {
        let parts: Vec<String> = predicates.iter().map(|p| self.predicate(p)).collect();
        if parts.len() == 1 {
            parts.into_iter().collect()
        } else {
            parts
                .iter()
                .map(|p| format!("({})", p))
                .collect::<Vec<_>>()
                .join(" AND ")
        }
    }

    fn predicate(&mut self, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Compare(expr) => self.expr(expr),
            Predicate::InList {
                expr,
                values,
                negated,
            } => {
                let list = self.bind(Value::StrList(values.clone()));
                let expr = self.expr(expr);
                if *negated {
                    format!("NOT has({}, {})", list, expr)
                } else {
                    format!("has({}, {})", list, expr)
                }
            }
            Predicate::Raw(sql) => sql.clone(),
        }
    }

    fn order_keys(&mut self, keys: &[OrderKey]) -> String {
        keys.iter()
            .map(|k| {
                let expr = self.expr(&k.expr);
                if k.descending {
                    format!("{} DESC", expr)
                } else {
                    format!("{} ASC", expr)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn bind(&mut self, value: Value) -> String {
        let name = format!("p{}", self.params.len());
        let placeholder = format!("{{{}:{}}}", name, value.type_name());
        self.params.push(BoundParam { name, value });
        placeholder
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Column(name) => name.clone(),
            Expr::Int(n) => n.to_string(),
            Expr::Str(s) => super::expr::quote(s),
            Expr::Raw(sql) => sql.clone(),
            Expr::Param(value) => self.bind(value.clone()),
            Expr::Func(name, args) => {
                let args: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
                format!("{}({})", name, args.join(", "))
            }
            Expr::Binary(lhs, op, rhs) => {
                let lhs = self.operand(lhs);
                let rhs = self.operand(rhs);
                format!("{} {} {}", lhs, op.as_str(), rhs)
            }
            Expr::Window(window) => {
                let agg = match window.agg {
                    WindowAgg::Sum => "sum",
                    WindowAgg::Avg => "avg",
                };
                let arg = self.expr(&window.arg);

                let mut over: Vec<String> = Vec::new();
                if !window.partition_by.is_empty() {
                    let keys: Vec<String> =
                        window.partition_by.iter().map(|e| self.expr(e)).collect();
                    over.push(format!("PARTITION BY {}", keys.join(", ")));
                }
                if !window.order_by.is_empty() {
                    over.push(format!("ORDER BY {}", self.order_keys(&window.order_by)));
                }
                match window.frame {
                    Frame::Partition => {}
                    Frame::Running => {
                        over.push("ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW".to_string())
                    }
                    Frame::Trailing(n) => {
                        over.push(format!("ROWS BETWEEN {} PRECEDING AND CURRENT ROW", n))
                    }
                }

                format!("{}({}) OVER ({})", agg, arg, over.join(" "))
            }
        }
    }

    fn operand(&mut self, expr: &Expr) -> String {
        let rendered = self.expr(expr);
        if matches!(expr, Expr::Binary(..)) {
            format!("({})", rendered)
        } else {
            rendered
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{
        col, count, func, int, keep, param_str, param_u64, JoinKind, OrderKey, Plan, Sample,
        Table, WindowFn,
    };
    use super::*;

    #[test]
    fn test_group_folds_into_scan() {
        let query = Plan::scan(Table::Word)
            .group(vec![col("position").named("x")], vec![count().named("y")])
            .order_by(vec![OrderKey::asc(col("x"))])
            .render();

        assert_eq!(
            query.sql,
            "SELECT position AS x, count() AS y FROM Word GROUP BY position ORDER BY x ASC"
        );
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_filter_after_group_wraps() {
        let query = Plan::sample(Table::Word, Sample::Rows(100000))
            .group(
                vec![func("lengthUTF8", vec![col("text")]).named("x")],
                vec![count().named("occurrences")],
            )
            .filter(col("x").less_than(int(20)))
            .render();

        assert_eq!(
            query.sql,
            "SELECT * FROM (SELECT lengthUTF8(text) AS x, count() AS occurrences \
             FROM Word SAMPLE 100000 GROUP BY lengthUTF8(text)) WHERE x < 20"
        );
    }

    #[test]
    fn test_scope_filter_renders_bound_param() {
        let scope = col("userId").equal_to(func("toFixedString", vec![param_str("u'1"), int(64)]));
        let query = Plan::sample(Table::Message, Sample::Fraction(0.5))
            .group(vec![], vec![count().named("y")])
            .scoped(&scope)
            .render();

        assert_eq!(
            query.sql,
            "SELECT count() AS y FROM Message SAMPLE 0.5 WHERE userId = toFixedString({p0:String}, 64)"
        );
        assert_eq!(query.params.len(), 1);
        assert_eq!(query.params[0].name, "p0");
        assert_eq!(query.params[0].value, Value::Str("u'1".into()));
    }

    #[test]
    fn test_window_over_group_and_wrap_for_second_window() {
        let query = Plan::scan(Table::Word)
            .group(vec![col("text").named("token")], vec![count().named("occurrences")])
            .having(count().greater_than(param_u64(3)))
            .window(vec![WindowFn::sum(col("occurrences")).named("total")])
            .window(vec![WindowFn::avg(col("total"))
                .order_by(OrderKey::asc(col("token")))
                .trailing(1)
                .named("smooth")])
            .render();

        assert_eq!(
            query.sql,
            "SELECT *, avg(total) OVER (ORDER BY token ASC ROWS BETWEEN 1 PRECEDING AND CURRENT ROW) AS smooth \
             FROM (SELECT text AS token, count() AS occurrences, sum(occurrences) OVER () AS total \
             FROM Word GROUP BY text HAVING count() > {p0:UInt64})"
        );
    }

    #[test]
    fn test_join_aliases_sides() {
        let left = Plan::scan(Table::Word).group(vec![keep("userId")], vec![count().named("n")]);
        let query = Plan::join(Plan::scan(Table::Numbers(100)), left, JoinKind::Cross, &[])
            .project(vec![keep("L.number"), keep("R.userId")])
            .render();

        assert_eq!(
            query.sql,
            "SELECT L.number, R.userId FROM numbers(100) AS L CROSS JOIN \
             (SELECT userId, count() AS n FROM Word GROUP BY userId) AS R"
        );

        let query = Plan::join(
            Plan::scan(Table::Word),
            Plan::scan(Table::Message),
            JoinKind::Inner,
            &[("userId", "userId")],
        )
        .render();
        assert_eq!(
            query.sql,
            "SELECT * FROM Word AS L INNER JOIN Message AS R ON L.userId = R.userId"
        );
    }

    #[test]
    fn test_exclusion_list_and_limit() {
        let query = Plan::scan(Table::Word)
            .filter(Predicate::not_in_list(col("text"), vec!["a".into(), "the".into()]))
            .group(vec![col("text").named("x")], vec![count().named("occurrences")])
            .order_by(vec![OrderKey::desc(col("occurrences"))])
            .limit(100)
            .project(vec![
                keep("x"),
                (col("occurrences") / Expr::from(WindowFn::sum(col("occurrences")))).named("y"),
            ])
            .order_by(vec![OrderKey::desc(col("y"))])
            .render();

        assert_eq!(
            query.sql,
            "SELECT x, occurrences / sum(occurrences) OVER () AS y FROM \
             (SELECT text AS x, count() AS occurrences FROM Word WHERE NOT has({p0:Array(String)}, text) \
             GROUP BY text ORDER BY occurrences DESC LIMIT 100) ORDER BY y DESC"
        );
        assert_eq!(
            query.params[0].value,
            Value::StrList(vec!["a".into(), "the".into()])
        );
    }

    #[test]
    fn test_nested_arithmetic_is_parenthesized() {
        let query = Plan::scan(Table::Word)
            .project(vec![func("floor", vec![col("a") / col("b") * int(100)]).named("p")])
            .render();
        assert_eq!(query.sql, "SELECT floor((a / b) * 100) AS p FROM Word");
    }
}
