//! Query plans
//!
//! A [`Plan`] is an immutable tree of relational [`Stage`]s. Every stage
//! reads the output of its input stage(s), so the result of any stage can
//! feed another one as a derived table. Multi-phase aggregations are just
//! longer chains:
//!
//! ```text
//!   Scan(Word SAMPLE 1000000)
//!     └─ Group(token; occurrences)          phase 1
//!         └─ Window(running, total)         phase 2
//!             └─ Project(percentile)
//!                 └─ Filter(percentile < 100)
//!                     └─ Group(x; keys)     phase 3
//! ```
//!
//! Plans never execute themselves. [`Plan::render`] turns a plan into query
//! text plus bound parameters, and the store adapter runs it.
//!
//! ## Usage
//!
//! ```rust
//! use lexiscope_core::plan::{col, count, OrderKey, Plan, Table};
//!
//! let plan = Plan::scan(Table::Word)
//!     .group(vec![col("position").named("x")], vec![count().named("y")])
//!     .order_by(vec![OrderKey::asc(col("x"))]);
//!
//! let query = plan.render();
//! assert!(query.sql.starts_with("SELECT position AS x, count() AS y FROM Word"));
//! ```

mod expr;
mod render;

pub use expr::{
    col, count, func, int, keep, lit, param_str, param_u64, raw, BinOp, Column, Expr, Frame,
    OrderKey, Predicate, Value, WindowAgg, WindowFn,
};
pub use render::{BoundParam, RenderedQuery};

/// Relations a plan can read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Typed-word events
    Word,
    /// Sent-message events
    Message,
    /// `numbers(n)`: the sequence `0..n` in a column named `number`
    Numbers(u32),
    /// Store column metadata (`system.columns`)
    SystemColumns,
}

impl Table {
    /// Relation name as written in a `FROM` clause.
    pub fn sql(&self) -> String {
        match self {
            Table::Word => "Word".to_string(),
            Table::Message => "Message".to_string(),
            Table::Numbers(n) => format!("numbers({})", n),
            Table::SystemColumns => "system.columns".to_string(),
        }
    }

    /// Event tables carry a `userId` column and are partitioned by it.
    pub fn is_user_partitioned(&self) -> bool {
        matches!(self, Table::Word | Table::Message)
    }
}

/// Hash-based sampling of a table scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// Fraction of rows in `(0, 1]`
    Fraction(f64),
    /// Approximate number of rows
    Rows(u64),
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    FullOuter,
    Cross,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// Leaf stage: a table, optionally sampled.
#[derive(Debug, Clone, PartialEq)]
pub struct Scan {
    pub table: Table,
    pub sample: Option<Sample>,
}

/// One node of a plan tree.
///
/// Join sides are visible to parent stages as `L` and `R`.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Scan(Scan),
    Filter {
        input: Box<Stage>,
        predicate: Predicate,
    },
    Group {
        input: Box<Stage>,
        keys: Vec<Column>,
        aggregates: Vec<Column>,
        having: Vec<Predicate>,
    },
    /// Adds window-aggregate columns to the input's columns
    Window {
        input: Box<Stage>,
        columns: Vec<Column>,
    },
    /// Replaces the input's columns
    Project {
        input: Box<Stage>,
        columns: Vec<Column>,
    },
    Join {
        left: Box<Stage>,
        right: Box<Stage>,
        kind: JoinKind,
        /// `(left column, right column)` equality pairs
        on: Vec<(String, String)>,
    },
    Order {
        input: Box<Stage>,
        keys: Vec<OrderKey>,
    },
    Limit {
        input: Box<Stage>,
        count: u64,
    },
}

/// An immutable query plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    root: Stage,
}

impl Plan {
    /// Full table scan.
    pub fn scan(table: Table) -> Self {
        Self {
            root: Stage::Scan(Scan {
                table,
                sample: None,
            }),
        }
    }

    /// Sampled table scan.
    pub fn sample(table: Table, sample: Sample) -> Self {
        Self {
            root: Stage::Scan(Scan {
                table,
                sample: Some(sample),
            }),
        }
    }

    /// Join two plans. An empty `on` list is only meaningful for
    /// [`JoinKind::Cross`].
    pub fn join(left: Plan, right: Plan, kind: JoinKind, on: &[(&str, &str)]) -> Self {
        Self {
            root: Stage::Join {
                left: Box::new(left.root),
                right: Box::new(right.root),
                kind,
                on: on
                    .iter()
                    .map(|(l, r)| (l.to_string(), r.to_string()))
                    .collect(),
            },
        }
    }

    pub fn filter(self, predicate: Predicate) -> Self {
        self.push(|input| Stage::Filter { input, predicate })
    }

    /// Group by `keys`; the output columns are the keys followed by the
    /// aggregates. Empty `keys` aggregates the whole input into one row.
    pub fn group(self, keys: Vec<Column>, aggregates: Vec<Column>) -> Self {
        self.push(|input| Stage::Group {
            input,
            keys,
            aggregates,
            having: Vec::new(),
        })
    }

    /// Post-group filter. Applies to the top stage when it is a group,
    /// otherwise it is an ordinary filter.
    pub fn having(self, predicate: Predicate) -> Self {
        match self.root {
            Stage::Group {
                input,
                keys,
                aggregates,
                mut having,
            } => {
                having.push(predicate);
                Self {
                    root: Stage::Group {
                        input,
                        keys,
                        aggregates,
                        having,
                    },
                }
            }
            root => Self { root }.filter(predicate),
        }
    }

    pub fn window(self, columns: Vec<Column>) -> Self {
        self.push(|input| Stage::Window { input, columns })
    }

    pub fn project(self, columns: Vec<Column>) -> Self {
        self.push(|input| Stage::Project { input, columns })
    }

    pub fn order_by(self, keys: Vec<OrderKey>) -> Self {
        self.push(|input| Stage::Order { input, keys })
    }

    pub fn limit(self, count: u64) -> Self {
        self.push(|input| Stage::Limit { input, count })
    }

    fn push(self, stage: impl FnOnce(Box<Stage>) -> Stage) -> Self {
        Self {
            root: stage(Box::new(self.root)),
        }
    }

    /// Root stage of the tree.
    pub fn root(&self) -> &Stage {
        &self.root
    }

    /// Copy of this plan with `predicate` applied directly above every scan
    /// of a user-partitioned table.
    ///
    /// The result differs from `self` only by those filter nodes, so both
    /// plans aggregate, normalize and bucket identically.
    pub fn scoped(&self, predicate: &Predicate) -> Plan {
        Plan {
            root: scope_stage(&self.root, predicate),
        }
    }

    /// Render to query text and bound parameters.
    pub fn render(&self) -> RenderedQuery {
        render::render(&self.root)
    }
}

fn scope_stage(stage: &Stage, predicate: &Predicate) -> Stage {
    let scoped = |input: &Stage| Box::new(scope_stage(input, predicate));

    match stage {
        Stage::Scan(scan) if scan.table.is_user_partitioned() => Stage::Filter {
            input: Box::new(Stage::Scan(scan.clone())),
            predicate: predicate.clone(),
        },
        Stage::Scan(scan) => Stage::Scan(scan.clone()),
        Stage::Filter { input, predicate: p } => Stage::Filter {
            input: scoped(input),
            predicate: p.clone(),
        },
        Stage::Group {
            input,
            keys,
            aggregates,
            having,
        } => Stage::Group {
            input: scoped(input),
            keys: keys.clone(),
            aggregates: aggregates.clone(),
            having: having.clone(),
        },
        Stage::Window { input, columns } => Stage::Window {
            input: scoped(input),
            columns: columns.clone(),
        },
        Stage::Project { input, columns } => Stage::Project {
            input: scoped(input),
            columns: columns.clone(),
        },
        Stage::Join {
            left,
            right,
            kind,
            on,
        } => Stage::Join {
            left: scoped(left),
            right: scoped(right),
            kind: *kind,
            on: on.clone(),
        },
        Stage::Order { input, keys } => Stage::Order {
            input: scoped(input),
            keys: keys.clone(),
        },
        Stage::Limit { input, count } => Stage::Limit {
            input: scoped(input),
            count: *count,
        },
    }
}
