//! Message concentration curve
//!
//! Per user, conversations are ranked by volume and each one records the
//! integer percentile of the user's total it brings the running share to.
//! A dense `0..100` grid per user is full-outer-joined against those sparse
//! counts, the running number of conversations is carried across empty
//! bins (1 before the first one), and the result is averaged over users per
//! bin.

use crate::plan::{
    col, count, func, int, keep, Expr, JoinKind, OrderKey, Plan, Table, WindowFn,
};

use super::params::Volume;
use super::time_series::by_x;

const BINS: u32 = 100;

impl Volume {
    fn aggregate(&self) -> Expr {
        match self {
            Volume::Message => count(),
            Volume::Word => func("sum", vec![col("words")]),
            Volume::Symbols => func("sum", vec![col("symbols")]),
        }
    }
}

/// `(userId, percentile, chats)`: conversations reaching each percentile.
///
/// A user with zero total volume is placed at 100, outside the grid.
fn chats_by_percentile(volume: Volume) -> Plan {
    Plan::scan(Table::Message)
        .group(
            vec![keep("userId"), keep("chatId")],
            vec![volume.aggregate().named("volume")],
        )
        .window(vec![
            WindowFn::sum(col("volume"))
                .partition_by(col("userId"))
                .order_by(OrderKey::desc(col("volume")))
                .running()
                .named("running"),
            WindowFn::sum(col("volume"))
                .partition_by(col("userId"))
                .named("total"),
        ])
        .project(vec![
            keep("userId"),
            func(
                "toUInt32",
                vec![func(
                    "if",
                    vec![
                        col("total").equals(int(0)),
                        int(BINS as i64),
                        func("round", vec![col("running") / col("total") * int(100)]),
                    ],
                )],
            )
            .named("percentile"),
        ])
        .group(
            vec![keep("userId"), keep("percentile")],
            vec![count().named("chats")],
        )
}

/// `(percentile, userId)` for every user and every bin.
fn grid() -> Plan {
    let users = Plan::scan(Table::Message).group(vec![keep("userId")], vec![]);
    Plan::join(Plan::scan(Table::Numbers(BINS)), users, JoinKind::Cross, &[]).project(vec![
        func("toUInt32", vec![col("L.number")]).named("percentile"),
        col("R.userId").named("userId"),
    ])
}

pub(crate) fn message_distribution(volume: Volume) -> Plan {
    Plan::join(
        chats_by_percentile(volume),
        grid(),
        JoinKind::FullOuter,
        &[("userId", "userId"), ("percentile", "percentile")],
    )
    .project(vec![
        func("coalesce", vec![col("R.userId"), col("L.userId")]).named("entity"),
        func("coalesce", vec![col("L.percentile"), col("R.percentile")]).named("bin"),
        func("coalesce", vec![col("L.chats"), int(0)]).named("observed"),
    ])
    .window(vec![WindowFn::sum(col("observed"))
        .partition_by(col("entity"))
        .order_by(OrderKey::asc(col("bin")))
        .running()
        .named("cumulative")])
    .project(vec![
        keep("bin"),
        func(
            "if",
            vec![col("cumulative").equals(int(0)), int(1), col("cumulative")],
        )
        .named("filled"),
    ])
    .filter(col("bin").less_than(int(BINS as i64)))
    .group(
        vec![col("bin").named("x")],
        vec![func("avg", vec![col("filled")]).named("y")],
    )
    .order_by(by_x())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::user_scope;
    use crate::types::UserId;

    #[test]
    fn test_grid_cross_joins_sequence_with_users() {
        assert_eq!(
            grid().render().sql,
            "SELECT toUInt32(L.number) AS percentile, R.userId AS userId \
             FROM numbers(100) AS L CROSS JOIN (SELECT userId FROM Message GROUP BY userId) AS R"
        );
    }

    #[test]
    fn test_volume_measures() {
        let sql = message_distribution(Volume::Symbols).render().sql;
        assert!(sql.contains("sum(symbols) AS volume"));
        let sql = message_distribution(Volume::Message).render().sql;
        assert!(sql.contains("count() AS volume"));
    }

    #[test]
    fn test_zero_volume_user_stays_out_of_grid() {
        let sql = message_distribution(Volume::Word).render().sql;
        assert!(sql.contains(
            "toUInt32(if(total = 0, 100, round((running / total) * 100))) AS percentile"
        ));
    }

    #[test]
    fn test_forward_fill_and_bounds() {
        let sql = message_distribution(Volume::Word).render().sql;
        assert!(sql.contains("FULL OUTER JOIN"));
        assert!(sql.contains("ON L.userId = R.userId AND L.percentile = R.percentile"));
        assert!(sql.contains(
            "sum(observed) OVER (PARTITION BY entity ORDER BY bin ASC \
             ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW) AS cumulative"
        ));
        assert!(sql.contains("if(cumulative = 0, 1, cumulative) AS filled"));
        assert!(sql.contains("WHERE bin < 100 GROUP BY bin"));
        assert!(sql.starts_with("SELECT bin AS x, avg(filled) AS y FROM"));
    }

    #[test]
    fn test_scoping_reaches_both_join_sides() {
        let scoped = message_distribution(Volume::Message)
            .scoped(&user_scope(&UserId::new("u1")))
            .render();
        // chats per percentile and the user list of the grid
        assert_eq!(scoped.params.len(), 2);
        assert_eq!(scoped.sql.matches("toFixedString").count(), 2);
        assert!(!scoped.sql.contains("numbers(100) WHERE"));
    }
}
