//! Time-bucketed counters
//!
//! One point per bucket, ascending by bucket. `x` is the truncated bucket
//! start.

use crate::plan::{col, count, func, int, lit, Expr, OrderKey, Plan, Sample, Table, WindowFn};

use super::params::LengthVariant;

pub(crate) const QUARTER: &str = "quarter";
pub(crate) const MONTH: &str = "month";

/// `date_trunc(unit, dateTime)`
pub(crate) fn bucket(unit: &str) -> Expr {
    func("date_trunc", vec![lit(unit), col("dateTime")])
}

pub(crate) fn by_x() -> Vec<OrderKey> {
    vec![OrderKey::asc(col("x"))]
}

/// Words typed per quarter.
pub(crate) fn word_count() -> Plan {
    Plan::scan(Table::Word)
        .group(vec![bucket(QUARTER).named("x")], vec![count().named("y")])
        .order_by(by_x())
}

/// Messages per active user, per quarter.
pub(crate) fn message_count() -> Plan {
    Plan::scan(Table::Message)
        .group(
            vec![bucket(QUARTER).named("x")],
            vec![(count() / func("uniqExact", vec![col("userId")])).named("y")],
        )
        .order_by(by_x())
}

/// Mean word length in codepoints per quarter; buckets with 500 sampled
/// words or fewer are dropped.
pub(crate) fn word_length() -> Plan {
    Plan::sample(Table::Word, Sample::Rows(1_000_000))
        .group(
            vec![bucket(QUARTER).named("x")],
            vec![func("avg", vec![func("lengthUTF8", vec![col("text")])]).named("y")],
        )
        .having(count().greater_than(int(500)))
        .order_by(by_x())
}

/// Mean message length per quarter, smoothed over the current and the
/// previous bucket; buckets with 200 sampled messages or fewer are dropped.
pub(crate) fn message_length(variant: LengthVariant) -> Plan {
    Plan::sample(Table::Message, Sample::Fraction(0.5))
        .group(
            vec![bucket(QUARTER).named("x")],
            vec![func("avg", vec![col(variant.column())]).named("mean")],
        )
        .having(count().greater_than(int(200)))
        .window(vec![WindowFn::avg(col("mean"))
            .order_by(OrderKey::asc(col("x")))
            .trailing(1)
            .named("y")])
        .order_by(by_x())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_sql() {
        assert_eq!(
            word_count().render().sql,
            "SELECT date_trunc('quarter', dateTime) AS x, count() AS y FROM Word \
             GROUP BY date_trunc('quarter', dateTime) ORDER BY x ASC"
        );
    }

    #[test]
    fn test_message_count_per_user() {
        let sql = message_count().render().sql;
        assert!(sql.contains("count() / uniqExact(userId) AS y"));
        assert!(sql.contains("FROM Message GROUP BY"));
    }

    #[test]
    fn test_word_length_samples_and_thresholds() {
        let sql = word_length().render().sql;
        assert!(sql.contains("avg(lengthUTF8(text)) AS y"));
        assert!(sql.contains("FROM Word SAMPLE 1000000"));
        assert!(sql.contains("HAVING count() > 500"));
        assert!(sql.ends_with("ORDER BY x ASC"));
    }

    #[test]
    fn test_message_length_moving_average() {
        let sql = message_length(LengthVariant::Word).render().sql;
        assert_eq!(
            sql,
            "SELECT date_trunc('quarter', dateTime) AS x, avg(words) AS mean, \
             avg(mean) OVER (ORDER BY x ASC ROWS BETWEEN 1 PRECEDING AND CURRENT ROW) AS y \
             FROM Message SAMPLE 0.5 GROUP BY date_trunc('quarter', dateTime) \
             HAVING count() > 200 ORDER BY x ASC"
        );
        assert!(message_length(LengthVariant::Char)
            .render()
            .sql
            .contains("avg(symbols) AS mean"));
    }
}
