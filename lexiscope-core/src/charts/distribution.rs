//! Word distributions
//!
//! The concentration curve ("word distribution") is built in three phases:
//!
//! 1. count sampled occurrences per key, dropping keys seen `min_word_count`
//!    times or fewer;
//! 2. rank keys by count and turn each key's running share of the total
//!    into an integer percentile `floor(running / total * 100)`;
//! 3. count keys per percentile below 100 and accumulate them, so `y` is
//!    the number of distinct keys needed to reach `x` percent of all
//!    occurrences.

use crate::plan::{
    col, count, func, int, keep, param_u64, Expr, OrderKey, Plan, Predicate, Sample, Table,
    WindowFn,
};

use super::params::GroupVariant;
use super::time_series::{bucket, by_x, MONTH};

/// Function words excluded from `topWords` unless articles are requested.
pub(crate) const ARTICLES: &[&str] = &[
    // English
    "a", "an", "the", "and", "or", "but", "of", "to", "in", "on", "at", "for", "with", "by",
    "from", "as", "is", "are", "was", "it", "i", "you", "he", "she", "we", "they", "me", "my",
    "not", "no", "so", "do", "be", "that", "this",
    // Russian
    "и", "а", "но", "или", "в", "во", "на", "с", "со", "к", "ко", "по", "за", "из", "от", "до",
    "у", "о", "об", "для", "не", "ни", "же", "ли", "бы", "то", "что", "как", "это", "я", "ты",
    "он", "она", "мы", "вы", "они", "да", "нет",
];

/// `floor(running / total * 100)`
fn percentile() -> Expr {
    func("floor", vec![col("running") / col("total") * int(100)])
}

/// Concentration curve over the whole sample.
pub(crate) fn word_distribution(min_word_count: u64, group: GroupVariant) -> Plan {
    Plan::sample(Table::Word, Sample::Rows(1_000_000))
        .group(
            vec![col(group.column()).named("token")],
            vec![count().named("occurrences")],
        )
        .having(count().greater_than(param_u64(min_word_count)))
        .window(vec![
            WindowFn::sum(col("occurrences"))
                .order_by(OrderKey::desc(col("occurrences")))
                .running()
                .named("running"),
            WindowFn::sum(col("occurrences")).named("total"),
        ])
        .project(vec![keep("token"), percentile().named("percentile")])
        .filter(col("percentile").less_than(int(100)))
        .group(
            vec![col("percentile").named("x")],
            vec![count().named("tokens")],
        )
        .window(vec![WindowFn::sum(col("tokens"))
            .order_by(OrderKey::asc(col("x")))
            .running()
            .named("y")])
        .order_by(by_x())
}

/// One concentration curve per month. Months with 500 sampled occurrences
/// or fewer (after the key threshold) are dropped; points carry `bucket`.
pub(crate) fn word_distribution_by_time(min_word_count: u64, group: GroupVariant) -> Plan {
    Plan::sample(Table::Word, Sample::Rows(2_000_000))
        .group(
            vec![
                bucket(MONTH).named("bucket"),
                col(group.column()).named("token"),
            ],
            vec![count().named("occurrences")],
        )
        .having(count().greater_than(param_u64(min_word_count)))
        .window(vec![
            WindowFn::sum(col("occurrences"))
                .partition_by(col("bucket"))
                .order_by(OrderKey::desc(col("occurrences")))
                .running()
                .named("running"),
            WindowFn::sum(col("occurrences"))
                .partition_by(col("bucket"))
                .named("total"),
        ])
        .filter(col("total").greater_than(int(500)))
        .project(vec![
            keep("bucket"),
            keep("token"),
            percentile().named("percentile"),
        ])
        .filter(col("percentile").less_than(int(100)))
        .group(
            vec![keep("bucket"), col("percentile").named("x")],
            vec![count().named("tokens")],
        )
        .window(vec![WindowFn::sum(col("tokens"))
            .partition_by(col("bucket"))
            .order_by(OrderKey::asc(col("x")))
            .running()
            .named("y")])
        .order_by(vec![OrderKey::asc(col("bucket")), OrderKey::asc(col("x"))])
}

/// Share of sampled words per codepoint length, lengths below 20.
pub(crate) fn word_length_distribution() -> Plan {
    Plan::sample(Table::Word, Sample::Rows(100_000))
        .group(
            vec![func("lengthUTF8", vec![col("text")]).named("x")],
            vec![count().named("occurrences")],
        )
        .window(vec![WindowFn::sum(col("occurrences")).named("total")])
        .filter(col("x").less_than(int(20)))
        .project(vec![
            keep("x"),
            (col("occurrences") / col("total")).named("y"),
        ])
        .order_by(by_x())
}

/// The 100 most frequent words, `y` being each word's share of the top-100
/// occurrences.
pub(crate) fn top_words(include_articles: bool) -> Plan {
    let mut sample = Plan::sample(Table::Word, Sample::Rows(1_000_000));
    if !include_articles {
        sample = sample.filter(Predicate::not_in_list(
            col("text"),
            ARTICLES.iter().map(|a| a.to_string()).collect(),
        ));
    }

    sample
        .group(
            vec![col("text").named("x")],
            vec![count().named("occurrences")],
        )
        .order_by(vec![OrderKey::desc(col("occurrences"))])
        .limit(100)
        .project(vec![
            keep("x"),
            (col("occurrences") / Expr::from(WindowFn::sum(col("occurrences")))).named("y"),
        ])
        .order_by(vec![OrderKey::desc(col("y"))])
}
