//! Word tracking and positional breakdown

use crate::error::{Error, Result};
use crate::plan::{
    col, count, func, int, lit, param_str, Expr, JoinKind, OrderKey, Plan, Predicate, Table,
};
use crate::text::{first_word, Lang};

use super::params::{GroupVariant, ParamBag, Scale};
use super::time_series::{bucket, by_x, MONTH};

/// Buckets with this many words or fewer are left out of relative tracking.
const RELATIVE_VOLUME_FLOOR: i64 = 5000;

/// A tracked word, normalized from free-text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedWord {
    /// First lowercased word of the input
    pub word: String,
    /// Normalization branch, from the word's script
    pub lang: Lang,
    /// Key the word is compared on
    pub group: GroupVariant,
}

impl TrackedWord {
    /// Read `trackedWord` (alias `word`) and `groupVariant` (alias `group`).
    pub fn parse(params: &ParamBag) -> Result<Self> {
        Self::parse_optional(params)?
            .ok_or_else(|| Error::invalid_parameter("trackedWord", "required"))
    }

    /// Like [`parse`](Self::parse), `None` when no word was given.
    pub fn parse_optional(params: &ParamBag) -> Result<Option<Self>> {
        let Some((name, raw)) = params.get_any(&["trackedWord", "word"]) else {
            return Ok(None);
        };
        let word = first_word(raw).ok_or_else(|| {
            Error::invalid_parameter(name, "contains no Latin or Cyrillic letters")
        })?;
        let group = params.choice(&["groupVariant", "group"], GroupVariant::Text)?;

        Ok(Some(Self {
            lang: Lang::detect(&word),
            word,
            group,
        }))
    }

    /// The word normalized like the `group` column: as-is, lemmatized, or
    /// stemmed from the lemma. The word itself is a bound parameter.
    pub fn key(&self) -> Expr {
        let lang = || lit(self.lang.code());
        let word = param_str(&self.word);
        match self.group {
            GroupVariant::Text => word,
            GroupVariant::Lemma => func("lemmatize", vec![lang(), word]),
            GroupVariant::Stem => func(
                "stem",
                vec![lang(), func("lemmatize", vec![lang(), word])],
            ),
        }
    }

    pub fn predicate(&self) -> Predicate {
        col(self.group.column()).equal_to(self.key())
    }
}

/// Monthly frequency of a tracked word.
///
/// Absolute: occurrences divided by the number of distinct users who typed
/// the word that month (the user count is taken after the word filter, not
/// over all active users). Relative: occurrences divided by all words in the
/// month, for months above the volume floor.
pub(crate) fn tracking_by_time(word: &TrackedWord, scale: Scale) -> Plan {
    match scale {
        Scale::Absolute => Plan::scan(Table::Word)
            .filter(word.predicate())
            .group(
                vec![bucket(MONTH).named("x")],
                vec![(count() / func("uniqExact", vec![col("userId")])).named("y")],
            )
            .order_by(by_x()),
        Scale::Relative => {
            let tracked = Plan::scan(Table::Word)
                .filter(word.predicate())
                .group(
                    vec![bucket(MONTH).named("bucket")],
                    vec![count().named("occurrences")],
                );
            let volume = Plan::scan(Table::Word)
                .group(
                    vec![bucket(MONTH).named("bucket")],
                    vec![count().named("occurrences")],
                )
                .having(count().greater_than(int(RELATIVE_VOLUME_FLOOR)));

            Plan::join(tracked, volume, JoinKind::Inner, &[("bucket", "bucket")])
                .project(vec![
                    col("L.bucket").named("x"),
                    (col("L.occurrences") / col("R.occurrences")).named("y"),
                ])
                .order_by(by_x())
        }
    }
}

/// Word count per position in the message, optionally for one tracked word.
pub(crate) fn word_position(word: Option<&TrackedWord>) -> Plan {
    let mut plan = Plan::scan(Table::Word);
    if let Some(word) = word {
        plan = plan.filter(word.predicate());
    }
    plan.group(vec![col("position").named("x")], vec![count().named("y")])
        .order_by(vec![OrderKey::asc(col("x"))])
}
