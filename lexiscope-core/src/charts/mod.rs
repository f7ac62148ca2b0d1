//! Chart catalog
//!
//! Every chart is a pure function from validated parameters to a [`Plan`];
//! the [dual-scope executor](crate::executor) runs that plan server-wide and
//! for the requesting user.
//!
//! ## Request flow
//!
//! ```text
//!   name + ParamBag
//!        │
//!        ▼
//!   ChartRequest::parse()     unknown name     → Error::UnknownChart
//!        │                    bad parameter    → Error::InvalidParameter
//!        ▼
//!   Chart::plan()             pure, no I/O
//!        │
//!        ▼
//!   executor::run_dual()      server + user queries, concurrently
//!        │
//!        ▼
//!   ChartResult { serverSeries, userSeries, elapsedMs }
//! ```
//!
//! `stats` is the one chart that issues several independent queries and is
//! executed by [`summary::stats`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lexiscope_core::charts::{load_chart, ChartOutcome, ParamBag};
//!
//! let params = ParamBag::new().with("minWordCount", "5").with("userId", "u1");
//! match load_chart(&store, "wordDistribution", &params).await {
//!     ChartOutcome::Ok(result) => println!("{} points", result.server_series.len()),
//!     other => eprintln!("{:?}", other),
//! }
//! ```

mod concentration;
mod distribution;
mod params;
pub mod registry;
pub mod summary;
mod time_series;
mod tracking;

pub use params::{Choice, GroupVariant, LengthVariant, ParamBag, Scale, Volume};
pub use registry::{list_charts, ChartDescriptor};
pub use tracking::TrackedWord;

use crate::error::{Error, Result};
use crate::executor::run_dual;
use crate::plan::Plan;
use crate::store::{Store, Transport};
use crate::types::{ChartResult, UserId};

/// Legacy spelling still sent by older clients.
const LEGACY_TRACKING_NAME: &str = "wordTrakingByTime";

/// The chart catalog, each variant with its validated parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    WordCountByTime,
    MessageCountByTime,
    WordLengthByTime,
    MessageLengthByTime { variant: LengthVariant },
    WordDistribution { min_word_count: u64, group: GroupVariant },
    WordDistributionByTime { min_word_count: u64, group: GroupVariant },
    WordLengthDistribution,
    TopWords { include_articles: bool },
    WordTrackingByTime { word: TrackedWord, scale: Scale },
    PieWordPosition { word: Option<TrackedWord> },
    MessageDistribution { volume: Volume },
    Stats,
}

impl Chart {
    /// Catalog name.
    pub fn name(&self) -> &'static str {
        match self {
            Chart::WordCountByTime => "wordCountByTime",
            Chart::MessageCountByTime => "messageCountByTime",
            Chart::WordLengthByTime => "wordLengthByTime",
            Chart::MessageLengthByTime { .. } => "messageLengthByTime",
            Chart::WordDistribution { .. } => "wordDistribution",
            Chart::WordDistributionByTime { .. } => "wordDistributionByTime",
            Chart::WordLengthDistribution => "wordLengthDistribution",
            Chart::TopWords { .. } => "topWords",
            Chart::WordTrackingByTime { .. } => "wordTrackingByTime",
            Chart::PieWordPosition { .. } => "pieWordPosition",
            Chart::MessageDistribution { .. } => "messageDistribution",
            Chart::Stats => "stats",
        }
    }

    /// Parse a chart name and its parameters.
    pub fn parse(name: &str, params: &ParamBag) -> Result<Self> {
        let chart = match name {
            "wordCountByTime" => Chart::WordCountByTime,
            "messageCountByTime" => Chart::MessageCountByTime,
            "wordLengthByTime" => Chart::WordLengthByTime,
            "messageLengthByTime" => Chart::MessageLengthByTime {
                variant: params.choice(&["variant"], LengthVariant::Char)?,
            },
            "wordDistribution" => Chart::WordDistribution {
                min_word_count: params.required_u64("minWordCount")?,
                group: params.choice(&["groupVariant", "group"], GroupVariant::Text)?,
            },
            "wordDistributionByTime" => Chart::WordDistributionByTime {
                min_word_count: params.required_u64("minWordCount")?,
                group: params.choice(&["groupVariant", "group"], GroupVariant::Text)?,
            },
            "wordLengthDistribution" => Chart::WordLengthDistribution,
            "topWords" => Chart::TopWords {
                include_articles: params.flag("article", true)?,
            },
            "wordTrackingByTime" | LEGACY_TRACKING_NAME => Chart::WordTrackingByTime {
                word: TrackedWord::parse(params)?,
                scale: params.choice(&["scale"], Scale::Absolute)?,
            },
            "pieWordPosition" => Chart::PieWordPosition {
                word: TrackedWord::parse_optional(params)?,
            },
            "messageDistribution" => Chart::MessageDistribution {
                volume: params.choice(&["volumeVariant", "variant"], Volume::Message)?,
            },
            "stats" => Chart::Stats,
            _ => return Err(Error::UnknownChart(name.to_string())),
        };
        Ok(chart)
    }

    /// Server-wide plan for this chart. `None` for [`Chart::Stats`], which
    /// runs several plans.
    pub fn plan(&self) -> Option<Plan> {
        let plan = match self {
            Chart::WordCountByTime => time_series::word_count(),
            Chart::MessageCountByTime => time_series::message_count(),
            Chart::WordLengthByTime => time_series::word_length(),
            Chart::MessageLengthByTime { variant } => time_series::message_length(*variant),
            Chart::WordDistribution {
                min_word_count,
                group,
            } => distribution::word_distribution(*min_word_count, *group),
            Chart::WordDistributionByTime {
                min_word_count,
                group,
            } => distribution::word_distribution_by_time(*min_word_count, *group),
            Chart::WordLengthDistribution => distribution::word_length_distribution(),
            Chart::TopWords { include_articles } => distribution::top_words(*include_articles),
            Chart::WordTrackingByTime { word, scale } => tracking::tracking_by_time(word, *scale),
            Chart::PieWordPosition { word } => tracking::word_position(word.as_ref()),
            Chart::MessageDistribution { volume } => concentration::message_distribution(*volume),
            Chart::Stats => return None,
        };
        Some(plan)
    }
}

/// A validated chart request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub chart: Chart,
    /// Scope for the second series
    pub user: Option<UserId>,
}

impl ChartRequest {
    /// Validate a raw request. No plan is built and nothing is sent to the
    /// store when this fails.
    pub fn parse(name: &str, params: &ParamBag) -> Result<Self> {
        Ok(Self {
            chart: Chart::parse(name, params)?,
            user: params.user()?,
        })
    }
}

/// Compute a chart.
pub async fn compute<T: Transport>(store: &Store<T>, request: &ChartRequest) -> Result<ChartResult> {
    let user = request.user.as_ref();
    let result = match request.chart.plan() {
        Some(plan) => run_dual(store, &plan, user).await,
        None => summary::stats(store, user).await,
    };

    match &result {
        Ok(r) => tracing::info!(
            chart = request.chart.name(),
            scoped = user.is_some(),
            elapsed_ms = r.elapsed_ms,
            points = r.server_series.len(),
            "Chart computed"
        ),
        Err(e) => tracing::warn!(
            chart = request.chart.name(),
            scoped = user.is_some(),
            error = %e,
            "Chart failed"
        ),
    }

    result
}

/// Outcome of the chart query contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Ok(ChartResult),
    /// No chart with that name
    NotFound(String),
    /// Parameter rejected before execution
    Invalid { name: String, message: String },
    /// Execution failed; carries the store message
    Failed(String),
}

impl ChartOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ChartOutcome::Ok(_))
    }
}

impl From<Result<ChartResult>> for ChartOutcome {
    fn from(result: Result<ChartResult>) -> Self {
        match result {
            Ok(r) => ChartOutcome::Ok(r),
            Err(Error::UnknownChart(name)) => ChartOutcome::NotFound(name),
            Err(Error::InvalidParameter { name, message }) => ChartOutcome::Invalid { name, message },
            Err(e) => ChartOutcome::Failed(e.to_string()),
        }
    }
}

/// Chart query contract: name plus flat parameters in, outcome out.
pub async fn load_chart<T: Transport>(store: &Store<T>, name: &str, params: &ParamBag) -> ChartOutcome {
    let result = match ChartRequest::parse(name, params) {
        Ok(request) => compute(store, &request).await,
        Err(e) => Err(e),
    };
    ChartOutcome::from(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{json_body, store, ScriptedTransport};
    use serde_json::json;

    #[test]
    fn test_parse_all_registered_charts() {
        let params = ParamBag::new()
            .with("minWordCount", "3")
            .with("trackedWord", "Hello");

        for descriptor in list_charts() {
            let chart = Chart::parse(descriptor.name, &params).unwrap();
            assert_eq!(chart.name(), descriptor.name);
            assert_eq!(chart.plan().is_none(), chart == Chart::Stats);
        }
    }

    #[test]
    fn test_unknown_chart() {
        let err = ChartRequest::parse("wordCloud", &ParamBag::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownChart(name) if name == "wordCloud"));
    }

    #[test]
    fn test_legacy_tracking_name() {
        let params = ParamBag::new().with("word", "Cats").with("group", "stem");
        let chart = Chart::parse("wordTrakingByTime", &params).unwrap();
        match chart {
            Chart::WordTrackingByTime { word, scale } => {
                assert_eq!(word.word, "cats");
                assert_eq!(word.group, GroupVariant::Stem);
                assert_eq!(scale, Scale::Absolute);
            }
            other => panic!("expected tracking chart, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let params = ParamBag::new().with("minWordCount", "1");
        assert_eq!(
            Chart::parse("wordDistribution", &params).unwrap(),
            Chart::WordDistribution {
                min_word_count: 1,
                group: GroupVariant::Text
            }
        );
        assert_eq!(
            Chart::parse("messageDistribution", &ParamBag::new()).unwrap(),
            Chart::MessageDistribution {
                volume: Volume::Message
            }
        );
        assert_eq!(
            Chart::parse("topWords", &ParamBag::new()).unwrap(),
            Chart::TopWords {
                include_articles: true
            }
        );
    }

    #[test]
    fn test_missing_required_parameters() {
        let err = Chart::parse("wordDistribution", &ParamBag::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name, .. } if name == "minWordCount"));

        let err = Chart::parse("wordTrackingByTime", &ParamBag::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name, .. } if name == "trackedWord"));
    }

    #[tokio::test]
    async fn test_load_chart_outcomes() {
        let store = store(ScriptedTransport::new(|_| {
            Ok(json_body(json!([{"x": "2023-01-01", "y": 2}]), 0.001))
        }));

        let outcome = load_chart(&store, "nope", &ParamBag::new()).await;
        assert_eq!(outcome, ChartOutcome::NotFound("nope".to_string()));

        let params = ParamBag::new().with("minWordCount", "many");
        let outcome = load_chart(&store, "wordDistribution", &params).await;
        assert!(matches!(outcome, ChartOutcome::Invalid { ref name, .. } if name == "minWordCount"));
        assert!(store.transport().sent().is_empty());

        let outcome = load_chart(&store, "wordCountByTime", &ParamBag::new()).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_load_chart_reports_store_failure() {
        let store = store(ScriptedTransport::new(|_| {
            Err(Error::Query("store error (500): Memory limit exceeded".to_string()))
        }));

        let outcome = load_chart(&store, "pieWordPosition", &ParamBag::new()).await;
        match outcome {
            ChartOutcome::Failed(message) => assert!(message.contains("Memory limit exceeded")),
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
