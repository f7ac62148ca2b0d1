//! Chart registry for discovery and documentation.
//!
//! Every chart accepts `userId`; the listed parameters are the
//! chart-specific ones.

/// Descriptor for one catalog entry.
#[derive(Debug, Clone)]
pub struct ChartDescriptor {
    pub name: &'static str,
    pub parameters: &'static [&'static str],
    pub summary: &'static str,
    pub description: &'static str,
}

const CHARTS: &[ChartDescriptor] = &[
    ChartDescriptor {
        name: "wordCountByTime",
        parameters: &[],
        summary: "Words typed per quarter.",
        description: "Count of Word rows per quarter, ascending.",
    },
    ChartDescriptor {
        name: "messageCountByTime",
        parameters: &[],
        summary: "Messages per active user per quarter.",
        description: "Message rows per quarter divided by distinct users active in it.",
    },
    ChartDescriptor {
        name: "wordLengthByTime",
        parameters: &[],
        summary: "Mean word length per quarter.",
        description: "Average codepoint length over a 1M-row sample; quarters with 500 sampled words or fewer are dropped.",
    },
    ChartDescriptor {
        name: "messageLengthByTime",
        parameters: &["variant=word|char"],
        summary: "Mean message length per quarter, smoothed.",
        description: "Average words or symbols per message over a 50% sample, as a two-bucket moving average; quarters with 200 sampled messages or fewer are dropped.",
    },
    ChartDescriptor {
        name: "wordDistribution",
        parameters: &["minWordCount", "groupVariant=text|lemma|stem"],
        summary: "Word concentration curve.",
        description: "Distinct keys needed to reach each percentile of all occurrences, keys seen more than minWordCount times.",
    },
    ChartDescriptor {
        name: "wordDistributionByTime",
        parameters: &["minWordCount", "groupVariant=text|lemma|stem"],
        summary: "Word concentration curve per month.",
        description: "wordDistribution computed per month over a 2M-row sample; points carry their bucket.",
    },
    ChartDescriptor {
        name: "wordLengthDistribution",
        parameters: &[],
        summary: "Share of words per length.",
        description: "Relative frequency of codepoint lengths below 20 over a 100k-row sample.",
    },
    ChartDescriptor {
        name: "topWords",
        parameters: &["article=true|false"],
        summary: "The 100 most frequent words.",
        description: "Each word's share of the top-100 occurrences; article=false excludes function words.",
    },
    ChartDescriptor {
        name: "wordTrackingByTime",
        parameters: &[
            "trackedWord",
            "groupVariant=text|lemma|stem",
            "scale=absolute|relative",
        ],
        summary: "Monthly frequency of one word.",
        description: "Occurrences per user who typed the word (absolute) or share of all words in months above 5000 words (relative).",
    },
    ChartDescriptor {
        name: "pieWordPosition",
        parameters: &["trackedWord?", "groupVariant=text|lemma|stem"],
        summary: "Words by position in the message.",
        description: "Word count per position (first, begin, center, end, last), optionally for one tracked word.",
    },
    ChartDescriptor {
        name: "messageDistribution",
        parameters: &["volumeVariant=message|word|symbols"],
        summary: "Conversation concentration curve.",
        description: "Average number of conversations needed to reach each percentile of a user's volume.",
    },
    ChartDescriptor {
        name: "stats",
        parameters: &[],
        summary: "Store totals.",
        description: "Total words, messages, users and uncompressed size in MiB; user totals when scoped.",
    },
];

/// All charts, in catalog order.
pub fn list_charts() -> &'static [ChartDescriptor] {
    CHARTS
}
