//! Store schema bootstrap
//!
//! Every statement is idempotent (`IF NOT EXISTS`), so the bootstrap runs on
//! each successful connect without version bookkeeping.

/// Event tables. Statements are separated by `;`.
const TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS Word (
    dateTime      DateTime64,
    text          String,
    userId        FixedString(64),
    position      Enum8('first' = 0, 'begin' = 1, 'center' = 2, 'end' = 3, 'last' = 4),
    messageLength Enum8('single' = 0, 'short' = 1, 'medium' = 2, 'long' = 3),

    -- Normalization, computed by the store on insert
    lang          Enum8('ru' = 0, 'en' = 1) MATERIALIZED if(length(extract(text, '([а-я|ё]+)')) > 0, 'ru', 'en'),
    lemma         String MATERIALIZED if(lang = 'ru', lemmatize('ru', text), lemmatize('en', text)),
    stem          String MATERIALIZED if(lang = 'ru', stem('ru', lemma), stem('en', lemma)),

    debug         String
) ENGINE = MergeTree()
    ORDER BY (userId, intHash32(toUInt32(dateTime)))
    PARTITION BY userId
    SAMPLE BY intHash32(toUInt32(dateTime));

CREATE TABLE IF NOT EXISTS Message (
    dateTime            DateTime64,
    userId              FixedString(64),
    chatId              FixedString(64),
    isChat              UInt8,
    words               Int16,
    symbols             Int16,
    timeFromLastSend    Int32,
    timeFromLastReceive Int32
) ENGINE = MergeTree()
    ORDER BY (userId, intHash32(toUInt32(dateTime)))
    PARTITION BY userId
    SAMPLE BY intHash32(toUInt32(dateTime));
"#;

/// `CREATE DATABASE` statement. Runs without a default database.
///
/// `database` must already be validated as a plain identifier.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// Table statements, in execution order. Run against the configured database.
pub fn table_statements() -> Vec<&'static str> {
    TABLES
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}
