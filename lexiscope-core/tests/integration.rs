//! Integration tests for chart computation through the public API
//!
//! The first group runs against a scripted transport and checks what is sent
//! to the store and how answers are assembled. The `live_` tests need a
//! ClickHouse server with the English lemmatizer and stemmer configured:
//!
//! ```sh
//! LEXISCOPE_TEST_CLICKHOUSE_URL=http://localhost:8123 cargo test -- --ignored
//! ```
//!
//! Each live test works in its own freshly created database.

use chrono::{TimeZone, Utc};
use lexiscope_core::charts::{load_chart, ChartOutcome, ParamBag};
use lexiscope_core::config::StoreConfig;
use lexiscope_core::plan::Table;
use lexiscope_core::store::{HttpTransport, StoreRequest, Transport};
use lexiscope_core::{
    ChartResult, Error, MessageEvent, MessageLength, Point, Position, Store, UserId, WordEvent,
};
use serde_json::json;
use std::sync::Mutex;

// ============================================
// Scripted transport
// ============================================

type Responder = fn(&StoreRequest) -> lexiscope_core::Result<String>;

struct Scripted {
    respond: Responder,
    sent: Mutex<Vec<StoreRequest>>,
}

impl Scripted {
    fn new(respond: Responder) -> Self {
        Self {
            respond,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<StoreRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for Scripted {
    async fn send(&self, request: &StoreRequest) -> lexiscope_core::Result<String> {
        self.sent.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

fn body(data: serde_json::Value, elapsed: f64) -> String {
    json!({
        "meta": [{"name": "x", "type": "DateTime64(3)"}, {"name": "y", "type": "UInt64"}],
        "data": data,
        "rows": data.as_array().map(|a| a.len()).unwrap_or(0),
        "statistics": {"elapsed": elapsed, "rows_read": 3, "bytes_read": 96},
    })
    .to_string()
}

fn scripted_store(respond: Responder) -> Store<Scripted> {
    lexiscope_core::logging::init_test();
    Store::new(Scripted::new(respond), &StoreConfig::default())
}

fn expect_ok(outcome: ChartOutcome) -> ChartResult {
    match outcome {
        ChartOutcome::Ok(result) => result,
        other => panic!("expected chart result, got {:?}", other),
    }
}

fn is_scoped(request: &StoreRequest) -> bool {
    request.query.contains("toFixedString")
}

// ============================================
// Scripted tests
// ============================================

#[tokio::test]
async fn test_scoped_chart_returns_both_series() {
    let store = scripted_store(|req| {
        if is_scoped(req) {
            Ok(body(json!([{"x": "2023-01-01 00:00:00.000", "y": 2}]), 0.002))
        } else {
            Ok(body(
                json!([
                    {"x": "2023-01-01 00:00:00.000", "y": 5},
                    {"x": "2023-04-01 00:00:00.000", "y": 1},
                ]),
                0.003,
            ))
        }
    });

    let params = ParamBag::new().with("userId", "u1");
    let result = expect_ok(load_chart(&store, "wordCountByTime", &params).await);

    assert_eq!(result.server_series.len(), 2);
    assert_eq!(
        result.user_series,
        Some(vec![Point::new("2023-01-01 00:00:00.000", 2.0)])
    );
    assert!((result.elapsed_ms - 5.0).abs() < 1e-9);

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["serverSeries"][1]["y"], json!(1.0));
    assert_eq!(value["userSeries"][0]["x"], json!("2023-01-01 00:00:00.000"));

    let sent = store.transport().sent();
    assert_eq!(sent.len(), 2);
    let scoped = sent.iter().find(|r| is_scoped(r)).unwrap();
    assert!(scoped
        .params
        .contains(&("p0".to_string(), "u1".to_string())));
}

#[tokio::test]
async fn test_unscoped_chart_has_null_user_series() {
    let store = scripted_store(|_| Ok(body(json!([{"x": "first", "y": 10}]), 0.001)));

    let result = expect_ok(load_chart(&store, "pieWordPosition", &ParamBag::new()).await);
    assert!(result.user_series.is_none());
    assert_eq!(
        serde_json::to_value(&result).unwrap()["userSeries"],
        serde_json::Value::Null
    );
    assert_eq!(store.transport().sent().len(), 1);
}

#[tokio::test]
async fn test_tracked_word_never_reaches_query_text() {
    let store = scripted_store(|_| Ok(body(json!([]), 0.0)));
    let params = ParamBag::new()
        .with("trackedWord", "Robert'); DROP TABLE Word;--")
        .with("groupVariant", "lemma")
        .with("scale", "relative");

    let result = expect_ok(load_chart(&store, "wordTrackingByTime", &params).await);
    assert!(result.server_series.is_empty());

    let sent = store.transport().sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].query.contains("robert"));
    assert!(!sent[0].query.contains("DROP"));
    assert!(sent[0].query.contains("lemmatize('en', {p0:String})"));
    assert_eq!(sent[0].params, vec![("p0".to_string(), "robert".to_string())]);
}

#[tokio::test]
async fn test_bucketed_points_keep_bucket() {
    let store = scripted_store(|_| {
        Ok(body(
            json!([
                {"bucket": "2023-01-01", "x": 0, "y": 1, "tokens": 1},
                {"bucket": "2023-01-01", "x": 1, "y": "3", "tokens": 2},
            ]),
            0.01,
        ))
    });
    let params = ParamBag::new().with("minWordCount", "2");

    let result = expect_ok(load_chart(&store, "wordDistributionByTime", &params).await);
    assert_eq!(result.server_series[1].y, 3.0);
    assert_eq!(result.server_series[1].bucket, Some(json!("2023-01-01")));
}

#[tokio::test]
async fn test_store_failure_surfaces_message() {
    let store = scripted_store(|_| {
        Err(Error::Query(
            "store error (400): Code: 62. Syntax error".to_string(),
        ))
    });

    match load_chart(&store, "topWords", &ParamBag::new().with("article", "false")).await {
        ChartOutcome::Failed(message) => assert!(message.contains("Syntax error")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_requests_send_nothing() {
    let store = scripted_store(|_| Ok(body(json!([]), 0.0)));

    let outcome = load_chart(&store, "wordDistribution", &ParamBag::new()).await;
    assert!(matches!(outcome, ChartOutcome::Invalid { .. }));

    let params = ParamBag::new().with("volumeVariant", "bytes");
    let outcome = load_chart(&store, "messageDistribution", &params).await;
    assert!(matches!(outcome, ChartOutcome::Invalid { ref name, .. } if name == "volumeVariant"));

    let outcome = load_chart(&store, "heatmap", &ParamBag::new()).await;
    assert_eq!(outcome, ChartOutcome::NotFound("heatmap".to_string()));

    assert!(store.transport().sent().is_empty());
}

// ============================================
// Live store scenarios
// ============================================

async fn live_store() -> Option<Store<HttpTransport>> {
    let url = std::env::var("LEXISCOPE_TEST_CLICKHOUSE_URL").ok()?;
    let config = StoreConfig {
        url,
        database: format!("lexiscope_test_{}", uuid::Uuid::new_v4().simple()),
        retry_interval_ms: 200,
        ..Default::default()
    };
    let store = Store::from_config(&config).expect("invalid live store config");
    store.connect().await;
    Some(store)
}

fn word(user: &str, y: i32, m: u32, d: u32, text: &str) -> WordEvent {
    WordEvent {
        date_time: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        text: text.to_string(),
        user_id: UserId::new(user),
        position: Position::Center,
        message_length: MessageLength::Short,
        debug: String::new(),
    }
}

fn message(user: &str, chat: &str, d: u32) -> MessageEvent {
    MessageEvent {
        date_time: Utc.with_ymd_and_hms(2023, 5, d, 8, 0, 0).unwrap(),
        user_id: UserId::new(user),
        chat_id: chat.to_string(),
        is_chat: false,
        word_count: 3,
        symbol_count: 14,
        time_since_last_send: 60,
        time_since_last_receive: 5,
    }
}

async fn chart(store: &Store<HttpTransport>, name: &str, params: ParamBag) -> ChartResult {
    expect_ok(load_chart(store, name, &params).await)
}

async fn total_words(store: &Store<HttpTransport>) -> f64 {
    let result = chart(store, "stats", ParamBag::new()).await;
    result
        .server_series
        .iter()
        .find(|p| p.x == json!("totalWords"))
        .map(|p| p.y)
        .expect("stats without totalWords")
}

#[tokio::test]
#[ignore]
async fn live_word_count_by_quarter() {
    let Some(store) = live_store().await else {
        return;
    };
    store
        .insert(
            Table::Word,
            &[
                word("u1", 2023, 1, 15, "hello"),
                word("u1", 2023, 2, 20, "world"),
                word("u1", 2023, 4, 10, "again"),
            ],
        )
        .await
        .unwrap();

    let result = chart(&store, "wordCountByTime", ParamBag::new()).await;
    let ys: Vec<f64> = result.server_series.iter().map(|p| p.y).collect();
    assert_eq!(ys, vec![2.0, 1.0]);

    let xs: Vec<String> = result.server_series.iter().map(|p| p.x.to_string()).collect();
    assert!(xs[0] < xs[1], "buckets not ascending: {:?}", xs);
    assert!(result.user_series.is_none());
}

#[tokio::test]
#[ignore]
async fn live_insert_round_trip_and_empty_batch() {
    let Some(store) = live_store().await else {
        return;
    };
    let before = total_words(&store).await;

    let batch: Vec<WordEvent> = (1..=5).map(|d| word("u1", 2023, 3, d, "batch")).collect();
    store.insert(Table::Word, &batch).await.unwrap();
    assert_eq!(total_words(&store).await, before + 5.0);

    let empty: Vec<WordEvent> = Vec::new();
    store.insert(Table::Word, &empty).await.unwrap();
    assert_eq!(total_words(&store).await, before + 5.0);
}

#[tokio::test]
#[ignore]
async fn live_user_buckets_are_subset_of_server_buckets() {
    let Some(store) = live_store().await else {
        return;
    };
    store
        .insert(
            Table::Word,
            &[
                word("u1", 2023, 1, 5, "one"),
                word("u2", 2023, 4, 5, "two"),
                word("u2", 2023, 8, 5, "three"),
                word("u1", 2023, 8, 6, "four"),
            ],
        )
        .await
        .unwrap();

    let result = chart(&store, "wordCountByTime", ParamBag::new().with("userId", "u1")).await;
    let server: Vec<_> = result.server_series.iter().map(|p| p.x.clone()).collect();
    let user = result.user_series.expect("scoped chart without user series");

    assert_eq!(user.len(), 2);
    for point in &user {
        assert!(server.contains(&point.x), "{} not in {:?}", point.x, server);
    }
}

#[tokio::test]
#[ignore]
async fn live_single_chat_concentration_is_flat() {
    let Some(store) = live_store().await else {
        return;
    };
    let messages: Vec<MessageEvent> = (1..=3).map(|d| message("u1", "c1", d)).collect();
    store.insert(Table::Message, &messages).await.unwrap();

    let result = chart(&store, "messageDistribution", ParamBag::new()).await;
    assert_eq!(result.server_series.len(), 100);
    for (i, point) in result.server_series.iter().enumerate() {
        assert_eq!(point.x, json!(i));
        assert_eq!(point.y, 1.0);
    }
}

#[tokio::test]
#[ignore]
async fn live_word_distribution_shape() {
    let Some(store) = live_store().await else {
        return;
    };
    let texts = ["alpha", "beta", "gamma", "delta", "epsilon", "zeta"];
    let mut words = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        for d in 0..=(i as u32 * 3) {
            words.push(word("u1", 2023, 6, 1 + d % 28, text));
        }
    }
    store.insert(Table::Word, &words).await.unwrap();

    let result = chart(&store, "wordDistribution", ParamBag::new().with("minWordCount", "0")).await;
    assert!(!result.server_series.is_empty());

    let mut last_y = f64::MIN;
    for point in &result.server_series {
        let x = point.x.as_f64().expect("numeric percentile");
        assert!((0.0..=99.0).contains(&x), "percentile out of range: {}", x);
        assert!(point.y >= last_y, "y decreased at x={}", x);
        last_y = point.y;
    }
}
