//! Aggregate store statistics (`stats` chart)
//!
//! Server series: `totalWords`, `totalMessages`, `totalUsers` and
//! `totalSize` (uncompressed MiB of the configured database). User series:
//! `totalWords` and `totalMessages` for the requesting user. Every figure
//! is one point whose `x` is its name.

use crate::error::{Error, Result};
use crate::executor::{run_series, user_scope, Series};
use crate::plan::{col, count, func, int, lit, param_str, Column, Plan, Table};
use crate::store::{Store, Transport};
use crate::types::{ChartResult, UserId};

const MIB: i64 = 1024 * 1024;

/// Single-row total named `name`.
fn total(table: Table, name: &str, value: Column) -> Plan {
    Plan::scan(table).group(vec![], vec![lit(name).named("x"), value])
}

fn word_total() -> Plan {
    total(Table::Word, "totalWords", count().named("y"))
}

fn message_total() -> Plan {
    total(Table::Message, "totalMessages", count().named("y"))
}

fn user_total() -> Plan {
    total(
        Table::Message,
        "totalUsers",
        func("uniqExact", vec![col("userId")]).named("y"),
    )
}

fn size_total(database: &str) -> Plan {
    Plan::scan(Table::SystemColumns)
        .filter(col("database").equal_to(param_str(database)))
        .group(
            vec![],
            vec![
                lit("totalSize").named("x"),
                (func("sum", vec![col("data_uncompressed_bytes")]) / int(MIB)).named("y"),
            ],
        )
}

fn merge(parts: Vec<Series>) -> Series {
    let mut merged = Series {
        points: Vec::new(),
        elapsed_ms: 0.0,
    };
    for part in parts {
        merged.points.extend(part.points);
        merged.elapsed_ms += part.elapsed_ms;
    }
    merged
}

/// Run all statistics queries concurrently.
pub async fn stats<T: Transport>(store: &Store<T>, user: Option<&UserId>) -> Result<ChartResult> {
    let server = async {
        let (words_plan, messages_plan, users_plan, size_plan) = (
            word_total(),
            message_total(),
            user_total(),
            size_total(store.database()),
        );
        let (words, messages, users, size) = tokio::try_join!(
            run_series(store, &words_plan),
            run_series(store, &messages_plan),
            run_series(store, &users_plan),
            run_series(store, &size_plan),
        )?;
        Ok::<_, Error>(merge(vec![words, messages, users, size]))
    };

    let personal = async {
        let Some(user) = user else {
            return Ok::<_, Error>(None);
        };
        let scope = user_scope(user);
        let words_plan = word_total().scoped(&scope);
        let messages_plan = message_total().scoped(&scope);
        let (words, messages) = tokio::try_join!(
            run_series(store, &words_plan),
            run_series(store, &messages_plan),
        )?;
        Ok(Some(merge(vec![words, messages])))
    };

    let (server, personal) = tokio::try_join!(server, personal)?;
    let personal_elapsed = personal.as_ref().map_or(0.0, |s| s.elapsed_ms);

    Ok(ChartResult {
        server_series: server.points,
        user_series: personal.map(|s| s.points),
        elapsed_ms: server.elapsed_ms + personal_elapsed,
    })
}
