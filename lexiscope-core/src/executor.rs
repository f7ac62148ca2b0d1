//! Dual-scope execution
//!
//! A chart plan runs server-wide and, when a user is given, a second time
//! with the user filter applied to every event scan. Both runs are issued
//! concurrently against the same store.

use crate::error::Result;
use crate::plan::{col, func, int, param_str, Plan, Predicate};
use crate::store::{Store, Transport};
use crate::types::{ChartResult, Point, UserId};

/// `userId = toFixedString({p:String}, 64)`
pub fn user_scope(user: &UserId) -> Predicate {
    col("userId").equal_to(func(
        "toFixedString",
        vec![param_str(user.as_str()), int(UserId::WIDTH as i64)],
    ))
}

/// One executed series with the store-reported elapsed time.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub points: Vec<Point>,
    pub elapsed_ms: f64,
}

/// Run a plan and decode its `x`/`y` (and optional `bucket`) columns.
pub async fn run_series<T: Transport>(store: &Store<T>, plan: &Plan) -> Result<Series> {
    let output = store.execute::<Point>(plan).await?;
    Ok(Series {
        points: output.rows,
        elapsed_ms: output.stats.elapsed_ms,
    })
}

/// Run `plan` server-wide and, if `user` is set, scoped to that user.
///
/// Either query failing fails the whole request. `elapsed_ms` is the sum of
/// both runs.
pub async fn run_dual<T: Transport>(
    store: &Store<T>,
    plan: &Plan,
    user: Option<&UserId>,
) -> Result<ChartResult> {
    match user {
        None => {
            let server = run_series(store, plan).await?;
            Ok(ChartResult {
                server_series: server.points,
                user_series: None,
                elapsed_ms: server.elapsed_ms,
            })
        }
        Some(user) => {
            let scoped = plan.scoped(&user_scope(user));
            let (server, personal) =
                tokio::try_join!(run_series(store, plan), run_series(store, &scoped))?;
            Ok(ChartResult {
                server_series: server.points,
                user_series: Some(personal.points),
                elapsed_ms: server.elapsed_ms + personal.elapsed_ms,
            })
        }
    }
}
