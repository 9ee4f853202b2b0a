//! Server-Sent Events endpoint

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;

use crate::api::server::AppContext;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only stream events for this junction
    junction: Option<String>,
}

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    aspc_common::sse::event_stream(&ctx.event_bus, query.junction)
}
