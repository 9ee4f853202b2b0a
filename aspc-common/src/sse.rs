//! Server-Sent Events (SSE) utilities
//!
//! Turns an EventBus subscription into an SSE response stream.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::events::{EventBus, SignalEvent};

/// Build an SSE stream of bus events
///
/// When `junction_filter` is set, only events for that junction are
/// forwarded. Lagged receivers skip the lost events and keep streaming.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(ctx): State<AppContext>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     aspc_common::sse::event_stream(&ctx.event_bus, None)
/// }
/// ```
pub fn event_stream(
    bus: &EventBus,
    junction_filter: Option<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected (filter: {:?})", junction_filter);

    let rx = bus.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let filter = junction_filter.clone();
        async move {
            match result {
                Ok(event) => {
                    if let Some(ref id) = filter {
                        if event.junction_id() != id {
                            return None;
                        }
                    }
                    to_sse_event(&event)
                }
                Err(e) => {
                    // Lagged receiver; keep going with newer events
                    warn!("SSE stream error: {:?}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_sse_event(event: &SignalEvent) -> Option<Result<Event, Infallible>> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}
