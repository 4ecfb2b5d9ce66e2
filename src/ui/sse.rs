//! Server-sent event stream of live readings
//!
//! Each connection owns one hub subscriber. The first event is a `snapshot`
//! of every device, then one `reading` event per accepted packet. When the
//! client goes away axum drops the stream, which drops the subscriber and
//! unregisters it.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::Utc;
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;

use super::handlers::ApiError;
use crate::hub::HubEvent;
use crate::ui::server::AppState;

pub async fn live_stream(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let subscriber = state
        .service
        .subscribe(Utc::now())
        .map_err(|e| ApiError::Internal(format!("snapshot serialization failed: {}", e)))?;

    let stream = stream::unfold(subscriber, |mut subscriber| async move {
        let event = subscriber.recv().await?;
        Some((Ok(to_sse_event(&event)), subscriber))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &HubEvent) -> Event {
    Event::default().event(event.kind.as_str()).data(&*event.data)
}
