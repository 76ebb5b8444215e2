//! Server-sent event stream of sale and expense notifications

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::middleware::CurrentUser;
use crate::AppState;

pub async fn notification_stream(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(user_id = %current_user.0.user_id, "Notification stream opened");

    // Lagged receivers skip the missed events
    let stream = BroadcastStream::new(state.notifier.subscribe()).filter_map(|message| {
        let notification = message.ok()?;
        Event::default()
            .event(notification.event)
            .json_data(&notification.payload)
            .ok()
            .map(Ok)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
