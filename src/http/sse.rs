//! Heartbeat event stream
//!
//! Sends a reconnect hint and a `connected` event, then a `ping` every
//! interval until the configured lifetime runs out. Independent of the dispatcher.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use chrono::Utc;
use futures::Stream;
use serde_json::json;
use tokio::time::{interval_at, Instant};
use tracing::debug;

use crate::config::SseConfig;
use crate::AppState;

pub async fn heartbeat(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(heartbeat_events(state.context.config().sse))
}

pub fn heartbeat_events(config: SseConfig) -> impl Stream<Item = Result<Event, Infallible>> {
    stream! {
        let started = Instant::now();
        let deadline = started + config.timeout;

        yield Ok::<Event, Infallible>(Event::default().retry(config.retry));
        yield Ok(Event::default()
            .event("connected")
            .data(json!({ "type": "connected", "timestamp": Utc::now().timestamp() }).to_string()));

        if !config.interval.is_zero() {
            let mut ticker = interval_at(started + config.interval, config.interval);
            loop {
                ticker.tick().await;
                if Instant::now() >= deadline {
                    break;
                }
                yield Ok(Event::default()
                    .event("ping")
                    .data(json!({ "timestamp": Utc::now().timestamp() }).to_string()));
            }
        } else {
            tokio::time::sleep_until(deadline).await;
        }

        debug!("heartbeat stream finished");
    }
}
