// src/api/sse.rs

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use std::convert::Infallible;

use crate::core::models::{JobStatus, ScanEvent, Source};
use crate::core::stream::ScanStream;

/// Server-sent-event form of one stream item.
///
/// Hosts use the default `message` event; notices are `info`; the terminal
/// event is named after how the job ended.
pub fn encode(event: &ScanEvent, source: Source) -> Event {
    match event {
        ScanEvent::Host(host) => Event::default().data(single_line(host)),
        ScanEvent::Notice(text) => Event::default().event("info").data(single_line(text)),
        ScanEvent::Finished(outcome) => {
            let name = match outcome.status() {
                JobStatus::Completed | JobStatus::Running => "complete",
                JobStatus::Failed => "failed",
                JobStatus::Cancelled => "cancelled",
            };
            Event::default()
                .event(name)
                .data(single_line(&outcome.message(source)))
        }
    }
}

/// Upstream error texts may span lines; an SSE data field must not.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Turns the receiving half of a job into the response body. Dropping the
/// body (client disconnect) drops the receiver, which ends the job.
pub fn into_sse(stream: ScanStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let source = stream.source;
    let events = stream::unfold(stream.events, move |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok(encode(&event, source)), rx))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}
