//! Command handlers grouped by concern.

use std::future::Future;

use cloudpull_events::EventStream;

use crate::output::print_event;

pub(crate) mod config;
pub(crate) mod ls;
pub(crate) mod pull;
pub(crate) mod remotes;

/// Drive `future` to completion while echoing run log lines from `stream`.
pub(crate) async fn follow<F: Future>(future: F, stream: &mut EventStream) -> F::Output {
    tokio::pin!(future);
    let output = loop {
        tokio::select! {
            output = &mut future => break output,
            Some(envelope) = stream.next() => print_event(&envelope),
        }
    };
    for envelope in stream.drain_ready() {
        print_event(&envelope);
    }
    output
}
