//! Scripted in-memory transport used by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::RcTransport;
use crate::error::RcloneError;

/// Replays queued responses per method. The last queued response repeats.
#[derive(Default)]
pub(crate) struct StubTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, String>>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl StubTransport {
    pub(crate) fn respond(&self, method: &str, value: Value) {
        self.push(method, Ok(value));
    }

    pub(crate) fn reject(&self, method: &str, message: &str) {
        self.push(method, Err(message.to_string()));
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| name == method)
            .map(|(_, body)| body)
            .collect()
    }

    fn push(&self, method: &str, response: Result<Value, String>) {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }
}

#[async_trait]
impl RcTransport for StubTransport {
    async fn call(&self, method: &str, body: Value) -> Result<Value, RcloneError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((method.to_string(), body));

        let scripted = {
            let mut responses = self.responses.lock().expect("responses lock");
            responses.get_mut(method).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };

        match scripted {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(RcloneError::Rejected {
                method: method.to_string(),
                status: 500,
                message,
            }),
            None => Err(RcloneError::Rejected {
                method: method.to_string(),
                status: 404,
                message: format!("couldn't find method {method:?}"),
            }),
        }
    }
}
