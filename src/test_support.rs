// test_support.rs - Scripted HTTP transport for unit tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::http::{HttpRequest, HttpResponse, HttpTransport, TransportError};

#[derive(Debug, Clone)]
pub enum Reply {
    Respond(HttpResponse),
    Fail(TransportError),
    /// Never completes; only a timeout or cancellation ends the call.
    Hang,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Reply {
        Reply::Respond(HttpResponse { status, body: body.to_string() })
    }

    pub fn text(status: u16, body: &str) -> Reply {
        Reply::Respond(HttpResponse { status, body: body.to_string() })
    }

    pub fn network(message: &str) -> Reply {
        Reply::Fail(TransportError::Network(message.to_string()))
    }
}

/// Requests matching a route fragment get that route's reply every time;
/// everything else pops the FIFO queue, and an empty queue is a network error.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<(String, Reply)>>,
    queue: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Reply) {
        self.queue.lock().unwrap().push_back(reply);
    }

    pub fn route(&self, url_fragment: &str, reply: Reply) {
        self.routes.lock().unwrap().push((url_fragment.to_string(), reply));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, url_fragment: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.contains(url_fragment))
            .collect()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let routed = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone());
        routed
            .or_else(|| self.queue.lock().unwrap().pop_front())
            .unwrap_or_else(|| Reply::network("no scripted reply"))
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self.next_reply(&request.url);
        self.requests.lock().unwrap().push(request);
        match reply {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(error) => Err(error),
            Reply::Hang => std::future::pending().await,
        }
    }
}

/// Chat-completions style success body.
pub fn chat_reply(text: &str) -> Reply {
    Reply::json(200, serde_json::json!({"choices": [{"message": {"content": text}}]}))
}
