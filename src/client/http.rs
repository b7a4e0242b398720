use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use url::Url;

use super::error::SmsGateError;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
    Delete,
}

#[derive(Debug, Clone)]
pub(crate) struct HttpRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) bearer: Option<String>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<Value>,
}

impl HttpRequest {
    pub(crate) fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            bearer: None,
            query: Vec::new(),
            body: None,
        }
    }

    pub(crate) fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HttpResponse {
    pub(crate) status: u16,
    pub(crate) body: String,
}

impl HttpResponse {
    pub(crate) fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

/// One HTTP exchange. Implementations map "no response received" to
/// [`SmsGateError::Network`] and anything else to [`SmsGateError::Unexpected`].
pub(crate) trait HttpTransport: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, SmsGateError>>;
}

#[derive(Debug, Clone)]
pub(crate) struct ReqwestTransport {
    pub(crate) client: reqwest::Client,
}

impl HttpTransport for ReqwestTransport {
    fn execute<'a>(
        &'a self,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, SmsGateError>> {
        Box::pin(async move {
            let mut url =
                Url::parse(&request.url).map_err(|err| SmsGateError::Unexpected(Box::new(err)))?;
            if !request.query.is_empty() {
                url.query_pairs_mut().extend_pairs(&request.query);
            }

            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Delete => reqwest::Method::DELETE,
            };
            let mut builder = self
                .client
                .request(method, url)
                .header(reqwest::header::ACCEPT, "application/json");
            if let Some(token) = request.bearer.as_deref() {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = request.body.as_ref() {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(SmsGateError::from_reqwest)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(SmsGateError::unreadable_body)?;
            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
pub(crate) use fake::FakeTransport;

#[cfg(test)]
mod fake {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone)]
    enum Scripted {
        Reply(u16, String),
        Unreachable,
    }

    /// Records every request and replays scripted responses in order.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeTransport {
        state: Arc<Mutex<FakeTransportState>>,
    }

    #[derive(Debug, Default)]
    struct FakeTransportState {
        requests: Vec<HttpRequest>,
        script: VecDeque<Scripted>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn reply(self, status: u16, body: impl Into<String>) -> Self {
            self.push(Scripted::Reply(status, body.into()));
            self
        }

        pub(crate) fn unreachable(self) -> Self {
            self.push(Scripted::Unreachable);
            self
        }

        pub(crate) fn requests(&self) -> Vec<HttpRequest> {
            self.state.lock().unwrap().requests.clone()
        }

        pub(crate) fn calls(&self) -> usize {
            self.state.lock().unwrap().requests.len()
        }

        fn push(&self, scripted: Scripted) {
            self.state.lock().unwrap().script.push_back(scripted);
        }
    }

    impl HttpTransport for FakeTransport {
        fn execute<'a>(
            &'a self,
            request: &'a HttpRequest,
        ) -> BoxFuture<'a, Result<HttpResponse, SmsGateError>> {
            Box::pin(async move {
                let scripted = {
                    let mut state = self.state.lock().unwrap();
                    state.requests.push(request.clone());
                    state.script.pop_front()
                };
                match scripted {
                    Some(Scripted::Reply(status, body)) => Ok(HttpResponse { status, body }),
                    Some(Scripted::Unreachable) => Err(SmsGateError::Network(Box::new(
                        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                    ))),
                    None => panic!("no scripted response for {}", request.url),
                }
            })
        }
    }
}
