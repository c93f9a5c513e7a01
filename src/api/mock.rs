//! # Mock Transport
//!
//! In-memory [`Transport`] for testing endpoint clients without a backend.
//!
//! Expectations are consumed in FIFO order. Each one matches on method and
//! target, optionally on query pairs, and answers with a canned JSON value
//! or an [`ApiError`]. Every request is recorded so tests can assert on the
//! exact body that went out.
//!
//! ```ignore
//! let mock = MockTransport::new();
//! mock.expect(Method::Get, Target::Rest("orders".into()))
//!     .with_query("id", "eq.order-1")
//!     .return_ok(json!({ "id": "order-1", ... }));
//!
//! let orders = OrderClient::new(QueryClient::new(Arc::new(mock.clone()), cache));
//! orders.get_order(&"order-1".into(), false).await?;
//! mock.verify();
//! ```

use crate::api::{ApiError, ApiRequest, Method, Target, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct Expectation {
    method: Method,
    target: Target,
    query: Vec<(String, String)>,
    response: Result<Value, ApiError>,
}

impl Expectation {
    fn matches(&self, request: &ApiRequest) -> bool {
        self.method == request.method
            && self.target == request.target
            && self
                .query
                .iter()
                .all(|(k, v)| request.query_value(k) == Some(v.as_str()))
    }
}

#[derive(Default)]
struct State {
    expectations: VecDeque<Expectation>,
    requests: Vec<ApiRequest>,
}

/// A transport with expectation tracking for fluent testing.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a request to `target` with `method`.
    pub fn expect(&self, method: Method, target: Target) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            target,
            query: Vec::new(),
            state: self.state.clone(),
        }
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().unwrap().expectations.len()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = self.remaining();
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        match state.expectations.pop_front() {
            Some(expectation) if expectation.matches(&request) => expectation.response,
            Some(expectation) => panic!(
                "Unexpected request {} (expected {} {})",
                request,
                expectation.method.as_str(),
                expectation.target.path()
            ),
            None => panic!("Unexpected request {} (no expectations left)", request),
        }
    }
}

/// Builder for a single expectation.
pub struct ExpectationBuilder {
    method: Method,
    target: Target,
    query: Vec<(String, String)>,
    state: Arc<Mutex<State>>,
}

impl ExpectationBuilder {
    /// Requires a query pair on the matching request.
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: Value) {
        self.push(Ok(value));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: ApiError) {
        self.push(Err(error));
    }

    /// Queues the same successful response `times` times.
    pub fn return_ok_times(self, value: Value, times: usize) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..times {
            state.expectations.push_back(Expectation {
                method: self.method,
                target: self.target.clone(),
                query: self.query.clone(),
                response: Ok(value.clone()),
            });
        }
    }

    fn push(self, response: Result<Value, ApiError>) {
        let mut state = self.state.lock().unwrap();
        state.expectations.push_back(Expectation {
            method: self.method,
            target: self.target,
            query: self.query,
            response,
        });
    }
}
