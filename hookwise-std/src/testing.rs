//! Testing utilities for hookwise.
//!
//! Stand-ins for the network-facing pieces, so dispatch can be exercised
//! without an API to talk to.
//!
//! # Features
//!
//! - [`MockClient`]: an [`ApiClient`] answering from a table of canned responses
//! - [`MockClientFactory`]: builds mock clients and records the credentials it saw
//! - [`StubIssuer`]: a [`TokenIssuer`] that counts what it signs and issues
//! - [`RecordingHandler`]: a handler that records events and can fail or panic
//! - [`LogCapture`]: a tracing layer that keeps every emitted event

use async_trait::async_trait;
use hookwise_core::{
    ApiClient, ApiRequest, ApiResponse, AuthError, BoxError, ClientError, ClientScope, Context,
    Credentials, Event, Handler, InstallationId, SharedClient,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

use crate::auth::issuer::{IssuedToken, TokenIssuer};
use crate::client::ClientFactory;

// ============================================================================
// Mock Client
// ============================================================================

#[derive(Default)]
struct MockState {
    responses: Mutex<HashMap<String, ApiResponse>>,
    requests: Mutex<Vec<ApiRequest>>,
}

/// An [`ApiClient`] that answers from canned responses keyed by path.
///
/// Clones share responses and the request log. Requests for a path with no
/// response fail with a 404 [`ClientError::Status`].
///
/// # Example
///
/// ```rust,ignore
/// let client = MockClient::new(ClientScope::App);
/// client.respond("/app", ApiResponse::ok(json!({ "slug": "bot" })));
///
/// let app = client.request(ApiRequest::get("/app")).await?;
/// assert_eq!(client.requests().len(), 1);
/// ```
#[derive(Clone)]
pub struct MockClient {
    scope: ClientScope,
    state: Arc<MockState>,
}

impl MockClient {
    /// Create a mock client with the given scope.
    pub fn new(scope: ClientScope) -> Self {
        Self::with_state(scope, Arc::default())
    }

    fn with_state(scope: ClientScope, state: Arc<MockState>) -> Self {
        Self { scope, state }
    }

    /// Answer requests for `path` with `response`.
    pub fn respond(&self, path: impl Into<String>, response: ApiResponse) {
        self.state.responses.lock().insert(path.into(), response);
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.requests.lock().clone()
    }
}

#[async_trait]
impl ApiClient for MockClient {
    async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self.state.responses.lock().get(&request.path).cloned();
        self.state.requests.lock().push(request.clone());
        response.ok_or_else(|| ClientError::Status {
            status: 404,
            message: format!("no mock response for {}", request.path),
        })
    }

    fn scope(&self) -> ClientScope {
        self.scope
    }
}

impl fmt::Debug for MockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockClient")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// A [`ClientFactory`] building [`MockClient`]s.
///
/// Every built client shares one response table and request log, reachable
/// through [`MockClientFactory::client`].
#[derive(Clone, Default)]
pub struct MockClientFactory {
    state: Arc<MockState>,
    built: Arc<Mutex<Vec<Credentials>>>,
}

impl MockClientFactory {
    /// Create a factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A client sharing the factory's responses, for setting them up.
    pub fn client(&self) -> MockClient {
        MockClient::with_state(ClientScope::App, Arc::clone(&self.state))
    }

    /// Credentials of every client built so far.
    pub fn built(&self) -> Vec<Credentials> {
        self.built.lock().clone()
    }
}

impl ClientFactory for MockClientFactory {
    fn build(&self, credentials: Credentials) -> SharedClient {
        let scope = credentials.scope();
        self.built.lock().push(credentials);
        Arc::new(MockClient::with_state(scope, Arc::clone(&self.state)))
    }
}

// ============================================================================
// Stub Issuer
// ============================================================================

#[derive(Default)]
struct IssuerCounters {
    jwts: AtomicUsize,
    issued: AtomicUsize,
    fail_next: AtomicBool,
}

/// A [`TokenIssuer`] that never leaves the process.
///
/// Tokens look like `token-<installation>-<n>`, where `n` counts issuance
/// attempts. Clones share the counters.
#[derive(Clone)]
pub struct StubIssuer {
    ttl: Duration,
    delay: Option<Duration>,
    counters: Arc<IssuerCounters>,
}

impl StubIssuer {
    /// Create an issuer handing out tokens that live for an hour.
    pub fn new() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            delay: None,
            counters: Arc::default(),
        }
    }

    /// Lifetime of issued tokens.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sleep before answering each issuance request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the next issuance fail with status 500.
    pub fn fail_next_issuance(&self) {
        self.counters.fail_next.store(true, Ordering::SeqCst);
    }

    /// Number of app JWTs signed.
    pub fn jwt_count(&self) -> usize {
        self.counters.jwts.load(Ordering::SeqCst)
    }

    /// Number of issuance attempts, failed ones included.
    pub fn issued_count(&self) -> usize {
        self.counters.issued.load(Ordering::SeqCst)
    }
}

impl Default for StubIssuer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenIssuer for StubIssuer {
    fn app_jwt(&self) -> Result<String, AuthError> {
        let n = self.counters.jwts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("jwt-{n}"))
    }

    async fn create_installation_token(
        &self,
        installation: InstallationId,
    ) -> Result<IssuedToken, AuthError> {
        let n = self.counters.issued.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.counters.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AuthError::Issuance {
                installation,
                status: 500,
                message: "stub issuance failure".to_string(),
            });
        }
        Ok(IssuedToken {
            token: format!("token-{installation}-{n}"),
            expires_in: self.ttl,
        })
    }
}

// ============================================================================
// Recording Handler
// ============================================================================

#[derive(Debug, Clone)]
enum Outcome {
    Succeed,
    Fail(String),
    Panic(String),
}

/// What a [`RecordingHandler`] saw for one call.
#[derive(Debug, Clone)]
pub struct Call {
    /// The event.
    pub event: Arc<Event>,
    /// Scope of the client in the context.
    pub scope: ClientScope,
}

/// A handler that records every call.
///
/// By default it succeeds. It can be told to fail or panic, optionally after
/// sleeping, to exercise every way a handler can go wrong.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::new();
/// builder.on("issues.opened", recorder.clone())?;
///
/// app.receive(event).await?;
/// assert_eq!(recorder.count(), 1);
/// ```
#[derive(Clone)]
pub struct RecordingHandler {
    outcome: Outcome,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<Call>>>,
    finished: Arc<AtomicUsize>,
}

impl RecordingHandler {
    /// A handler that succeeds.
    pub fn new() -> Self {
        Self::with_outcome(Outcome::Succeed)
    }

    /// A handler that returns an error with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Fail(message.into()))
    }

    /// A handler that panics with `message`.
    pub fn panicking(message: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Panic(message.into()))
    }

    fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            delay: None,
            calls: Arc::default(),
            finished: Arc::default(),
        }
    }

    /// Sleep before finishing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call so far, in call order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of calls.
    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of calls that ran to the end, failures included.
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Default for RecordingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for RecordingHandler {
    async fn call(&self, event: Arc<Event>, context: Context) -> Result<(), BoxError> {
        self.calls.lock().push(Call {
            event,
            scope: context.client().scope(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);

        match &self.outcome {
            Outcome::Succeed => Ok(()),
            Outcome::Fail(message) => Err(message.clone().into()),
            Outcome::Panic(message) => panic!("{message}"),
        }
    }
}

// ============================================================================
// Log Capture
// ============================================================================

/// One event captured by [`LogCapture`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Level.
    pub level: Level,
    /// The event's message.
    pub message: String,
    /// The event's own fields.
    pub fields: BTreeMap<String, String>,
    /// Fields of every span the event was emitted in, innermost last.
    pub span_fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// A field of the event or, failing that, of its spans.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .or_else(|| self.span_fields.get(name))
            .map(String::as_str)
    }
}

/// A tracing layer keeping every event for later inspection.
///
/// # Example
///
/// ```rust,ignore
/// let logs = LogCapture::new();
/// let _guard = logs.set_default();
///
/// dispatcher.receive(event).await.unwrap_err();
/// assert_eq!(logs.at_level(Level::ERROR).len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    /// Create an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the capture as the current thread's subscriber.
    pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    /// Every captured event.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Captured events at exactly `level`.
    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.level == level)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }
}

impl FieldVisitor {
    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

struct SpanFields(BTreeMap<String, String>);

impl<S> Layer<S> for LogCapture
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: LayerContext<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(visitor.fields));
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: LayerContext<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut span_fields = BTreeMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(fields.0.clone());
                }
            }
        }

        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
            span_fields,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_answers_known_paths_only() {
        let client = MockClient::new(ClientScope::App);
        client.respond("/app", ApiResponse::ok(serde_json::json!({ "slug": "bot" })));

        let app = client.request(ApiRequest::get("/app")).await.unwrap();
        assert_eq!(app.body["slug"], "bot");

        let err = client.request(ApiRequest::get("/nope")).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 404, .. }));
        assert_eq!(client.requests().len(), 2);
    }

    #[test]
    fn factory_records_credentials_and_scopes() {
        let factory = MockClientFactory::new();
        let client = factory.build(Credentials::Installation {
            id: InstallationId::new(3),
            token: "t".into(),
        });

        assert_eq!(client.scope(), ClientScope::Installation(InstallationId::new(3)));
        assert_eq!(factory.built().len(), 1);
    }

    #[test]
    fn log_capture_keeps_span_fields() {
        let logs = LogCapture::new();
        let _guard = logs.set_default();

        let span = tracing::info_span!("event", id = "d-1");
        span.in_scope(|| tracing::warn!(attempt = 2, "slow"));

        let events = logs.at_level(Level::WARN);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "slow");
        assert_eq!(events[0].field("attempt"), Some("2"));
        assert_eq!(events[0].field("id"), Some("d-1"));
    }
}
