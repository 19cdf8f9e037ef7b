//! Bridge controller: the request/response correlation engine.
//!
//! A [`Bridge`] owns one embedded surface connection. Outbound requests go
//! through [`Bridge::post`]; inbound traffic is fed by the host, in arrival
//! order, to [`Bridge::dispatch`].
//!
//! Each `post` registers a transient listener on `HANDLE_RESPONSE`, sends the
//! envelope, and suspends until every request in the payload has been
//! answered. Responses are matched by correlation id, never by arrival order.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use framebridge_protocol::{
    channel_key, InboundMessage, IncomingMessage, JsonRpcResponse, OutboundEnvelope,
    OutgoingMessage, Payload, Reply, RequestPayload,
};
use tokio::sync::oneshot;

use crate::config::{BridgeConfig, HostEnvironment};
use crate::error::BridgeError;
use crate::messaging::{
    PendingCall, Progress, ReadinessGate, ReadinessPolicy, Subscription, SubscriptionRegistry,
};
use crate::ports::{Storage, TokenSigner, Transport};
use crate::tokens::{RefreshTokenWriter, TokenStore};

/// Handle to one bridge instance. Clones share the same state.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    instance: String,
    environment: HostEnvironment,
    readiness: ReadinessPolicy,
    registry: SubscriptionRegistry,
    gate: ReadinessGate,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    refresh_writer: RefreshTokenWriter,
}

impl Bridge {
    /// Initialize the transport, then build the bridge.
    pub async fn connect(
        config: &BridgeConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        signer: Arc<dyn TokenSigner>,
    ) -> Result<Self, BridgeError> {
        transport.init().await?;
        tracing::info!(
            instance = %config.instance(),
            environment = ?config.environment(),
            "Transport initialized"
        );
        Ok(Self::new(config, transport, storage, signer))
    }

    /// Build a bridge over an already initialized transport.
    ///
    /// Installs the permanent readiness and overlay subscriptions and starts
    /// the refresh-token writer, so it must be called within a tokio runtime.
    pub fn new(
        config: &BridgeConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        signer: Arc<dyn TokenSigner>,
    ) -> Self {
        let environment = config.environment();
        let tokens = TokenStore::new(storage, signer, environment.signs_requests());
        let (refresh_writer, _) = tokens.spawn_refresh_writer();
        let inner = BridgeInner {
            instance: config.instance().to_string(),
            environment,
            readiness: config.readiness(),
            registry: SubscriptionRegistry::new(),
            gate: ReadinessGate::new(),
            transport,
            tokens,
            refresh_writer,
        };

        let bridge = Self {
            inner: Arc::new(inner),
        };
        bridge.install_hooks();
        bridge
    }

    fn install_hooks(&self) {
        let inner = &self.inner;

        let gate = inner.gate.clone();
        let instance = inner.instance.clone();
        inner.registry.subscribe(
            self.channel_key(IncomingMessage::OverlayReady),
            move |_| {
                if gate.mark_ready() {
                    tracing::info!(instance = %instance, "Surface ready");
                }
            },
        );

        let transport = Arc::clone(&inner.transport);
        inner.registry.subscribe(
            self.channel_key(IncomingMessage::ShowOverlay),
            move |_| transport.show_overlay(),
        );

        let transport = Arc::clone(&inner.transport);
        inner.registry.subscribe(
            self.channel_key(IncomingMessage::HideOverlay),
            move |_| transport.hide_overlay(),
        );
    }

    /// Instance suffix scoping this bridge's channel keys.
    pub fn instance(&self) -> &str {
        &self.inner.instance
    }

    pub fn environment(&self) -> HostEnvironment {
        self.inner.environment
    }

    /// Scoped channel key for a message type.
    pub fn channel_key(&self, message_type: impl fmt::Display) -> String {
        channel_key(message_type, &self.inner.instance)
    }

    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_ready()
    }

    /// Wait until the surface has signalled readiness.
    pub async fn wait_ready(&self) {
        self.inner.gate.wait_ready().await
    }

    /// Post a payload and wait for all of its responses.
    ///
    /// A single request resolves to [`Reply::Single`]; a batch resolves to
    /// [`Reply::Batch`] ordered like the request, regardless of arrival order.
    /// Application errors come back inside the responses, not as `Err`.
    ///
    /// An empty batch is still sent, then resolves immediately to an empty
    /// [`Reply::Batch`] since no response can ever match it.
    ///
    /// There is no timeout: if the surface never answers, this never returns.
    /// Dropping the future leaves its listener registered until [`Bridge::close`].
    pub async fn post(
        &self,
        message_type: OutgoingMessage,
        payload: impl Into<Payload>,
    ) -> Result<Reply, BridgeError> {
        self.post_inner(message_type, payload.into(), None).await
    }

    /// Like [`Bridge::post`], but gives up waiting for responses after `after`.
    ///
    /// The deadline covers the response wait only, not the readiness gate.
    /// On expiry the transient listener is removed.
    pub async fn post_with_timeout(
        &self,
        message_type: OutgoingMessage,
        payload: impl Into<Payload>,
        after: Duration,
    ) -> Result<Reply, BridgeError> {
        self.post_inner(message_type, payload.into(), Some(after)).await
    }

    /// Send one request and return its response.
    pub async fn request(&self, request: RequestPayload) -> Result<JsonRpcResponse, BridgeError> {
        self.post(OutgoingMessage::HandleRequest, request)
            .await?
            .into_single()
            .ok_or(BridgeError::ReplyShape { expected: "single" })
    }

    /// Send a batch and return its responses in request order.
    pub async fn request_batch(
        &self,
        requests: Vec<RequestPayload>,
    ) -> Result<Vec<JsonRpcResponse>, BridgeError> {
        self.post(OutgoingMessage::HandleRequest, requests)
            .await?
            .into_batch()
            .ok_or(BridgeError::ReplyShape { expected: "batch" })
    }

    async fn post_inner(
        &self,
        message_type: OutgoingMessage,
        payload: Payload,
        timeout: Option<Duration>,
    ) -> Result<Reply, BridgeError> {
        ensure_unique_ids(&payload)?;
        self.pass_gate().await?;

        let expected = payload.len();
        let envelope = self.envelope(message_type, payload.clone()).await;

        // Nothing can answer an empty batch: it is sent, then resolves as-is
        if payload.is_empty() {
            self.send_envelope(message_type, envelope).await?;
            return Ok(Reply::Batch(Vec::new()));
        }

        let (tx, rx) = oneshot::channel();
        let listener = self.listen_for_responses(PendingCall::new(payload, tx));

        if let Err(e) = self.send_envelope(message_type, envelope).await {
            listener.unsubscribe();
            return Err(e);
        }

        tracing::debug!(
            channel_key = %self.channel_key(message_type),
            expected = expected,
            "Request sent, awaiting responses"
        );

        let received = match timeout {
            None => rx.await,
            Some(after) => match tokio::time::timeout(after, rx).await {
                Ok(received) => received,
                Err(_) => {
                    listener.unsubscribe();
                    tracing::debug!(
                        timeout_ms = after.as_millis() as u64,
                        expected = expected,
                        "Request timed out - removed response listener"
                    );
                    return Err(BridgeError::Timeout { after });
                }
            },
        };

        received.map_err(|_| {
            listener.unsubscribe();
            BridgeError::Cancelled
        })
    }

    async fn send_envelope(
        &self,
        message_type: OutgoingMessage,
        envelope: OutboundEnvelope,
    ) -> Result<(), BridgeError> {
        self.inner.transport.send(envelope).await.map_err(|e| {
            tracing::warn!(
                channel_key = %self.channel_key(message_type),
                error = %e,
                "Failed to send request"
            );
            BridgeError::from(e)
        })
    }

    async fn pass_gate(&self) -> Result<(), BridgeError> {
        if self.inner.gate.is_ready() {
            return Ok(());
        }

        match self.inner.readiness {
            ReadinessPolicy::Suspend => {
                tracing::debug!(instance = %self.inner.instance, "Waiting for surface readiness");
                self.inner.gate.wait_ready().await;
                Ok(())
            }
            ReadinessPolicy::FailFast => Err(BridgeError::NotReady),
        }
    }

    async fn envelope(&self, message_type: OutgoingMessage, payload: Payload) -> OutboundEnvelope {
        let auth_token = self.inner.tokens.auth_token().await;
        let refresh_token = self.inner.tokens.refresh_token().await;

        OutboundEnvelope::new(self.channel_key(message_type), payload)
            .with_auth_token(auth_token)
            .with_refresh_token(refresh_token)
    }

    /// Register the transient listener feeding `call`. It removes itself once
    /// the call resolves.
    fn listen_for_responses(&self, call: PendingCall) -> Subscription {
        let call = Mutex::new(call);
        self.inner.registry.subscribe_with(
            self.channel_key(IncomingMessage::HandleResponse),
            move |subscription| {
                move |message: &InboundMessage| {
                    let progress = call
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .accept(message);

                    match progress {
                        Progress::Resolved => {
                            subscription.unsubscribe();
                            tracing::debug!("Request resolved");
                        }
                        Progress::Accepted { remaining } => {
                            tracing::debug!(
                                request_id = ?message.response_id(),
                                remaining = remaining,
                                "Batch response accepted"
                            );
                        }
                        Progress::Ignored => {}
                    }
                }
            },
        )
    }

    /// Subscribe to an incoming message type on this bridge's channel.
    pub fn on<H>(&self, message_type: IncomingMessage, handler: H) -> Subscription
    where
        H: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.inner
            .registry
            .subscribe(self.channel_key(message_type), handler)
    }

    /// Feed one inbound message.
    ///
    /// A refresh token carried by a message for this instance is queued for
    /// persistence exactly once; the write happens on the writer task and
    /// never holds up handlers. Then every matching handler runs. Returns the
    /// number of handlers invoked.
    pub async fn dispatch(&self, message: &InboundMessage) -> usize {
        if message.refresh_token.is_some() && self.is_scoped(message) {
            self.inner.refresh_writer.submit(message);
        }

        let invoked = self.inner.registry.dispatch(message);
        tracing::debug!(
            channel_key = %message.channel_key,
            invoked = invoked,
            "Dispatched inbound message"
        );
        invoked
    }

    /// Decode raw JSON text and dispatch it.
    pub async fn dispatch_text(&self, text: &str) -> Result<usize, BridgeError> {
        let message: InboundMessage = serde_json::from_str(text).map_err(|e| {
            tracing::warn!(error = %e, "Ignoring malformed inbound message");
            BridgeError::Decode(e)
        })?;
        Ok(self.dispatch(&message).await)
    }

    /// Drop every subscription, including the built-in hooks.
    ///
    /// Callers still waiting in `post` get [`BridgeError::Cancelled`]. The
    /// bridge does not recover from this; build a new one.
    pub fn close(&self) {
        let removed = self.inner.registry.clear();
        tracing::info!(
            instance = %self.inner.instance,
            removed = removed,
            "Bridge closed"
        );
    }

    #[cfg(test)]
    pub(crate) fn subscription_count(&self) -> usize {
        self.inner.registry.len()
    }

    fn is_scoped(&self, message: &InboundMessage) -> bool {
        message
            .channel_key
            .strip_suffix(self.inner.instance.as_str())
            .is_some_and(|rest| rest.ends_with('-'))
    }
}

fn ensure_unique_ids(payload: &Payload) -> Result<(), BridgeError> {
    let mut seen = HashSet::new();
    for id in payload.ids() {
        if seen.contains(&id) {
            return Err(BridgeError::DuplicateId(id));
        }
        seen.insert(id);
    }
    Ok(())
}
