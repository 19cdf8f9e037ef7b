//! Auth and refresh token handling.
//!
//! Tokens are a side channel: a missing or unreadable token never fails a
//! request. Failures are logged and the envelope goes out without it.
//!
//! Refresh tokens arriving from the surface are written by a
//! [`RefreshTokenWriter`] task, off the inbound dispatch path, so slow storage
//! never delays call resolution.

use std::sync::Arc;

use framebridge_protocol::InboundMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::ports::{storage_keys, Storage, TokenSigner};

#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn Storage>,
    signer: Arc<dyn TokenSigner>,
    sign_requests: bool,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn Storage>, signer: Arc<dyn TokenSigner>, sign_requests: bool) -> Self {
        Self {
            storage,
            signer,
            sign_requests,
        }
    }

    /// Stored refresh token, if any.
    pub async fn refresh_token(&self) -> Option<String> {
        match self.storage.get(storage_keys::REFRESH_TOKEN).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read refresh token");
                None
            }
        }
    }

    /// Auth token for an outbound request.
    ///
    /// `None` when this host does not sign. Otherwise the stored `jwt`, falling
    /// back to a freshly signed token.
    pub async fn auth_token(&self) -> Option<String> {
        if !self.sign_requests {
            return None;
        }

        match self.storage.get(storage_keys::AUTH_TOKEN).await {
            Ok(Some(token)) => return Some(token),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read stored auth token"),
        }

        match self.signer.create_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to sign auth token, sending without it");
                None
            }
        }
    }

    /// Persist the refresh token carried by `message`.
    ///
    /// Returns true if a token was written.
    pub async fn persist_refresh_token(&self, message: &InboundMessage) -> bool {
        match message.refresh_token.as_deref() {
            Some(token) => self.store_refresh_token(&message.channel_key, token).await,
            None => false,
        }
    }

    async fn store_refresh_token(&self, channel_key: &str, token: &str) -> bool {
        match self.storage.set(storage_keys::REFRESH_TOKEN, token).await {
            Ok(()) => {
                tracing::debug!(channel_key = %channel_key, "Persisted refresh token");
                true
            }
            Err(e) => {
                tracing::warn!(
                    channel_key = %channel_key,
                    error = %e,
                    "Failed to persist refresh token"
                );
                false
            }
        }
    }

    /// Start the background refresh-token writer.
    ///
    /// Must be called within a tokio runtime. The task ends once every
    /// [`RefreshTokenWriter`] clone is dropped and the queue is drained.
    pub fn spawn_refresh_writer(&self) -> (RefreshTokenWriter, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedToken>();
        let tokens = self.clone();

        let task = tokio::spawn(async move {
            while let Some(queued) = rx.recv().await {
                tokens
                    .store_refresh_token(&queued.channel_key, &queued.token)
                    .await;
            }
        });

        (RefreshTokenWriter { tx }, task)
    }
}

struct QueuedToken {
    channel_key: String,
    token: String,
}

/// Queue feeding the refresh-token writer task.
///
/// Tokens are written one at a time in submission order, so the last token
/// received is the one left in storage.
#[derive(Clone)]
pub struct RefreshTokenWriter {
    tx: mpsc::UnboundedSender<QueuedToken>,
}

impl RefreshTokenWriter {
    /// Queue the refresh token carried by `message`. Never waits on storage.
    ///
    /// Returns true if a token was queued.
    pub fn submit(&self, message: &InboundMessage) -> bool {
        let Some(token) = message.refresh_token.as_ref() else {
            return false;
        };

        let queued = QueuedToken {
            channel_key: message.channel_key.clone(),
            token: token.clone(),
        };
        if self.tx.send(queued).is_err() {
            tracing::warn!(
                channel_key = %message.channel_key,
                "Refresh token writer stopped, dropping token"
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockStorage, MockTokenSigner, SigningError, StorageError};
    use mockall::predicate::eq;

    fn no_signer() -> MockTokenSigner {
        let mut signer = MockTokenSigner::new();
        signer.expect_create_token().never();
        signer
    }

    #[tokio::test]
    async fn test_auth_token_prefers_stored_jwt() {
        let mut storage = MockStorage::new();
        storage
            .expect_get()
            .with(eq(storage_keys::AUTH_TOKEN))
            .returning(|_| Ok(Some("stored-jwt".to_string())));

        let tokens = TokenStore::new(Arc::new(storage), Arc::new(no_signer()), true);

        assert_eq!(tokens.auth_token().await.as_deref(), Some("stored-jwt"));
    }

    #[tokio::test]
    async fn test_auth_token_falls_back_to_signer() {
        let mut storage = MockStorage::new();
        storage.expect_get().returning(|_| Ok(None));
        let mut signer = MockTokenSigner::new();
        signer
            .expect_create_token()
            .times(1)
            .returning(|| Ok("signed".to_string()));

        let tokens = TokenStore::new(Arc::new(storage), Arc::new(signer), true);

        assert_eq!(tokens.auth_token().await.as_deref(), Some("signed"));
    }

    #[tokio::test]
    async fn test_signing_failure_yields_none() {
        let mut storage = MockStorage::new();
        storage.expect_get().returning(|_| Ok(None));
        let mut signer = MockTokenSigner::new();
        signer
            .expect_create_token()
            .returning(|| Err(SigningError::Failed("no key".into())));

        let tokens = TokenStore::new(Arc::new(storage), Arc::new(signer), true);

        assert!(tokens.auth_token().await.is_none());
    }

    #[tokio::test]
    async fn test_non_signing_host_never_reads_tokens() {
        let mut storage = MockStorage::new();
        storage.expect_get().with(eq(storage_keys::AUTH_TOKEN)).never();

        let tokens = TokenStore::new(Arc::new(storage), Arc::new(no_signer()), false);

        assert!(tokens.auth_token().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_read_error_is_swallowed() {
        let mut storage = MockStorage::new();
        storage
            .expect_get()
            .with(eq(storage_keys::REFRESH_TOKEN))
            .returning(|_| Err(StorageError::io("read", "disk gone")));

        let tokens = TokenStore::new(Arc::new(storage), Arc::new(no_signer()), true);

        assert!(tokens.refresh_token().await.is_none());
    }

    #[tokio::test]
    async fn test_persist_writes_rt_key() {
        let mut storage = MockStorage::new();
        storage
            .expect_set()
            .with(eq(storage_keys::REFRESH_TOKEN), eq("new-rt"))
            .times(1)
            .returning(|_, _| Ok(()));

        let tokens = TokenStore::new(Arc::new(storage), Arc::new(no_signer()), true);
        let msg = InboundMessage::new("HANDLE_RESPONSE-x").with_refresh_token("new-rt");

        assert!(tokens.persist_refresh_token(&msg).await);
    }

    #[tokio::test]
    async fn test_persist_skips_messages_without_token() {
        let mut storage = MockStorage::new();
        storage.expect_set().never();

        let tokens = TokenStore::new(Arc::new(storage), Arc::new(no_signer()), true);

        assert!(!tokens.persist_refresh_token(&InboundMessage::new("k")).await);
    }

    #[tokio::test]
    async fn test_writer_persists_in_submission_order() {
        let (tx, mut written) = mpsc::unbounded_channel();
        let mut storage = MockStorage::new();
        storage
            .expect_set()
            .with(eq(storage_keys::REFRESH_TOKEN), mockall::predicate::always())
            .times(2)
            .returning(move |_, value| {
                let _ = tx.send(value.to_string());
                Ok(())
            });

        let tokens = TokenStore::new(Arc::new(storage), Arc::new(no_signer()), true);
        let (writer, task) = tokens.spawn_refresh_writer();

        assert!(writer.submit(&InboundMessage::new("k").with_refresh_token("rt-1")));
        assert!(!writer.submit(&InboundMessage::new("k")));
        assert!(writer.submit(&InboundMessage::new("k").with_refresh_token("rt-2")));

        assert_eq!(written.recv().await.unwrap(), "rt-1");
        assert_eq!(written.recv().await.unwrap(), "rt-2");

        drop(writer);
        drop(tokens);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_persist_failure_is_swallowed() {
        let mut storage = MockStorage::new();
        storage
            .expect_set()
            .returning(|_, _| Err(StorageError::io("write", "read-only")));

        let tokens = TokenStore::new(Arc::new(storage), Arc::new(no_signer()), true);
        let msg = InboundMessage::new("k").with_refresh_token("rt");

        assert!(!tokens.persist_refresh_token(&msg).await);
    }
}
