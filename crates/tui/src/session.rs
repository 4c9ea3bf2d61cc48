//! Session lifecycle: client configured -> session started -> session active.
//!
//! All provider failures are caught here and converted to [`ChatError`];
//! nothing above this boundary ever sees a raw provider fault.

use crate::gemini::{ChatClient, ChatSession, GeminiClient, ProviderError, AUTH_FAILURE_SIGNATURE};
use log::warn;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("API key is missing")]
    MissingApiKey,
    #[error("failed to initialize the chat client: {0}")]
    ClientInit(String),
    #[error("chat client is not initialized")]
    ClientUnavailable,
    #[error("failed to start a chat session: {0}")]
    SessionStart(String),
    #[error("chat session is not active")]
    SessionInactive,
    #[error("the provided API key is not valid; please check your API key")]
    InvalidApiKey,
    #[error("AI communication error: {0}")]
    Communication(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Unconfigured,
    ClientReady,
    SessionActive,
}

/// Owns the remote client handle and the active chat session. A changed API
/// key or operator context always goes through full replacement: configure
/// discards everything, start_session discards the session and its history.
#[derive(Default)]
pub struct SessionManager {
    client: Option<Box<dyn ChatClient>>,
    session: Option<Box<dyn ChatSession>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.session.is_some() {
            SessionPhase::SessionActive
        } else if self.client.is_some() {
            SessionPhase::ClientReady
        } else {
            SessionPhase::Unconfigured
        }
    }

    /// Builds a fresh client from `api_key`. Any previously held client or
    /// session is discarded first so a failed reconfiguration can never
    /// leave stale state behind.
    pub fn configure(&mut self, api_key: Option<&str>) -> Result<(), ChatError> {
        self.client = None;
        self.session = None;

        let key = match api_key {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(ChatError::MissingApiKey),
        };
        let client = GeminiClient::new(key).map_err(|error| {
            warn!("chat client init failed: {error}");
            ChatError::ClientInit(error.to_string())
        })?;
        self.client = Some(Box::new(client));
        Ok(())
    }

    /// Starts a new, empty-history session configured with
    /// `system_instruction`, replacing any prior session wholesale.
    pub fn start_session(&mut self, system_instruction: &str) -> Result<(), ChatError> {
        self.session = None;
        let client = self.client.as_ref().ok_or(ChatError::ClientUnavailable)?;
        match client.start_session(system_instruction) {
            Ok(session) => {
                self.session = Some(session);
                Ok(())
            }
            Err(error) => {
                warn!("session start failed: {error}");
                Err(ChatError::SessionStart(error.to_string()))
            }
        }
    }

    /// Forwards `text` as the next user turn and returns the reply verbatim.
    /// With no active session this returns [`ChatError::SessionInactive`]
    /// without touching the network.
    pub fn send_message(&mut self, text: &str) -> Result<String, ChatError> {
        let session = self.session.as_mut().ok_or(ChatError::SessionInactive)?;
        session.send(text).map_err(classify_send_failure)
    }

    #[cfg(test)]
    pub(crate) fn install_client(&mut self, client: Box<dyn ChatClient>) {
        self.client = Some(client);
        self.session = None;
    }
}

fn classify_send_failure(error: ProviderError) -> ChatError {
    let detail = error.to_string();
    if error.is_auth() || detail.contains(AUTH_FAILURE_SIGNATURE) {
        return ChatError::InvalidApiKey;
    }
    ChatError::Communication(detail)
}

#[cfg(test)]
mod tests {
    use super::{ChatError, SessionManager, SessionPhase};
    use crate::gemini::{ChatClient, ChatSession, ProviderError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockClient {
        instructions: Arc<Mutex<Vec<String>>>,
        sent: Arc<Mutex<Vec<String>>>,
        network_calls: Arc<AtomicUsize>,
        fail_start: bool,
        send_error: Arc<Mutex<Option<ProviderError>>>,
    }

    struct MockSession {
        sent: Arc<Mutex<Vec<String>>>,
        history: Vec<String>,
        network_calls: Arc<AtomicUsize>,
        send_error: Arc<Mutex<Option<ProviderError>>>,
    }

    impl ChatClient for MockClient {
        fn start_session(
            &self,
            system_instruction: &str,
        ) -> Result<Box<dyn ChatSession>, ProviderError> {
            if self.fail_start {
                return Err(ProviderError::Transport("backend down".to_string()));
            }
            self.instructions
                .lock()
                .unwrap()
                .push(system_instruction.to_string());
            Ok(Box::new(MockSession {
                sent: Arc::clone(&self.sent),
                history: Vec::new(),
                network_calls: Arc::clone(&self.network_calls),
                send_error: Arc::clone(&self.send_error),
            }))
        }
    }

    impl ChatSession for MockSession {
        fn send(&mut self, text: &str) -> Result<String, ProviderError> {
            self.network_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.send_error.lock().unwrap().take() {
                return Err(error);
            }
            self.history.push(text.to_string());
            self.sent.lock().unwrap().push(text.to_string());
            Ok(format!("reply #{}", self.history.len()))
        }
    }

    fn manager_with(client: &MockClient) -> SessionManager {
        let mut manager = SessionManager::new();
        manager.install_client(Box::new(client.clone()));
        manager
    }

    #[test]
    fn configure_rejects_missing_or_empty_key() {
        let mut manager = SessionManager::new();
        assert!(matches!(
            manager.configure(None),
            Err(ChatError::MissingApiKey)
        ));
        assert!(matches!(
            manager.configure(Some("   ")),
            Err(ChatError::MissingApiKey)
        ));
        assert_eq!(manager.phase(), SessionPhase::Unconfigured);
    }

    #[test]
    fn failed_configure_discards_previous_client_and_session() {
        let client = MockClient::default();
        let mut manager = manager_with(&client);
        manager.start_session("instruction").unwrap();
        assert_eq!(manager.phase(), SessionPhase::SessionActive);

        assert!(manager.configure(Some("")).is_err());
        assert_eq!(manager.phase(), SessionPhase::Unconfigured);
        assert!(matches!(
            manager.send_message("hi"),
            Err(ChatError::SessionInactive)
        ));
    }

    #[test]
    fn send_without_session_skips_the_network() {
        let client = MockClient::default();
        let mut manager = manager_with(&client);
        assert!(matches!(
            manager.send_message("hello"),
            Err(ChatError::SessionInactive)
        ));
        assert_eq!(client.network_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn start_session_without_client_fails() {
        let mut manager = SessionManager::new();
        assert!(matches!(
            manager.start_session("instruction"),
            Err(ChatError::ClientUnavailable)
        ));
    }

    #[test]
    fn start_session_failure_clears_the_session_slot() {
        let ok_client = MockClient::default();
        let mut manager = manager_with(&ok_client);
        manager.start_session("first").unwrap();

        let failing = MockClient {
            fail_start: true,
            ..MockClient::default()
        };
        manager.install_client(Box::new(failing));
        assert!(matches!(
            manager.start_session("second"),
            Err(ChatError::SessionStart(_))
        ));
        assert_eq!(manager.phase(), SessionPhase::ClientReady);
        assert!(matches!(
            manager.send_message("hi"),
            Err(ChatError::SessionInactive)
        ));
    }

    #[test]
    fn restarting_replaces_session_and_discards_history() {
        let client = MockClient::default();
        let mut manager = manager_with(&client);

        manager.start_session("instruction with old context").unwrap();
        manager.send_message("first question").unwrap();

        manager.start_session("instruction with new context").unwrap();
        let reply = manager.send_message("second question").unwrap();

        // The fresh session has no memory of the first turn.
        assert_eq!(reply, "reply #1");
        assert_eq!(
            client.instructions.lock().unwrap().as_slice(),
            ["instruction with old context", "instruction with new context"]
        );
    }

    #[test]
    fn auth_failures_map_to_invalid_api_key() {
        let client = MockClient::default();
        let mut manager = manager_with(&client);
        manager.start_session("instruction").unwrap();

        *client.send_error.lock().unwrap() =
            Some(ProviderError::Auth("API key not valid".to_string()));
        assert!(matches!(
            manager.send_message("hi"),
            Err(ChatError::InvalidApiKey)
        ));
    }

    #[test]
    fn other_failures_map_to_communication_with_detail() {
        let client = MockClient::default();
        let mut manager = manager_with(&client);
        manager.start_session("instruction").unwrap();

        *client.send_error.lock().unwrap() = Some(ProviderError::Api {
            status: 503,
            message: "service unavailable".to_string(),
        });
        match manager.send_message("hi") {
            Err(ChatError::Communication(detail)) => {
                assert!(detail.contains("service unavailable"));
            }
            other => panic!("expected Communication error, got {other:?}"),
        }
    }
}
