//! Drives one question/answer exchange at a time against the active
//! session.
//!
//! `send` validates, inserts the user's message and an empty assistant
//! placeholder right away, then hands the network work to a task. The
//! task feeds decoded fragments into the placeholder until the stream
//! closes or fails. Every write goes through `ClientState` and is keyed
//! by the exchange id, so once an exchange is cancelled (or its
//! transcript replaced) nothing it produces can land anywhere.
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::models::{Message, Role};
use crate::api::BoxedTransport;
use crate::core::state::ActiveExchange;
use crate::core::{ChatPhase, ClientError, ClientState, SharedState};
use crate::stream::StreamDecoder;

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// The stream closed normally, with the full answer
    Completed(String),
    Failed(ClientError),
    Cancelled,
}

/// Handle to a running exchange
pub struct ExchangeHandle {
    id: Uuid,
    state: SharedState,
    task: JoinHandle<ExchangeOutcome>,
}

impl ExchangeHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stop the exchange. The in-flight message keeps what it has
    /// received so far.
    pub fn cancel(&self) {
        let id = self.id;
        self.state.mutate(|s| s.cancel_exchange(id));
    }

    pub async fn wait(self) -> ExchangeOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Exchange {} task failed: {}", self.id, e);
                ExchangeOutcome::Cancelled
            }
        }
    }
}

impl ClientState {
    fn owns_exchange(&self, id: Uuid) -> Option<&ActiveExchange> {
        self.exchange
            .as_ref()
            .filter(|ex| ex.id == id && !ex.token.is_cancelled())
    }

    pub(crate) fn cancel_exchange(&mut self, id: Uuid) -> bool {
        if self.owns_exchange(id).is_none() {
            return false;
        }
        self.abandon_exchange()
    }

    fn begin_streaming(&mut self, id: Uuid) -> bool {
        let Some(epoch) = self.owns_exchange(id).map(|ex| ex.epoch) else {
            return false;
        };
        self.transcript.confirm_pending_user(epoch);
        if let Some(exchange) = self.exchange.as_mut() {
            exchange.phase = ChatPhase::Streaming;
        }
        true
    }

    fn apply_fragment(&mut self, id: Uuid, text: &str) -> bool {
        match self.owns_exchange(id).map(|ex| ex.epoch) {
            Some(epoch) => self.transcript.apply_fragment(epoch, text),
            None => false,
        }
    }

    fn complete_exchange(&mut self, id: Uuid) -> bool {
        let Some(epoch) = self.owns_exchange(id).map(|ex| ex.epoch) else {
            return false;
        };
        self.exchange = None;
        self.transcript.confirm_pending_user(epoch);
        self.transcript.finalize(epoch)
    }

    fn fail_exchange(&mut self, id: Uuid, description: &str) -> bool {
        let Some(epoch) = self.owns_exchange(id).map(|ex| ex.epoch) else {
            return false;
        };
        self.exchange = None;
        self.transcript.confirm_pending_user(epoch);
        self.transcript.fail(epoch, description)
    }
}

struct Exchange {
    id: Uuid,
    session_id: String,
    question: String,
    token: CancellationToken,
}

#[derive(Clone)]
pub struct ChatController {
    state: SharedState,
    transport: BoxedTransport,
    decoder: StreamDecoder,
}

impl ChatController {
    pub fn new(state: SharedState, transport: BoxedTransport, decoder: StreamDecoder) -> Self {
        Self {
            state,
            transport,
            decoder,
        }
    }

    pub fn phase(&self) -> ChatPhase {
        self.state.read(|s| s.phase())
    }

    /// Cancel whatever exchange is running
    pub fn cancel(&self) -> bool {
        self.state.mutate(|s| s.abandon_exchange())
    }

    /// Submit a question to the active session. Rejections leave the
    /// transcript untouched.
    pub fn send(&self, question: &str) -> Result<ExchangeHandle, ClientError> {
        let question = question.trim();

        let exchange = self.state.mutate(|s| {
            if s.exchange.is_some() {
                return Err(ClientError::precondition(
                    "A response is still in progress",
                ));
            }
            let Some(session_id) = s.store.active_id().map(str::to_string) else {
                return Err(ClientError::precondition("No session is selected"));
            };
            if question.is_empty() {
                return Err(ClientError::precondition("The question is empty"));
            }
            if s.uploading {
                return Err(ClientError::precondition(
                    "Wait for the upload to finish before asking",
                ));
            }

            s.transcript.push(Message::pending(Role::User, question));
            s.transcript.push(Message::pending(Role::Assistant, ""));

            let token = CancellationToken::new();
            let id = Uuid::new_v4();
            s.exchange = Some(ActiveExchange {
                id,
                session_id: session_id.clone(),
                epoch: s.transcript.epoch(),
                token: token.clone(),
                phase: ChatPhase::Sending,
            });
            Ok(Exchange {
                id,
                session_id,
                question: question.to_string(),
                token,
            })
        });
        let exchange = exchange.inspect_err(|e| tracing::debug!("Rejected question: {}", e))?;

        tracing::info!(
            "Starting exchange {} for session {}",
            exchange.id,
            exchange.session_id
        );
        let id = exchange.id;
        let task = tokio::spawn(run_exchange(
            self.state.clone(),
            self.transport.clone(),
            self.decoder,
            exchange,
        ));

        Ok(ExchangeHandle {
            id,
            state: self.state.clone(),
            task,
        })
    }
}

fn fail(state: &SharedState, id: Uuid, err: ClientError) -> ExchangeOutcome {
    tracing::error!("Exchange {} failed: {}", id, err);
    let description = err.user_message();
    if state.mutate(|s| s.fail_exchange(id, &description)) {
        ExchangeOutcome::Failed(err)
    } else {
        ExchangeOutcome::Cancelled
    }
}

async fn run_exchange(
    state: SharedState,
    transport: BoxedTransport,
    decoder: StreamDecoder,
    exchange: Exchange,
) -> ExchangeOutcome {
    let Exchange {
        id,
        session_id,
        question,
        token,
    } = exchange;

    let sent = tokio::select! {
        biased;
        _ = token.cancelled() => return ExchangeOutcome::Cancelled,
        sent = transport.send_question(&session_id, &question) => sent,
    };
    let bytes = match sent {
        Ok(bytes) => bytes,
        Err(e) => return fail(&state, id, e),
    };
    if !state.mutate(|s| s.begin_streaming(id)) {
        return ExchangeOutcome::Cancelled;
    }

    let mut fragments = decoder.decode(bytes);
    let mut answer = String::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return ExchangeOutcome::Cancelled,
            next = fragments.next() => next,
        };
        match next {
            Some(Ok(text)) => {
                if !state.mutate(|s| s.apply_fragment(id, &text)) {
                    return ExchangeOutcome::Cancelled;
                }
                answer = text;
            }
            Some(Err(e)) => return fail(&state, id, e),
            None => break,
        }
    }

    if state.mutate(|s| s.complete_exchange(id)) {
        tracing::info!("Exchange {} completed", id);
        ExchangeOutcome::Completed(answer)
    } else {
        ExchangeOutcome::Cancelled
    }
}
