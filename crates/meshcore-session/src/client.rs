//! Async client: a [`Session`] owned by a tokio task.
//!
//! Callers hold a cloneable [`SessionHandle`]. Each request travels to the
//! task over an mpsc channel with a oneshot for the reply; the task owns the
//! framer, the session and the deadline of the one outstanding command.
//! Unsolicited frames come out of the event receiver returned by
//! [`spawn_session`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use meshcore_protocol::*;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

use crate::clock::unix_now;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::*;

/// The byte channel to the radio.
pub struct Transport {
    /// Bytes to write to the radio.
    pub outbound: mpsc::Sender<Bytes>,
    /// Chunks read from the radio, of any size.
    pub inbound: mpsc::Receiver<Bytes>,
}

/// Receipt for a direct text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentReceipt {
    pub is_flood: bool,
    /// Code that a later [`SessionEvent::AckConfirmed`] will carry.
    pub expected_ack: u32,
    pub est_timeout_ms: u32,
}

/// Result of a contact sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSync {
    pub contacts: Vec<ContactInfo>,
    /// Pass as `since` to the next sync.
    pub most_recent_lastmod: u32,
}

struct Request {
    token: RequestToken,
    command: Command,
    timeout: Duration,
    reply: oneshot::Sender<Result<Reply, SessionError>>,
}

struct Waiter {
    token: RequestToken,
    deadline: Instant,
    timeout: Duration,
    reply: oneshot::Sender<Result<Reply, SessionError>>,
}

/// Cloneable front end of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
    next_token: Arc<AtomicU64>,
    awaiting: Arc<AtomicBool>,
    default_timeout: Duration,
    app_version: u8,
    app_name: String,
}

/// Start a session task on the current tokio runtime.
pub fn spawn_session(config: &SessionConfig, transport: Transport) -> (SessionHandle, mpsc::Receiver<SessionEvent>) {
    let (request_tx, request_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(config.event_channel_depth.max(1));
    let awaiting = Arc::new(AtomicBool::new(false));

    let actor = Actor {
        session: Session::new(config.expected_ack_capacity),
        framer: config.framing.host_framer(),
        outbound: transport.outbound,
        events: event_tx,
        awaiting: awaiting.clone(),
        waiter: None,
        connected: true,
    };
    tokio::spawn(actor.run(request_rx, transport.inbound));
    info!(framing = ?config.framing, "session started");

    let handle = SessionHandle {
        requests: request_tx,
        next_token: Arc::new(AtomicU64::new(1)),
        awaiting,
        default_timeout: config.command_timeout(),
        app_version: config.app_version,
        app_name: config.app_name.clone(),
    };
    (handle, event_rx)
}

impl SessionHandle {
    /// Whether a command is outstanding right now.
    pub fn state(&self) -> SessionState {
        if self.awaiting.load(Ordering::Acquire) {
            SessionState::AwaitingResponse
        } else {
            SessionState::Idle
        }
    }

    /// Send `command` with the configured timeout.
    pub async fn request(&self, command: Command) -> Result<Reply, SessionError> {
        self.request_with_timeout(command, self.default_timeout).await
    }

    /// Send `command` and wait for its terminal reply.
    ///
    /// Fails at once with [`SessionError::Busy`] if another command is
    /// outstanding. Dropping the returned future leaves the command running
    /// until its reply or deadline.
    pub async fn request_with_timeout(&self, command: Command, timeout: Duration) -> Result<Reply, SessionError> {
        let token = RequestToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request {
                token,
                command,
                timeout,
                reply,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    async fn response(&self, command: Command) -> Result<Response, SessionError> {
        match self.request(command).await? {
            Reply::Response(Response::Error(code)) => Err(SessionError::Firmware(code)),
            Reply::Response(response) => Ok(response),
            Reply::Contacts { .. } => Err(SessionError::UnexpectedResponse("contact list".into())),
        }
    }

    pub async fn device_query(&self) -> Result<DeviceInfo, SessionError> {
        match self
            .response(Command::DeviceQuery {
                app_version: self.app_version,
            })
            .await?
        {
            Response::DeviceInfo(info) => Ok(info),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn app_start(&self) -> Result<SelfInfo, SessionError> {
        match self
            .response(Command::AppStart {
                app_version: self.app_version,
                app_name: self.app_name.clone(),
            })
            .await?
        {
            Response::SelfInfo(info) => Ok(info),
            other => Err(unexpected(&other)),
        }
    }

    /// Fetch contacts modified after `since` (all of them when `None`).
    pub async fn get_contacts(&self, since: Option<u32>) -> Result<ContactSync, SessionError> {
        match self.request(Command::GetContacts { since }).await? {
            Reply::Contacts {
                contacts,
                most_recent_lastmod,
            } => Ok(ContactSync {
                contacts,
                most_recent_lastmod,
            }),
            Reply::Response(Response::Error(code)) => Err(SessionError::Firmware(code)),
            Reply::Response(other) => Err(unexpected(&other)),
        }
    }

    /// Pull one message from the radio's offline queue.
    pub async fn sync_next_message(&self) -> Result<Option<Response>, SessionError> {
        match self.response(Command::SyncNextMessage).await? {
            Response::NoMoreMessages => Ok(None),
            message @ (Response::ContactMessageV1(_)
            | Response::ContactMessageV3(_)
            | Response::ChannelMessageV1(_)
            | Response::ChannelMessageV3(_)) => Ok(Some(message)),
            other => Err(unexpected(&other)),
        }
    }

    /// Pull messages until the radio reports none left.
    pub async fn sync_messages(&self) -> Result<Vec<Response>, SessionError> {
        let mut messages = Vec::new();
        while let Some(message) = self.sync_next_message().await? {
            messages.push(message);
        }
        debug!(count = messages.len(), "message sync complete");
        Ok(messages)
    }

    pub async fn send_text_message(&self, recipient: PublicKeyPrefix, text: &str) -> Result<SentReceipt, SessionError> {
        let command = Command::SendTextMessage {
            text_type: TextType::Plain,
            attempt: 0,
            timestamp: unix_now(),
            recipient,
            text: text.to_string(),
        };
        match self.response(command).await? {
            Response::Sent {
                is_flood,
                expected_ack,
                est_timeout_ms,
            } => Ok(SentReceipt {
                is_flood,
                expected_ack,
                est_timeout_ms,
            }),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn send_channel_message(&self, channel_idx: u8, text: &str) -> Result<(), SessionError> {
        let command = Command::SendChannelTextMessage {
            text_type: TextType::Plain,
            channel_idx,
            timestamp: unix_now(),
            text: text.to_string(),
        };
        match self.response(command).await? {
            Response::Ok | Response::Sent { .. } => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn get_device_time(&self) -> Result<u32, SessionError> {
        match self.response(Command::GetDeviceTime).await? {
            Response::CurrentTime { time_secs } => Ok(time_secs),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn set_device_time(&self, time_secs: u32) -> Result<(), SessionError> {
        match self.response(Command::SetDeviceTime { time_secs }).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn get_battery_and_storage(&self) -> Result<BatteryAndStorage, SessionError> {
        match self.response(Command::GetBatteryAndStorage).await? {
            Response::BatteryAndStorage(batt) => Ok(batt),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &Response) -> SessionError {
    SessionError::UnexpectedResponse(format!("{:?}", response))
}

struct Actor {
    session: Session,
    framer: Box<dyn Framer>,
    outbound: mpsc::Sender<Bytes>,
    events: mpsc::Sender<SessionEvent>,
    awaiting: Arc<AtomicBool>,
    waiter: Option<Waiter>,
    connected: bool,
}

impl Actor {
    async fn run(mut self, mut requests: mpsc::Receiver<Request>, mut inbound: mpsc::Receiver<Bytes>) {
        loop {
            let deadline = self.waiter.as_ref().map(|w| w.deadline);

            tokio::select! {
                request = requests.recv() => match request {
                    Some(request) => self.start(request),
                    None => break,
                },

                chunk = inbound.recv(), if self.connected => match chunk {
                    Some(chunk) => self.ingest(&chunk),
                    None => self.disconnect(),
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.expire();
                }
            }
        }
        debug!("session task stopped");
    }

    fn start(&mut self, request: Request) {
        let Request {
            token,
            command,
            timeout,
            reply,
        } = request;

        if !self.connected {
            let _ = reply.send(Err(SessionError::TransportClosed));
            return;
        }

        let payload = match self.session.begin(token, &command) {
            Ok(payload) => payload,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };

        let wire = match self.framer.wrap(&payload) {
            Ok(wire) => wire,
            Err(err) => {
                self.session.abandon(token);
                let _ = reply.send(Err(err.into()));
                return;
            }
        };

        let deadline = Instant::now() + timeout;

        // The loop must not park on a radio that is slow to read.
        if let Err(err) = self.outbound.try_send(wire) {
            let err = match err {
                mpsc::error::TrySendError::Full(_) => {
                    warn!(%token, "outbound channel full, command not sent");
                    SessionError::TransportFull
                }
                mpsc::error::TrySendError::Closed(_) => {
                    warn!(%token, "outbound channel closed");
                    SessionError::TransportClosed
                }
            };
            self.session.abandon(token);
            let _ = reply.send(Err(err));
            return;
        }

        trace!(%token, code = command.code(), ?timeout, "awaiting response");
        self.waiter = Some(Waiter {
            token,
            deadline,
            timeout,
            reply,
        });
        self.awaiting.store(true, Ordering::Release);
    }

    fn ingest(&mut self, chunk: &[u8]) {
        for frame in self.framer.ingest(chunk) {
            match self.session.on_frame(&frame, unix_now()) {
                FrameOutcome::Partial => {}
                FrameOutcome::Completed(completion) => self.complete(completion),
                FrameOutcome::Event(event) => self.emit(event),
            }
        }
    }

    fn complete(&mut self, completion: Completion) {
        match self.waiter.take() {
            Some(waiter) if waiter.token == completion.token => {
                // The caller may have stopped waiting.
                let _ = waiter.reply.send(completion.result);
            }
            other => {
                warn!(token = %completion.token, "completion without a matching waiter");
                self.waiter = other;
            }
        }
        self.awaiting.store(self.session.state() == SessionState::AwaitingResponse, Ordering::Release);
    }

    fn expire(&mut self) {
        if let Some(waiter) = self.waiter.take() {
            debug!(token = %waiter.token, timeout = ?waiter.timeout, "command timed out");
            self.session.abandon(waiter.token);
            let _ = waiter.reply.send(Err(SessionError::Timeout(waiter.timeout)));
        }
        self.awaiting.store(false, Ordering::Release);
    }

    fn disconnect(&mut self) {
        info!("transport disconnected");
        self.connected = false;
        self.framer.reset();
        if let Some(waiter) = self.waiter.take() {
            self.session.abandon(waiter.token);
            let _ = waiter.reply.send(Err(SessionError::TransportClosed));
        }
        self.awaiting.store(false, Ordering::Release);
        self.emit(SessionEvent::Disconnected);
    }

    fn emit(&mut self, event: SessionEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "event channel full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
