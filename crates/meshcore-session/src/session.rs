//! Half-duplex command/response state machine.
//!
//! [`Session`] does no I/O and never waits: the caller feeds it outbound
//! commands and inbound frame payloads and acts on what it returns. The async
//! client drives one from a tokio task; tests drive it directly.

use std::fmt;

use bytes::Bytes;
use meshcore_protocol::*;
use tracing::{debug, trace, warn};

use crate::ack_table::ExpectedAckTable;
use crate::error::SessionError;

/// Identifies one request for the lifetime of its exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

/// What a finished command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The terminal response frame.
    Response(Response),
    /// A complete contact enumeration.
    Contacts {
        contacts: Vec<ContactInfo>,
        /// Watermark to pass as `since` next time.
        most_recent_lastmod: u32,
    },
}

/// Outcome of the pending command.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub token: RequestToken,
    pub result: Result<Reply, SessionError>,
}

/// Something the radio said that no caller asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Push(PushNotification),
    /// A `SendConfirmed` push matched an expected ACK.
    AckConfirmed {
        ack_code: u32,
        contact_key: Vec<u8>,
        trip_time_ms: u32,
    },
    /// A non-push frame arrived with no command outstanding, typically a
    /// response that showed up after its command timed out.
    Stray(Message),
    /// A push-coded frame that failed to decode, such as a code newer than
    /// this crate or a truncated notification.
    MalformedPush { raw: Bytes, reason: ProtocolError },
    /// The inbound byte channel closed.
    Disconnected,
}

/// Result of feeding one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Part of a multi-frame reply; nothing to report yet.
    Partial,
    Completed(Completion),
    Event(SessionEvent),
}

#[derive(Debug)]
struct Pending {
    token: RequestToken,
    command_code: u8,
    /// Recipient of a direct text, to key its ACK expectation.
    recipient: Option<PublicKeyPrefix>,
    /// Contacts collected so far for `GetContacts`.
    contacts: Vec<ContactInfo>,
}

#[derive(Debug)]
pub struct Session {
    pending: Option<Pending>,
    acks: ExpectedAckTable,
}

impl Session {
    pub fn new(expected_ack_capacity: usize) -> Self {
        Session {
            pending: None,
            acks: ExpectedAckTable::new(expected_ack_capacity),
        }
    }

    pub fn state(&self) -> SessionState {
        match self.pending {
            Some(_) => SessionState::AwaitingResponse,
            None => SessionState::Idle,
        }
    }

    pub fn pending_token(&self) -> Option<RequestToken> {
        self.pending.as_ref().map(|p| p.token)
    }

    pub fn acks(&self) -> &ExpectedAckTable {
        &self.acks
    }

    /// Start `command` and return the payload to transmit.
    ///
    /// Fails with [`SessionError::Busy`] if a command is outstanding; the
    /// session is then left untouched.
    pub fn begin(&mut self, token: RequestToken, command: &Command) -> Result<Vec<u8>, SessionError> {
        if let Some(pending) = &self.pending {
            debug!(%token, outstanding = %pending.token, "rejecting command while busy");
            return Err(SessionError::Busy);
        }

        let recipient = match command {
            Command::SendTextMessage { recipient, .. } => Some(*recipient),
            _ => None,
        };
        let payload = command.encode();
        trace!(%token, code = command.code(), len = payload.len(), "command started");

        self.pending = Some(Pending {
            token,
            command_code: command.code(),
            recipient,
            contacts: Vec::new(),
        });
        Ok(payload)
    }

    /// Abandon the pending command if it is `token`'s.
    ///
    /// Used on deadline expiry and when the outbound write fails. Returns
    /// whether anything was abandoned.
    pub fn abandon(&mut self, token: RequestToken) -> bool {
        if self.pending_token() == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Feed one inbound frame payload.
    pub fn on_frame(&mut self, frame: &[u8], now: u32) -> FrameOutcome {
        match Message::parse(frame) {
            Message::Push(push) => FrameOutcome::Event(self.on_push(push)),
            Message::Response(response) => self.on_response(Ok(response), now),
            Message::ParseFailure { raw, reason } if is_push_code(&raw) => {
                debug!(len = raw.len(), %reason, "undecodable push");
                FrameOutcome::Event(SessionEvent::MalformedPush { raw, reason })
            }
            Message::ParseFailure { raw, reason } => self.on_response(Err((raw, reason)), now),
        }
    }

    fn on_push(&mut self, push: PushNotification) -> SessionEvent {
        if let PushNotification::SendConfirmed {
            ack_code,
            trip_time_ms,
        } = push
        {
            if let Some(expected) = self.acks.check(ack_code) {
                debug!(ack_code, contact = %hex::encode(&expected.contact_key), trip_time_ms, "delivery confirmed");
                return SessionEvent::AckConfirmed {
                    ack_code,
                    contact_key: expected.contact_key,
                    trip_time_ms,
                };
            }
        }
        SessionEvent::Push(push)
    }

    fn on_response(&mut self, decoded: Result<Response, (Bytes, ProtocolError)>, now: u32) -> FrameOutcome {
        let Some(pending) = self.pending.as_mut() else {
            let message = match decoded {
                Ok(response) => Message::Response(response),
                Err((raw, reason)) => Message::ParseFailure { raw, reason },
            };
            warn!(?message, "response with no command outstanding");
            return FrameOutcome::Event(SessionEvent::Stray(message));
        };

        let result = match decoded {
            Err((raw, reason)) => Err(SessionError::Malformed { raw, reason }),
            Ok(response) if pending.command_code == CMD_GET_CONTACTS => {
                match response {
                    Response::ContactsStart { total_count } => {
                        trace!(total_count, "contact enumeration started");
                        return FrameOutcome::Partial;
                    }
                    Response::Contact(contact) => {
                        pending.contacts.push(contact);
                        return FrameOutcome::Partial;
                    }
                    Response::EndOfContacts {
                        most_recent_lastmod,
                    } => Ok(Reply::Contacts {
                        contacts: std::mem::take(&mut pending.contacts),
                        most_recent_lastmod,
                    }),
                    other => Ok(Reply::Response(other)),
                }
            }
            Ok(response) => {
                if let (Response::Sent { expected_ack, .. }, Some(recipient)) = (&response, pending.recipient) {
                    self.acks.add(*expected_ack, recipient.as_bytes().to_vec(), now);
                }
                Ok(Reply::Response(response))
            }
        };

        let token = pending.token;
        self.pending = None;
        trace!(%token, ok = result.is_ok(), "command completed");
        FrameOutcome::Completed(Completion { token, result })
    }
}

/// Pushes never touch the pending slot, decodable or not.
fn is_push_code(frame: &[u8]) -> bool {
    frame.first().is_some_and(|code| code & PUSH_CODE_MASK != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_to(prefix: [u8; 6]) -> Command {
        Command::SendTextMessage {
            text_type: TextType::Plain,
            attempt: 0,
            timestamp: 1000,
            recipient: PublicKeyPrefix(prefix),
            text: "ping".to_string(),
        }
    }

    fn completed(outcome: FrameOutcome) -> Completion {
        match outcome {
            FrameOutcome::Completed(c) => c,
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn test_begin_then_response_returns_to_idle() {
        let mut session = Session::new(8);
        let payload = session.begin(RequestToken(1), &Command::GetDeviceTime).unwrap();
        assert_eq!(payload, vec![CMD_GET_DEVICE_TIME]);
        assert_eq!(session.state(), SessionState::AwaitingResponse);

        let frame = Response::CurrentTime { time_secs: 42 }.encode();
        let done = completed(session.on_frame(&frame, 0));
        assert_eq!(done.token, RequestToken(1));
        assert_eq!(done.result, Ok(Reply::Response(Response::CurrentTime { time_secs: 42 })));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_second_command_is_busy() {
        let mut session = Session::new(8);
        session.begin(RequestToken(1), &Command::GetDeviceTime).unwrap();
        assert_eq!(
            session.begin(RequestToken(2), &Command::SyncNextMessage),
            Err(SessionError::Busy)
        );
        assert_eq!(session.pending_token(), Some(RequestToken(1)));
    }

    #[test]
    fn test_push_does_not_touch_pending() {
        let mut session = Session::new(8);
        session.begin(RequestToken(1), &Command::GetDeviceTime).unwrap();

        let outcome = session.on_frame(&PushNotification::MessageWaiting.encode(), 0);
        assert_eq!(outcome, FrameOutcome::Event(SessionEvent::Push(PushNotification::MessageWaiting)));
        assert_eq!(session.state(), SessionState::AwaitingResponse);
    }

    #[test]
    fn test_parse_failure_terminates() {
        let mut session = Session::new(8);
        session.begin(RequestToken(3), &Command::GetDeviceTime).unwrap();

        let done = completed(session.on_frame(&[RESP_CODE_CURR_TIME, 1], 0));
        match done.result {
            Err(SessionError::Malformed { raw, .. }) => assert_eq!(&raw[..], &[RESP_CODE_CURR_TIME, 1]),
            other => panic!("expected malformed, got {:?}", other),
        }
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_undecodable_push_leaves_command_pending() {
        let mut session = Session::new(8);
        session.begin(RequestToken(1), &Command::GetDeviceTime).unwrap();

        // A push code this crate does not know.
        match session.on_frame(&[0x8F, 1, 2, 3], 0) {
            FrameOutcome::Event(SessionEvent::MalformedPush { raw, reason }) => {
                assert_eq!(&raw[..], &[0x8F, 1, 2, 3]);
                assert_eq!(reason, ProtocolError::UnknownResponse(0x8F));
            }
            other => panic!("expected malformed push, got {:?}", other),
        }
        assert_eq!(session.state(), SessionState::AwaitingResponse);
        assert_eq!(session.pending_token(), Some(RequestToken(1)));

        let done = completed(session.on_frame(&Response::CurrentTime { time_secs: 5 }.encode(), 0));
        assert_eq!(done.token, RequestToken(1));
        assert_eq!(done.result, Ok(Reply::Response(Response::CurrentTime { time_secs: 5 })));
    }

    #[test]
    fn test_truncated_push_during_contact_enumeration() {
        let mut session = Session::new(8);
        session.begin(RequestToken(2), &Command::GetContacts { since: None }).unwrap();
        assert_eq!(
            session.on_frame(&Response::ContactsStart { total_count: 0 }.encode(), 0),
            FrameOutcome::Partial
        );

        let outcome = session.on_frame(&[PUSH_CODE_SEND_CONFIRMED, 1, 2], 0);
        assert!(matches!(outcome, FrameOutcome::Event(SessionEvent::MalformedPush { .. })));
        assert_eq!(session.state(), SessionState::AwaitingResponse);

        let end = Response::EndOfContacts {
            most_recent_lastmod: 0,
        };
        let done = completed(session.on_frame(&end.encode(), 0));
        assert_eq!(
            done.result,
            Ok(Reply::Contacts {
                contacts: vec![],
                most_recent_lastmod: 0,
            })
        );
    }

    #[test]
    fn test_abandon_then_late_response_is_stray() {
        let mut session = Session::new(8);
        session.begin(RequestToken(4), &Command::GetDeviceTime).unwrap();

        assert!(!session.abandon(RequestToken(99)));
        assert!(session.abandon(RequestToken(4)));
        assert_eq!(session.state(), SessionState::Idle);

        match session.on_frame(&Response::Ok.encode(), 0) {
            FrameOutcome::Event(SessionEvent::Stray(message)) => {
                assert_eq!(message, Message::Response(Response::Ok));
            }
            other => panic!("expected stray, got {:?}", other),
        }
    }

    #[test]
    fn test_contact_enumeration_collects_until_end() {
        let mut session = Session::new(8);
        session.begin(RequestToken(5), &Command::GetContacts { since: Some(10) }).unwrap();

        let alice = ContactInfo {
            name: "Alice".into(),
            lastmod: 11,
            ..Default::default()
        };
        assert_eq!(
            session.on_frame(&Response::ContactsStart { total_count: 1 }.encode(), 0),
            FrameOutcome::Partial
        );
        assert_eq!(session.on_frame(&Response::Contact(alice.clone()).encode(), 0), FrameOutcome::Partial);
        // Pushes interleave freely.
        assert!(matches!(
            session.on_frame(&PushNotification::MessageWaiting.encode(), 0),
            FrameOutcome::Event(_)
        ));

        let done = completed(session.on_frame(
            &Response::EndOfContacts {
                most_recent_lastmod: 11,
            }
            .encode(),
            0,
        ));
        assert_eq!(
            done.result,
            Ok(Reply::Contacts {
                contacts: vec![alice],
                most_recent_lastmod: 11,
            })
        );
    }

    #[test]
    fn test_contact_enumeration_error_terminates() {
        let mut session = Session::new(8);
        session.begin(RequestToken(6), &Command::GetContacts { since: None }).unwrap();
        let frame = Response::Error(FirmwareErrorCode::BadState).encode();
        let done = completed(session.on_frame(&frame, 0));
        assert_eq!(done.result, Ok(Reply::Response(Response::Error(FirmwareErrorCode::BadState))));
    }

    #[test]
    fn test_sent_registers_ack_and_confirm_resolves_it() {
        let mut session = Session::new(8);
        let prefix = [1, 2, 3, 4, 5, 6];
        session.begin(RequestToken(7), &text_to(prefix)).unwrap();

        let sent = Response::Sent {
            is_flood: false,
            expected_ack: 0xFEED,
            est_timeout_ms: 3000,
        };
        completed(session.on_frame(&sent.encode(), 500));
        assert_eq!(session.acks().len(), 1);

        let confirm = PushNotification::SendConfirmed {
            ack_code: 0xFEED,
            trip_time_ms: 640,
        }
        .encode();
        assert_eq!(
            session.on_frame(&confirm, 501),
            FrameOutcome::Event(SessionEvent::AckConfirmed {
                ack_code: 0xFEED,
                contact_key: prefix.to_vec(),
                trip_time_ms: 640,
            })
        );

        // A repeated confirmation is no longer matched.
        assert!(matches!(
            session.on_frame(&confirm, 502),
            FrameOutcome::Event(SessionEvent::Push(PushNotification::SendConfirmed { .. }))
        ));
    }

    #[test]
    fn test_sent_for_channel_message_registers_nothing() {
        let mut session = Session::new(8);
        session
            .begin(
                RequestToken(8),
                &Command::SendChannelTextMessage {
                    text_type: TextType::Plain,
                    channel_idx: 0,
                    timestamp: 1,
                    text: "hi".into(),
                },
            )
            .unwrap();
        let sent = Response::Sent {
            is_flood: true,
            expected_ack: 0,
            est_timeout_ms: 0,
        };
        completed(session.on_frame(&sent.encode(), 0));
        assert!(session.acks().is_empty());
    }
}
