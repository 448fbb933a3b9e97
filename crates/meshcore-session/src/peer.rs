//! In-process companion radio.
//!
//! [`ReferencePeer`] answers commands the way the firmware does for the
//! subset it models: contact and message sync, direct texts with delivery
//! ACKs, device identity, time and battery. Anything else gets
//! `Error(UnsupportedCommand)`. [`PeerLink`] serves one over a pair of byte
//! channels so a real client can talk to it.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use meshcore_protocol::*;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::ack_table::ExpectedAckTable;
use crate::config::SessionConfig;
use crate::contact_sync::ContactIterator;
use crate::error::SessionError;
use crate::offline_queue::OfflineQueue;

/// Estimated delivery timeout reported in `Sent`, per hop.
const SEND_TIMEOUT_PER_HOP_MS: u32 = 1000;
const FLOOD_SEND_TIMEOUT_MS: u32 = 8000;

pub struct ReferencePeer {
    self_info: SelfInfo,
    device_info: DeviceInfo,
    contacts: Vec<ContactInfo>,
    contact_iter: ContactIterator,
    offline: OfflineQueue,
    acks: ExpectedAckTable,
    clock_secs: u32,
    battery: BatteryAndStorage,
    ack_seed: u32,
}

impl ReferencePeer {
    pub fn new(config: &SessionConfig, self_info: SelfInfo, device_info: DeviceInfo) -> Self {
        ReferencePeer {
            self_info,
            device_info,
            contacts: Vec::new(),
            contact_iter: ContactIterator::new(),
            offline: OfflineQueue::new(config.offline_queue_capacity),
            acks: ExpectedAckTable::new(config.expected_ack_capacity),
            clock_secs: 0,
            battery: BatteryAndStorage {
                battery_millivolts: 4100,
                storage: None,
            },
            ack_seed: 0x5EED_0001,
        }
    }

    /// Insert or replace (by public key) a contact.
    pub fn upsert_contact(&mut self, contact: ContactInfo) {
        match self.contacts.iter_mut().find(|c| c.public_key == contact.public_key) {
            Some(existing) => *existing = contact,
            None => self.contacts.push(contact),
        }
    }

    pub fn contacts(&self) -> &[ContactInfo] {
        &self.contacts
    }

    pub fn set_clock(&mut self, secs: u32) {
        self.clock_secs = secs;
    }

    pub fn clock(&self) -> u32 {
        self.clock_secs
    }

    pub fn set_battery(&mut self, battery: BatteryAndStorage) {
        self.battery = battery;
    }

    pub fn offline_queue(&self) -> &OfflineQueue {
        &self.offline
    }

    pub fn expected_acks(&self) -> &ExpectedAckTable {
        &self.acks
    }

    /// A message arrived over the mesh: queue it and return the
    /// `MsgWaiting` push to send to the host.
    pub fn receive_message(&mut self, frame: impl Into<Bytes>) -> Result<Vec<u8>, SessionError> {
        self.offline.enqueue(frame.into(), self.clock_secs)?;
        Ok(PushNotification::MessageWaiting.encode())
    }

    /// A delivery ACK arrived over the mesh. Returns the `SendConfirmed`
    /// push when it matches an outstanding send.
    pub fn receive_ack(&mut self, ack_code: u32) -> Option<Vec<u8>> {
        let expected = self.acks.check(ack_code)?;
        let trip_time_ms = self.clock_secs.saturating_sub(expected.registered_at).saturating_mul(1000);
        Some(
            PushNotification::SendConfirmed {
                ack_code,
                trip_time_ms,
            }
            .encode(),
        )
    }

    /// Answer one command frame. Returns the response frames in send order;
    /// an empty frame gets no answer.
    pub fn handle_command(&mut self, frame: &[u8]) -> Vec<Vec<u8>> {
        let Some((&code, body)) = frame.split_first() else {
            return Vec::new();
        };
        trace!(code, len = body.len(), "peer handling command");

        let mut r = WireReader::new(body);
        let result = match code {
            CMD_DEVICE_QUERY => self.device_query(&mut r),
            CMD_APP_START => Ok(vec![Response::SelfInfo(self.self_info.clone())]),
            CMD_GET_CONTACTS => self.get_contacts(&mut r),
            CMD_SYNC_NEXT_MESSAGE => return vec![self.sync_next_message()],
            CMD_SEND_TXT_MSG => self.send_text_message(&mut r),
            CMD_SEND_CHANNEL_TXT_MSG => r.require(6).map(|_| vec![Response::Ok]),
            CMD_GET_DEVICE_TIME => Ok(vec![Response::CurrentTime {
                time_secs: self.clock_secs,
            }]),
            CMD_SET_DEVICE_TIME => self.set_device_time(&mut r),
            CMD_GET_BATT_AND_STORAGE => Ok(vec![Response::BatteryAndStorage(self.battery.clone())]),
            other => {
                debug!(code = other, "unsupported command");
                Ok(vec![Response::Error(FirmwareErrorCode::UnsupportedCommand)])
            }
        };

        let responses = result.unwrap_or_else(|err| {
            warn!(code, %err, "malformed command");
            vec![Response::Error(FirmwareErrorCode::IllegalArg)]
        });
        responses.iter().map(Response::encode).collect()
    }

    fn device_query(&mut self, r: &mut WireReader<'_>) -> Result<Vec<Response>, ProtocolError> {
        let app_version = r.u8()?;
        debug!(app_version, "device query");
        Ok(vec![Response::DeviceInfo(self.device_info.clone())])
    }

    fn get_contacts(&mut self, r: &mut WireReader<'_>) -> Result<Vec<Response>, ProtocolError> {
        let since = if r.remaining() >= 4 { r.u32()? } else { 0 };
        let total_count = self.contact_iter.begin(&self.contacts, since) as u32;

        let mut out = Vec::with_capacity(total_count as usize + 2);
        out.push(Response::ContactsStart { total_count });
        while let Some(contact) = self.contact_iter.next_contact() {
            out.push(Response::Contact(contact.clone()));
        }
        out.push(Response::EndOfContacts {
            most_recent_lastmod: self.contact_iter.finish(),
        });
        Ok(out)
    }

    fn sync_next_message(&mut self) -> Vec<u8> {
        match self.offline.dequeue() {
            Some(entry) => entry.frame.to_vec(),
            None => Response::NoMoreMessages.encode(),
        }
    }

    fn send_text_message(&mut self, r: &mut WireReader<'_>) -> Result<Vec<Response>, ProtocolError> {
        r.require(2 + 4 + PUB_KEY_PREFIX_SIZE)?;
        let _text_type = r.u8()?;
        let attempt = r.u8()?;
        let timestamp = r.u32()?;
        let recipient = PublicKeyPrefix(r.array()?);
        let text = r.rest();

        let Some(contact) = self.contacts.iter().find(|c| recipient.matches(&c.public_key)) else {
            debug!(recipient = %recipient.to_hex(), "text to unknown contact");
            return Ok(vec![Response::Error(FirmwareErrorCode::NotFound)]);
        };

        let is_flood = !contact.has_direct_path();
        let est_timeout_ms = if is_flood {
            FLOOD_SEND_TIMEOUT_MS
        } else {
            SEND_TIMEOUT_PER_HOP_MS * (contact.out_path_len as u32 + 1)
        };

        let expected_ack = self.next_ack_code(timestamp, attempt, text);
        self.acks.add(expected_ack, recipient.as_bytes().to_vec(), self.clock_secs);
        debug!(expected_ack, is_flood, "text queued for delivery");

        Ok(vec![Response::Sent {
            is_flood,
            expected_ack,
            est_timeout_ms,
        }])
    }

    fn set_device_time(&mut self, r: &mut WireReader<'_>) -> Result<Vec<Response>, ProtocolError> {
        let secs = r.u32()?;
        // The RTC only moves forward.
        if secs < self.clock_secs {
            return Ok(vec![Response::Error(FirmwareErrorCode::IllegalArg)]);
        }
        self.clock_secs = secs;
        Ok(vec![Response::Ok])
    }

    /// Stand-in for the firmware's hash of the packet: distinct per message
    /// and retry, stable for identical inputs.
    fn next_ack_code(&mut self, timestamp: u32, attempt: u8, text: &[u8]) -> u32 {
        let mut code = self.ack_seed ^ timestamp ^ attempt as u32;
        for &b in text {
            code = code.rotate_left(5) ^ b as u32;
        }
        self.ack_seed = self.ack_seed.wrapping_mul(0x0100_0193).wrapping_add(1);
        code
    }
}

/// A [`ReferencePeer`] served over byte channels on a tokio task.
#[derive(Clone)]
pub struct PeerLink {
    peer: Arc<Mutex<ReferencePeer>>,
    outbound: mpsc::Sender<Bytes>,
    framing: Framing,
    chunk_size: usize,
}

impl PeerLink {
    /// Serve `peer`. Host bytes arrive on `inbound`; replies go to `outbound`
    /// split into chunks of `chunk_size` bytes (0 sends each frame whole).
    pub fn spawn(
        peer: ReferencePeer,
        framing: Framing,
        mut inbound: mpsc::Receiver<Bytes>,
        outbound: mpsc::Sender<Bytes>,
        chunk_size: usize,
    ) -> (PeerLink, JoinHandle<()>) {
        let link = PeerLink {
            peer: Arc::new(Mutex::new(peer)),
            outbound,
            framing,
            chunk_size,
        };

        let server = link.clone();
        let task = tokio::spawn(async move {
            let mut framer = server.framing.device_framer();
            while let Some(chunk) = inbound.recv().await {
                for frame in framer.ingest(&chunk) {
                    let replies = match server.peer.lock() {
                        Ok(mut peer) => peer.handle_command(&frame),
                        Err(_) => return,
                    };
                    for reply in replies {
                        if server.send(&reply).await.is_err() {
                            return;
                        }
                    }
                }
            }
            debug!("peer link inbound closed");
        });

        (link, task)
    }

    /// Run `f` against the peer, e.g. to add contacts or advance its clock.
    pub fn with_peer<R>(&self, f: impl FnOnce(&mut ReferencePeer) -> R) -> Option<R> {
        self.peer.lock().ok().map(|mut peer| f(&mut peer))
    }

    /// Write one unsolicited or reply frame to the host.
    pub async fn send(&self, payload: &[u8]) -> Result<(), SessionError> {
        let wire = self.framing.device_framer().wrap(payload)?;
        let step = if self.chunk_size == 0 { wire.len().max(1) } else { self.chunk_size };
        let mut offset = 0;
        while offset < wire.len() {
            let end = (offset + step).min(wire.len());
            self.outbound
                .send(wire.slice(offset..end))
                .await
                .map_err(|_| SessionError::TransportClosed)?;
            offset = end;
        }
        Ok(())
    }

    /// Deliver a mesh message to the peer and notify the host.
    pub async fn deliver_message(&self, frame: Vec<u8>) -> Result<(), SessionError> {
        let push = self
            .with_peer(|peer| peer.receive_message(frame))
            .ok_or(SessionError::Closed)??;
        self.send(&push).await
    }

    /// Deliver a mesh ACK to the peer, forwarding `SendConfirmed` if it
    /// matched. Returns whether it did.
    pub async fn deliver_ack(&self, ack_code: u32) -> Result<bool, SessionError> {
        match self.with_peer(|peer| peer.receive_ack(ack_code)).flatten() {
            Some(push) => {
                self.send(&push).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
