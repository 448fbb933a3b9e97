//! Frames sent by the radio: solicited responses and unsolicited pushes.
//!
//! Decoding never panics. Callers that must keep going on bad input use
//! [`Message::parse`], which folds every decode error into
//! [`Message::ParseFailure`] together with the offending bytes.

use bytes::{BufMut, Bytes};
use log::debug;

use crate::constants::*;
use crate::error::*;
use crate::records::*;
use crate::types::*;
use crate::wire::WireReader;

/// Replies to a command (codes below 0x80).
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok,
    Error(FirmwareErrorCode),
    Disabled,

    /// First frame of a contact enumeration.
    ContactsStart { total_count: u32 },
    Contact(ContactInfo),
    /// Last frame of a contact enumeration; carries the sync watermark.
    EndOfContacts { most_recent_lastmod: u32 },

    SelfInfo(SelfInfo),

    /// Receipt for a direct or channel send.
    Sent {
        is_flood: bool,
        /// ACK code the radio will push in `SendConfirmed` once delivered.
        expected_ack: u32,
        est_timeout_ms: u32,
    },

    CurrentTime { time_secs: u32 },
    /// The offline queue is drained.
    NoMoreMessages,
    ExportedContact { data: Vec<u8> },
    BatteryAndStorage(BatteryAndStorage),
    DeviceInfo(DeviceInfo),
    PrivateKey { identity: [u8; IDENTITY_SIZE] },

    ContactMessageV1(ContactMessage),
    ContactMessageV3(ContactMessage),
    ChannelMessageV1(ChannelMessage),
    ChannelMessageV3(ChannelMessage),

    ChannelInfo(ChannelInfo),
    SignStart { max_len: u32 },
    Signature { signature: [u8; SIGNATURE_SIZE] },
    /// `name:value` pairs, in radio order.
    CustomVars { vars: Vec<(String, String)> },
    AdvertPath { recv_timestamp: u32, path: Vec<u8> },
    TuningParams(TuningParams),
    StatsCore(CoreStats),
    StatsRadio(RadioStats),
    StatsPackets(PacketStats),
}

/// Unsolicited notifications (codes 0x80 and up).
#[derive(Debug, Clone, PartialEq)]
pub enum PushNotification {
    Advert { public_key: PublicKey },
    /// Sent instead of `Advert` when auto-add is off.
    NewAdvert(ContactInfo),
    PathUpdated { public_key: PublicKey },
    /// A direct message was acknowledged by its recipient.
    SendConfirmed { ack_code: u32, trip_time_ms: u32 },
    /// New entries are waiting in the offline queue.
    MessageWaiting,
    RawData { snr_x4: i8, rssi: i8, payload: Vec<u8> },
    LoginSuccess {
        is_admin: bool,
        server_prefix: PublicKeyPrefix,
        server_timestamp: Option<u32>,
        acl_permissions: Option<u8>,
        firmware_ver_level: Option<u8>,
    },
    LoginFail { server_prefix: PublicKeyPrefix },
    StatusResponse {
        server_prefix: PublicKeyPrefix,
        /// Decoded when the block is long enough.
        status: Option<RepeaterStatus>,
        data: Vec<u8>,
    },
    LogRxData { snr_x4: i8, rssi: i8, raw: Vec<u8> },
    TraceData {
        flags: u8,
        tag: u32,
        auth_code: u32,
        path_hashes: Vec<u8>,
        path_snrs: Vec<u8>,
        final_snr_x4: i8,
    },
    Telemetry(TelemetryResponse),
    BinaryResponse { tag: u32, data: Vec<u8> },
    PathDiscoveryResponse {
        target_prefix: PublicKeyPrefix,
        out_path: Vec<u8>,
        in_path: Vec<u8>,
    },
    ControlData {
        snr_x4: i8,
        rssi: i8,
        path_len: u8,
        payload: ControlPayload,
    },
}

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Response(Response),
    Push(PushNotification),
    /// The frame could not be decoded.
    ParseFailure { raw: Bytes, reason: ProtocolError },
}

impl Message {
    /// Decode a frame, returning the error on malformed input.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let code = *frame.first().ok_or(ProtocolError::EmptyFrame)?;
        if code & PUSH_CODE_MASK != 0 {
            PushNotification::decode(frame).map(Message::Push)
        } else {
            Response::decode(frame).map(Message::Response)
        }
    }

    /// Decode a frame, turning any error into [`Message::ParseFailure`].
    pub fn parse(frame: &[u8]) -> Self {
        match Message::decode(frame) {
            Ok(message) => message,
            Err(reason) => {
                debug!("undecodable frame ({} bytes): {}", frame.len(), reason);
                Message::ParseFailure {
                    raw: Bytes::copy_from_slice(frame),
                    reason,
                }
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Message::Response(response) => response.encode(),
            Message::Push(push) => push.encode(),
            Message::ParseFailure { raw, .. } => raw.to_vec(),
        }
    }

    pub fn is_push(&self) -> bool {
        matches!(self, Message::Push(_))
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

impl From<PushNotification> for Message {
    fn from(push: PushNotification) -> Self {
        Message::Push(push)
    }
}

impl Response {
    /// Decode a response frame (code byte first).
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&code, body) = frame.split_first().ok_or(ProtocolError::EmptyFrame)?;
        let mut r = WireReader::new(body);

        let response = match code {
            RESP_CODE_OK => Response::Ok,
            RESP_CODE_ERR => Response::Error(FirmwareErrorCode::from(r.u8()?)),
            RESP_CODE_DISABLED => Response::Disabled,
            RESP_CODE_NO_MORE_MESSAGES => Response::NoMoreMessages,

            RESP_CODE_CONTACTS_START => Response::ContactsStart {
                total_count: r.u32()?,
            },
            RESP_CODE_CONTACT => Response::Contact(read_contact(body)?),
            RESP_CODE_END_OF_CONTACTS => Response::EndOfContacts {
                most_recent_lastmod: r.u32()?,
            },

            RESP_CODE_SELF_INFO => Response::SelfInfo(read_self_info(body)?),

            RESP_CODE_SENT => {
                r.require(9)?;
                Response::Sent {
                    is_flood: r.u8()? != 0,
                    expected_ack: r.u32()?,
                    est_timeout_ms: r.u32()?,
                }
            }

            RESP_CODE_CURR_TIME => Response::CurrentTime {
                time_secs: r.u32()?,
            },
            RESP_CODE_EXPORT_CONTACT => Response::ExportedContact {
                data: body.to_vec(),
            },

            RESP_CODE_BATT_AND_STORAGE => {
                let battery_millivolts = r.u16()?;
                let storage = if r.remaining() >= 8 {
                    Some(StorageInfo {
                        used_kb: r.u32()?,
                        total_kb: r.u32()?,
                    })
                } else {
                    None
                };
                Response::BatteryAndStorage(BatteryAndStorage {
                    battery_millivolts,
                    storage,
                })
            }

            RESP_CODE_DEVICE_INFO => Response::DeviceInfo(read_device_info(body)?),
            RESP_CODE_PRIVATE_KEY => Response::PrivateKey {
                identity: r.array()?,
            },

            RESP_CODE_CONTACT_MSG_RECV => {
                Response::ContactMessageV1(read_contact_message(body, MessageLayout::V1)?)
            }
            RESP_CODE_CONTACT_MSG_RECV_V3 => {
                Response::ContactMessageV3(read_contact_message(body, MessageLayout::V3)?)
            }
            RESP_CODE_CHANNEL_MSG_RECV => {
                Response::ChannelMessageV1(read_channel_message(body, MessageLayout::V1)?)
            }
            RESP_CODE_CHANNEL_MSG_RECV_V3 => {
                Response::ChannelMessageV3(read_channel_message(body, MessageLayout::V3)?)
            }

            RESP_CODE_CHANNEL_INFO => Response::ChannelInfo(read_channel_info(body)?),

            RESP_CODE_SIGN_START => {
                r.require(5)?;
                r.skip(1)?;
                Response::SignStart { max_len: r.u32()? }
            }
            RESP_CODE_SIGNATURE => Response::Signature {
                signature: r.array()?,
            },

            RESP_CODE_CUSTOM_VARS => Response::CustomVars {
                vars: parse_custom_vars(&r.rest_text()),
            },

            RESP_CODE_ADVERT_PATH => {
                r.require(5)?;
                Response::AdvertPath {
                    recv_timestamp: r.u32()?,
                    path: read_path(&mut r)?,
                }
            }

            RESP_CODE_TUNING_PARAMS => {
                r.require(8)?;
                Response::TuningParams(TuningParams {
                    rx_delay_base: r.u32()?,
                    airtime_factor: r.u32()?,
                })
            }

            RESP_CODE_STATS => match r.u8()? {
                STATS_TYPE_CORE => Response::StatsCore(read_core_stats(&mut r)?),
                STATS_TYPE_RADIO => Response::StatsRadio(read_radio_stats(&mut r)?),
                STATS_TYPE_PACKETS => Response::StatsPackets(read_packet_stats(&mut r)?),
                other => return Err(ProtocolError::UnknownStatsType(other)),
            },

            other => return Err(ProtocolError::UnknownResponse(other)),
        };

        Ok(response)
    }

    pub fn code(&self) -> u8 {
        match self {
            Response::Ok => RESP_CODE_OK,
            Response::Error(_) => RESP_CODE_ERR,
            Response::Disabled => RESP_CODE_DISABLED,
            Response::ContactsStart { .. } => RESP_CODE_CONTACTS_START,
            Response::Contact(_) => RESP_CODE_CONTACT,
            Response::EndOfContacts { .. } => RESP_CODE_END_OF_CONTACTS,
            Response::SelfInfo(_) => RESP_CODE_SELF_INFO,
            Response::Sent { .. } => RESP_CODE_SENT,
            Response::CurrentTime { .. } => RESP_CODE_CURR_TIME,
            Response::NoMoreMessages => RESP_CODE_NO_MORE_MESSAGES,
            Response::ExportedContact { .. } => RESP_CODE_EXPORT_CONTACT,
            Response::BatteryAndStorage(_) => RESP_CODE_BATT_AND_STORAGE,
            Response::DeviceInfo(_) => RESP_CODE_DEVICE_INFO,
            Response::PrivateKey { .. } => RESP_CODE_PRIVATE_KEY,
            Response::ContactMessageV1(_) => RESP_CODE_CONTACT_MSG_RECV,
            Response::ContactMessageV3(_) => RESP_CODE_CONTACT_MSG_RECV_V3,
            Response::ChannelMessageV1(_) => RESP_CODE_CHANNEL_MSG_RECV,
            Response::ChannelMessageV3(_) => RESP_CODE_CHANNEL_MSG_RECV_V3,
            Response::ChannelInfo(_) => RESP_CODE_CHANNEL_INFO,
            Response::SignStart { .. } => RESP_CODE_SIGN_START,
            Response::Signature { .. } => RESP_CODE_SIGNATURE,
            Response::CustomVars { .. } => RESP_CODE_CUSTOM_VARS,
            Response::AdvertPath { .. } => RESP_CODE_ADVERT_PATH,
            Response::TuningParams(_) => RESP_CODE_TUNING_PARAMS,
            Response::StatsCore(_) | Response::StatsRadio(_) | Response::StatsPackets(_) => {
                RESP_CODE_STATS
            }
        }
    }

    /// Encode as the radio would send it.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_FRAME_SIZE);
        buf.put_u8(self.code());

        match self {
            Response::Ok | Response::Disabled | Response::NoMoreMessages => {}
            Response::Error(code) => buf.put_u8((*code).into()),
            Response::ContactsStart { total_count } => buf.put_u32_le(*total_count),
            Response::Contact(contact) => put_contact(&mut buf, contact, true),
            Response::EndOfContacts {
                most_recent_lastmod,
            } => buf.put_u32_le(*most_recent_lastmod),
            Response::SelfInfo(info) => put_self_info(&mut buf, info),
            Response::Sent {
                is_flood,
                expected_ack,
                est_timeout_ms,
            } => {
                buf.put_u8(*is_flood as u8);
                buf.put_u32_le(*expected_ack);
                buf.put_u32_le(*est_timeout_ms);
            }
            Response::CurrentTime { time_secs } => buf.put_u32_le(*time_secs),
            Response::ExportedContact { data } => buf.put_slice(data),
            Response::BatteryAndStorage(batt) => {
                buf.put_u16_le(batt.battery_millivolts);
                if let Some(storage) = &batt.storage {
                    buf.put_u32_le(storage.used_kb);
                    buf.put_u32_le(storage.total_kb);
                }
            }
            Response::DeviceInfo(info) => put_device_info(&mut buf, info),
            Response::PrivateKey { identity } => buf.put_slice(identity),
            Response::ContactMessageV1(msg) => put_contact_message(&mut buf, msg, MessageLayout::V1),
            Response::ContactMessageV3(msg) => put_contact_message(&mut buf, msg, MessageLayout::V3),
            Response::ChannelMessageV1(msg) => put_channel_message(&mut buf, msg, MessageLayout::V1),
            Response::ChannelMessageV3(msg) => put_channel_message(&mut buf, msg, MessageLayout::V3),
            Response::ChannelInfo(channel) => put_channel_info(&mut buf, channel),
            Response::SignStart { max_len } => {
                buf.put_u8(0);
                buf.put_u32_le(*max_len);
            }
            Response::Signature { signature } => buf.put_slice(signature),
            Response::CustomVars { vars } => {
                let joined = vars
                    .iter()
                    .map(|(name, value)| format!("{}:{}", name, value))
                    .collect::<Vec<_>>()
                    .join(",");
                buf.put_slice(joined.as_bytes());
            }
            Response::AdvertPath {
                recv_timestamp,
                path,
            } => {
                buf.put_u32_le(*recv_timestamp);
                put_path(&mut buf, path);
            }
            Response::TuningParams(params) => {
                buf.put_u32_le(params.rx_delay_base);
                buf.put_u32_le(params.airtime_factor);
            }
            Response::StatsCore(stats) => {
                buf.put_u8(STATS_TYPE_CORE);
                buf.put_u16_le(stats.battery_mv);
                buf.put_u32_le(stats.uptime_secs);
                buf.put_u16_le(stats.error_count);
                buf.put_u8(stats.queue_len);
            }
            Response::StatsRadio(stats) => {
                buf.put_u8(STATS_TYPE_RADIO);
                buf.put_i16_le(stats.noise_floor);
                buf.put_i8(stats.last_rssi);
                buf.put_i8(stats.last_snr_x4);
                buf.put_u32_le(stats.tx_air_secs);
                buf.put_u32_le(stats.rx_air_secs);
            }
            Response::StatsPackets(stats) => {
                buf.put_u8(STATS_TYPE_PACKETS);
                for counter in [
                    stats.recv,
                    stats.sent,
                    stats.sent_flood,
                    stats.sent_direct,
                    stats.recv_flood,
                    stats.recv_direct,
                ] {
                    buf.put_u32_le(counter);
                }
            }
        }

        buf
    }
}

impl PushNotification {
    /// Decode a push frame (code byte first).
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let (&code, body) = frame.split_first().ok_or(ProtocolError::EmptyFrame)?;
        let mut r = WireReader::new(body);

        let push = match code {
            PUSH_CODE_ADVERT => PushNotification::Advert {
                public_key: PublicKey(r.array()?),
            },
            PUSH_CODE_NEW_ADVERT => PushNotification::NewAdvert(read_contact(body)?),
            PUSH_CODE_PATH_UPDATED => PushNotification::PathUpdated {
                public_key: PublicKey(r.array()?),
            },

            PUSH_CODE_SEND_CONFIRMED => {
                r.require(8)?;
                PushNotification::SendConfirmed {
                    ack_code: r.u32()?,
                    trip_time_ms: r.u32()?,
                }
            }

            PUSH_CODE_MSG_WAITING => PushNotification::MessageWaiting,

            PUSH_CODE_RAW_DATA => {
                r.require(3)?;
                let snr_x4 = r.i8()?;
                let rssi = r.i8()?;
                r.skip(1)?;
                PushNotification::RawData {
                    snr_x4,
                    rssi,
                    payload: r.rest().to_vec(),
                }
            }

            PUSH_CODE_LOGIN_SUCCESS => {
                r.require(1 + PUB_KEY_PREFIX_SIZE)?;
                let is_admin = r.u8()? != 0;
                let server_prefix = PublicKeyPrefix(r.array()?);
                // v7+ firmware appends timestamp, ACL and firmware level.
                let server_timestamp = r.u32().ok();
                let acl_permissions = server_timestamp.and_then(|_| r.u8().ok());
                let firmware_ver_level = acl_permissions.and_then(|_| r.u8().ok());
                PushNotification::LoginSuccess {
                    is_admin,
                    server_prefix,
                    server_timestamp,
                    acl_permissions,
                    firmware_ver_level,
                }
            }

            PUSH_CODE_LOGIN_FAIL => {
                r.require(1 + PUB_KEY_PREFIX_SIZE)?;
                r.skip(1)?;
                PushNotification::LoginFail {
                    server_prefix: PublicKeyPrefix(r.array()?),
                }
            }

            PUSH_CODE_STATUS_RESPONSE => {
                r.require(1 + PUB_KEY_PREFIX_SIZE)?;
                r.skip(1)?;
                let server_prefix = PublicKeyPrefix(r.array()?);
                let data = r.rest();
                PushNotification::StatusResponse {
                    server_prefix,
                    status: read_repeater_status(data).ok(),
                    data: data.to_vec(),
                }
            }

            PUSH_CODE_LOG_RX_DATA => {
                r.require(2)?;
                PushNotification::LogRxData {
                    snr_x4: r.i8()?,
                    rssi: r.i8()?,
                    raw: r.rest().to_vec(),
                }
            }

            PUSH_CODE_TRACE_DATA => {
                r.require(11)?;
                r.skip(1)?;
                let path_len = r.u8()? as usize;
                let flags = r.u8()?;
                let tag = r.u32()?;
                let auth_code = r.u32()?;
                let path_hashes = r.bytes(path_len)?.to_vec();
                // Hash width is 1 << (flags & 3), one SNR per hop.
                let path_snrs = r.bytes(path_len >> (flags & 0x03))?.to_vec();
                PushNotification::TraceData {
                    flags,
                    tag,
                    auth_code,
                    path_hashes,
                    path_snrs,
                    final_snr_x4: r.i8()?,
                }
            }

            PUSH_CODE_TELEMETRY_RESPONSE => PushNotification::Telemetry(read_pushed_telemetry(body)?),

            PUSH_CODE_BINARY_RESPONSE => {
                r.require(5)?;
                r.skip(1)?;
                PushNotification::BinaryResponse {
                    tag: r.u32()?,
                    data: r.rest().to_vec(),
                }
            }

            PUSH_CODE_PATH_DISCOVERY_RESPONSE => {
                r.require(1 + PUB_KEY_PREFIX_SIZE)?;
                r.skip(1)?;
                let target_prefix = PublicKeyPrefix(r.array()?);
                // Older firmware may stop after the prefix.
                let out_path = if r.remaining() > 0 { read_path(&mut r)? } else { Vec::new() };
                let in_path = if r.remaining() > 0 { read_path(&mut r)? } else { Vec::new() };
                PushNotification::PathDiscoveryResponse {
                    target_prefix,
                    out_path,
                    in_path,
                }
            }

            PUSH_CODE_CONTROL_DATA => {
                r.require(4)?;
                PushNotification::ControlData {
                    snr_x4: r.i8()?,
                    rssi: r.i8()?,
                    path_len: r.u8()?,
                    payload: read_control_payload(&mut r)?,
                }
            }

            other => return Err(ProtocolError::UnknownResponse(other)),
        };

        Ok(push)
    }

    pub fn code(&self) -> u8 {
        match self {
            PushNotification::Advert { .. } => PUSH_CODE_ADVERT,
            PushNotification::NewAdvert(_) => PUSH_CODE_NEW_ADVERT,
            PushNotification::PathUpdated { .. } => PUSH_CODE_PATH_UPDATED,
            PushNotification::SendConfirmed { .. } => PUSH_CODE_SEND_CONFIRMED,
            PushNotification::MessageWaiting => PUSH_CODE_MSG_WAITING,
            PushNotification::RawData { .. } => PUSH_CODE_RAW_DATA,
            PushNotification::LoginSuccess { .. } => PUSH_CODE_LOGIN_SUCCESS,
            PushNotification::LoginFail { .. } => PUSH_CODE_LOGIN_FAIL,
            PushNotification::StatusResponse { .. } => PUSH_CODE_STATUS_RESPONSE,
            PushNotification::LogRxData { .. } => PUSH_CODE_LOG_RX_DATA,
            PushNotification::TraceData { .. } => PUSH_CODE_TRACE_DATA,
            PushNotification::Telemetry(_) => PUSH_CODE_TELEMETRY_RESPONSE,
            PushNotification::BinaryResponse { .. } => PUSH_CODE_BINARY_RESPONSE,
            PushNotification::PathDiscoveryResponse { .. } => PUSH_CODE_PATH_DISCOVERY_RESPONSE,
            PushNotification::ControlData { .. } => PUSH_CODE_CONTROL_DATA,
        }
    }

    /// Encode as the radio would send it.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_FRAME_SIZE);
        buf.put_u8(self.code());

        match self {
            PushNotification::Advert { public_key }
            | PushNotification::PathUpdated { public_key } => buf.put_slice(public_key.as_bytes()),
            PushNotification::NewAdvert(contact) => put_contact(&mut buf, contact, true),
            PushNotification::SendConfirmed {
                ack_code,
                trip_time_ms,
            } => {
                buf.put_u32_le(*ack_code);
                buf.put_u32_le(*trip_time_ms);
            }
            PushNotification::MessageWaiting => {}
            PushNotification::RawData {
                snr_x4,
                rssi,
                payload,
            } => {
                buf.put_i8(*snr_x4);
                buf.put_i8(*rssi);
                buf.put_u8(0xFF);
                buf.put_slice(payload);
            }
            PushNotification::LoginSuccess {
                is_admin,
                server_prefix,
                server_timestamp,
                acl_permissions,
                firmware_ver_level,
            } => {
                buf.put_u8(*is_admin as u8);
                buf.put_slice(server_prefix.as_bytes());
                if let Some(ts) = server_timestamp {
                    buf.put_u32_le(*ts);
                    if let Some(acl) = acl_permissions {
                        buf.put_u8(*acl);
                        if let Some(level) = firmware_ver_level {
                            buf.put_u8(*level);
                        }
                    }
                }
            }
            PushNotification::LoginFail { server_prefix } => {
                buf.put_u8(0);
                buf.put_slice(server_prefix.as_bytes());
            }
            PushNotification::StatusResponse {
                server_prefix,
                data,
                ..
            } => {
                buf.put_u8(0);
                buf.put_slice(server_prefix.as_bytes());
                buf.put_slice(data);
            }
            PushNotification::LogRxData { snr_x4, rssi, raw } => {
                buf.put_i8(*snr_x4);
                buf.put_i8(*rssi);
                buf.put_slice(raw);
            }
            PushNotification::TraceData {
                flags,
                tag,
                auth_code,
                path_hashes,
                path_snrs,
                final_snr_x4,
            } => {
                buf.put_u8(0);
                buf.put_u8(path_hashes.len() as u8);
                buf.put_u8(*flags);
                buf.put_u32_le(*tag);
                buf.put_u32_le(*auth_code);
                buf.put_slice(path_hashes);
                buf.put_slice(path_snrs);
                buf.put_i8(*final_snr_x4);
            }
            PushNotification::Telemetry(telemetry) => {
                buf.put_u8(0);
                buf.put_slice(telemetry.responder_prefix.as_bytes());
                buf.put_slice(&telemetry.data);
            }
            PushNotification::BinaryResponse { tag, data } => {
                buf.put_u8(0);
                buf.put_u32_le(*tag);
                buf.put_slice(data);
            }
            PushNotification::PathDiscoveryResponse {
                target_prefix,
                out_path,
                in_path,
            } => {
                buf.put_u8(0);
                buf.put_slice(target_prefix.as_bytes());
                put_path(&mut buf, out_path);
                put_path(&mut buf, in_path);
            }
            PushNotification::ControlData {
                snr_x4,
                rssi,
                path_len,
                payload,
            } => {
                buf.put_i8(*snr_x4);
                buf.put_i8(*rssi);
                buf.put_u8(*path_len);
                put_control_payload(&mut buf, payload);
            }
        }

        buf
    }
}

impl PushNotification {
    /// A status push carrying an encoded [`RepeaterStatus`] block.
    pub fn status_response(server_prefix: PublicKeyPrefix, status: RepeaterStatus) -> Self {
        let mut data = Vec::with_capacity(RepeaterStatus::MIN_SIZE + 4);
        put_repeater_status(&mut data, &status);
        PushNotification::StatusResponse {
            server_prefix,
            status: Some(status),
            data,
        }
    }
}

impl TelemetryResponse {
    /// Decode telemetry returned for a binary telemetry request:
    /// `prefix(6) + tag(4) + data`.
    pub fn decode_polled(data: &[u8]) -> Result<Self, ProtocolError> {
        read_polled_telemetry(data)
    }
}

fn parse_custom_vars(text: &str) -> Vec<(String, String)> {
    text.split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => (entry.to_string(), String::new()),
        })
        .collect()
}
