//! Commands sent from the host to the radio.
//!
//! Commands are one-way: the radio never sends them back, so only the
//! encoder lives here.

use bytes::BufMut;

use crate::constants::*;
use crate::records::{put_channel_info, put_contact};
use crate::types::*;

/// A request for the companion radio. Each variant maps to one `CMD_*` code.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Opens the conversation and announces the app protocol version.
    DeviceQuery { app_version: u8 },

    /// Registers the app; the radio replies with [`SelfInfo`].
    AppStart { app_version: u8, app_name: String },

    /// Direct message to a contact. The radio answers with `Sent`, and later
    /// pushes `SendConfirmed` carrying the same ACK code.
    SendTextMessage {
        text_type: TextType,
        /// Retry counter, folded into the ACK hash by the radio.
        attempt: u8,
        timestamp: u32,
        recipient: PublicKeyPrefix,
        text: String,
    },

    SendChannelTextMessage {
        text_type: TextType,
        channel_idx: u8,
        timestamp: u32,
        text: String,
    },

    /// Starts a contact enumeration. With `since`, only contacts modified
    /// strictly after that time are returned.
    GetContacts { since: Option<u32> },

    GetDeviceTime,
    SetDeviceTime { time_secs: u32 },
    SendSelfAdvert { flood: bool },
    SetAdvertName { name: String },

    /// Coordinates in micro-degrees.
    SetAdvertLatLon { lat: i32, lon: i32, alt: Option<i32> },

    AddUpdateContact { contact: ContactInfo },
    RemoveContact { public_key: PublicKey },
    ResetPath { public_key: PublicKey },
    GetContactByKey { public_key: PublicKey },
    ShareContact { public_key: PublicKey },
    /// `None` exports our own advert.
    ExportContact { public_key: Option<PublicKey> },
    ImportContact { data: Vec<u8> },

    /// Pops one entry off the radio's offline queue.
    SyncNextMessage,

    SetRadioParams { params: RadioParams },
    SetRadioTxPower { power_dbm: u8 },
    SetTuningParams { params: TuningParams },
    GetTuningParams,

    /// Trailing options are only written while every earlier one is present.
    SetOtherParams {
        manual_add_contacts: bool,
        telemetry_modes: Option<TelemetryModes>,
        advert_loc_policy: Option<u8>,
        multi_acks: Option<u8>,
    },

    Reboot,
    GetBatteryAndStorage,
    ExportPrivateKey,
    ImportPrivateKey { identity: [u8; IDENTITY_SIZE] },

    /// Empty `path` floods.
    SendRawData { path: Vec<u8>, payload: Vec<u8> },

    SendLogin { public_key: PublicKey, password: String },
    SendStatusRequest { public_key: PublicKey },
    HasConnection { public_key: PublicKey },
    Logout { public_key: PublicKey },
    GetChannel { index: u8 },
    SetChannel { channel: ChannelInfo },
    SignStart,
    SignData { data: Vec<u8> },
    SignFinish,
    SendTracePath { tag: u32, auth: u32, flags: u8, path: Vec<u8> },

    /// 0 disables the PIN, otherwise six digits.
    SetDevicePin { pin: u32 },

    /// `None` requests our own telemetry.
    SendTelemetryRequest { public_key: Option<PublicKey> },

    GetCustomVars,
    SetCustomVar { name: String, value: String },
    GetAdvertPath { public_key: PublicKey },
    SendBinaryRequest { public_key: PublicKey, data: Vec<u8> },
    FactoryReset,
    SendPathDiscoveryRequest { public_key: PublicKey },

    /// `None` clears the scope.
    SetFloodScope { key: Option<[u8; 16]> },

    /// The first data byte must have bit 7 set.
    SendControlData { data: Vec<u8> },

    /// One of the `STATS_TYPE_*` values.
    GetStats { stats_type: u8 },
}

impl Command {
    /// The command code byte.
    pub fn code(&self) -> u8 {
        match self {
            Command::DeviceQuery { .. } => CMD_DEVICE_QUERY,
            Command::AppStart { .. } => CMD_APP_START,
            Command::SendTextMessage { .. } => CMD_SEND_TXT_MSG,
            Command::SendChannelTextMessage { .. } => CMD_SEND_CHANNEL_TXT_MSG,
            Command::GetContacts { .. } => CMD_GET_CONTACTS,
            Command::GetDeviceTime => CMD_GET_DEVICE_TIME,
            Command::SetDeviceTime { .. } => CMD_SET_DEVICE_TIME,
            Command::SendSelfAdvert { .. } => CMD_SEND_SELF_ADVERT,
            Command::SetAdvertName { .. } => CMD_SET_ADVERT_NAME,
            Command::SetAdvertLatLon { .. } => CMD_SET_ADVERT_LATLON,
            Command::AddUpdateContact { .. } => CMD_ADD_UPDATE_CONTACT,
            Command::RemoveContact { .. } => CMD_REMOVE_CONTACT,
            Command::ResetPath { .. } => CMD_RESET_PATH,
            Command::GetContactByKey { .. } => CMD_GET_CONTACT_BY_KEY,
            Command::ShareContact { .. } => CMD_SHARE_CONTACT,
            Command::ExportContact { .. } => CMD_EXPORT_CONTACT,
            Command::ImportContact { .. } => CMD_IMPORT_CONTACT,
            Command::SyncNextMessage => CMD_SYNC_NEXT_MESSAGE,
            Command::SetRadioParams { .. } => CMD_SET_RADIO_PARAMS,
            Command::SetRadioTxPower { .. } => CMD_SET_RADIO_TX_POWER,
            Command::SetTuningParams { .. } => CMD_SET_TUNING_PARAMS,
            Command::GetTuningParams => CMD_GET_TUNING_PARAMS,
            Command::SetOtherParams { .. } => CMD_SET_OTHER_PARAMS,
            Command::Reboot => CMD_REBOOT,
            Command::GetBatteryAndStorage => CMD_GET_BATT_AND_STORAGE,
            Command::ExportPrivateKey => CMD_EXPORT_PRIVATE_KEY,
            Command::ImportPrivateKey { .. } => CMD_IMPORT_PRIVATE_KEY,
            Command::SendRawData { .. } => CMD_SEND_RAW_DATA,
            Command::SendLogin { .. } => CMD_SEND_LOGIN,
            Command::SendStatusRequest { .. } => CMD_SEND_STATUS_REQ,
            Command::HasConnection { .. } => CMD_HAS_CONNECTION,
            Command::Logout { .. } => CMD_LOGOUT,
            Command::GetChannel { .. } => CMD_GET_CHANNEL,
            Command::SetChannel { .. } => CMD_SET_CHANNEL,
            Command::SignStart => CMD_SIGN_START,
            Command::SignData { .. } => CMD_SIGN_DATA,
            Command::SignFinish => CMD_SIGN_FINISH,
            Command::SendTracePath { .. } => CMD_SEND_TRACE_PATH,
            Command::SetDevicePin { .. } => CMD_SET_DEVICE_PIN,
            Command::SendTelemetryRequest { .. } => CMD_SEND_TELEMETRY_REQ,
            Command::GetCustomVars => CMD_GET_CUSTOM_VARS,
            Command::SetCustomVar { .. } => CMD_SET_CUSTOM_VAR,
            Command::GetAdvertPath { .. } => CMD_GET_ADVERT_PATH,
            Command::SendBinaryRequest { .. } => CMD_SEND_BINARY_REQ,
            Command::FactoryReset => CMD_FACTORY_RESET,
            Command::SendPathDiscoveryRequest { .. } => CMD_SEND_PATH_DISCOVERY_REQ,
            Command::SetFloodScope { .. } => CMD_SET_FLOOD_SCOPE,
            Command::SendControlData { .. } => CMD_SEND_CONTROL_DATA,
            Command::GetStats { .. } => CMD_GET_STATS,
        }
    }

    /// Encode into a frame payload (code byte first).
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_FRAME_SIZE);
        buf.put_u8(self.code());

        match self {
            Command::DeviceQuery { app_version } => buf.put_u8(*app_version),

            Command::AppStart {
                app_version,
                app_name,
            } => {
                buf.put_u8(*app_version);
                buf.put_bytes(0, 6);
                buf.put_slice(app_name.as_bytes());
            }

            Command::SendTextMessage {
                text_type,
                attempt,
                timestamp,
                recipient,
                text,
            } => {
                buf.put_u8((*text_type).into());
                buf.put_u8(*attempt);
                buf.put_u32_le(*timestamp);
                buf.put_slice(recipient.as_bytes());
                buf.put_slice(text.as_bytes());
            }

            Command::SendChannelTextMessage {
                text_type,
                channel_idx,
                timestamp,
                text,
            } => {
                buf.put_u8((*text_type).into());
                buf.put_u8(*channel_idx);
                buf.put_u32_le(*timestamp);
                buf.put_slice(text.as_bytes());
            }

            Command::GetContacts { since } => {
                if let Some(since) = since {
                    buf.put_u32_le(*since);
                }
            }

            Command::SetDeviceTime { time_secs } => buf.put_u32_le(*time_secs),
            Command::SendSelfAdvert { flood } => buf.put_u8(*flood as u8),
            Command::SetAdvertName { name } => buf.put_slice(name.as_bytes()),

            Command::SetAdvertLatLon { lat, lon, alt } => {
                buf.put_i32_le(*lat);
                buf.put_i32_le(*lon);
                if let Some(alt) = alt {
                    buf.put_i32_le(*alt);
                }
            }

            Command::AddUpdateContact { contact } => put_contact(&mut buf, contact, false),

            Command::RemoveContact { public_key }
            | Command::ResetPath { public_key }
            | Command::GetContactByKey { public_key }
            | Command::ShareContact { public_key }
            | Command::SendStatusRequest { public_key }
            | Command::HasConnection { public_key }
            | Command::Logout { public_key } => buf.put_slice(public_key.as_bytes()),

            Command::ExportContact { public_key } => {
                if let Some(key) = public_key {
                    buf.put_slice(key.as_bytes());
                }
            }

            Command::ImportContact { data }
            | Command::SignData { data }
            | Command::SendControlData { data } => buf.put_slice(data),

            Command::SetRadioParams { params } => {
                buf.put_u32_le(params.freq_khz);
                buf.put_u32_le(params.bandwidth_hz);
                buf.put_u8(params.spreading_factor);
                buf.put_u8(params.coding_rate);
            }

            Command::SetRadioTxPower { power_dbm } => buf.put_u8(*power_dbm),

            Command::SetTuningParams { params } => {
                buf.put_u32_le(params.rx_delay_base);
                buf.put_u32_le(params.airtime_factor);
            }

            Command::SetOtherParams {
                manual_add_contacts,
                telemetry_modes,
                advert_loc_policy,
                multi_acks,
            } => {
                buf.put_u8(*manual_add_contacts as u8);
                if let Some(modes) = telemetry_modes {
                    buf.put_u8(modes.packed());
                    if let Some(policy) = advert_loc_policy {
                        buf.put_u8(*policy);
                        if let Some(acks) = multi_acks {
                            buf.put_u8(*acks);
                        }
                    }
                }
            }

            // Destructive commands carry a confirmation word.
            Command::Reboot => buf.put_slice(b"reboot"),
            Command::FactoryReset => buf.put_slice(b"reset"),

            Command::ImportPrivateKey { identity } => buf.put_slice(identity),

            Command::SendRawData { path, payload } => {
                buf.put_u8(path.len() as u8);
                buf.put_slice(path);
                buf.put_slice(payload);
            }

            Command::SendLogin {
                public_key,
                password,
            } => {
                buf.put_slice(public_key.as_bytes());
                buf.put_slice(password.as_bytes());
            }

            Command::GetChannel { index } => buf.put_u8(*index),
            Command::SetChannel { channel } => put_channel_info(&mut buf, channel),

            Command::SendTracePath {
                tag,
                auth,
                flags,
                path,
            } => {
                buf.put_u32_le(*tag);
                buf.put_u32_le(*auth);
                buf.put_u8(*flags);
                buf.put_slice(path);
            }

            Command::SetDevicePin { pin } => buf.put_u32_le(*pin),

            Command::SendTelemetryRequest { public_key } => {
                buf.put_bytes(0, 3);
                if let Some(key) = public_key {
                    buf.put_slice(key.as_bytes());
                }
            }

            Command::SetCustomVar { name, value } => {
                buf.put_slice(name.as_bytes());
                buf.put_u8(b':');
                buf.put_slice(value.as_bytes());
            }

            Command::GetAdvertPath { public_key }
            | Command::SendPathDiscoveryRequest { public_key } => {
                buf.put_u8(0);
                buf.put_slice(public_key.as_bytes());
            }

            Command::SendBinaryRequest { public_key, data } => {
                buf.put_slice(public_key.as_bytes());
                buf.put_slice(data);
            }

            Command::SetFloodScope { key } => {
                buf.put_u8(0);
                if let Some(key) = key {
                    buf.put_slice(key);
                }
            }

            Command::GetStats { stats_type } => buf.put_u8(*stats_type),

            Command::GetDeviceTime
            | Command::SyncNextMessage
            | Command::GetTuningParams
            | Command::GetBatteryAndStorage
            | Command::ExportPrivateKey
            | Command::SignStart
            | Command::SignFinish
            | Command::GetCustomVars => {}
        }

        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_text_message_layout() {
        let cmd = Command::SendTextMessage {
            text_type: TextType::Plain,
            attempt: 1,
            timestamp: 0x0403_0201,
            recipient: PublicKeyPrefix([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]),
            text: "hi".to_string(),
        };
        assert_eq!(
            cmd.encode(),
            vec![
                CMD_SEND_TXT_MSG, 0, 1, 0x01, 0x02, 0x03, 0x04, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4,
                0xA5, b'h', b'i'
            ]
        );
    }

    #[test]
    fn test_get_contacts_since_is_optional() {
        assert_eq!(Command::GetContacts { since: None }.encode(), vec![CMD_GET_CONTACTS]);
        assert_eq!(
            Command::GetContacts {
                since: Some(1_700_000_000)
            }
            .encode(),
            vec![CMD_GET_CONTACTS, 0x00, 0xF1, 0x53, 0x65]
        );
    }

    #[test]
    fn test_set_radio_params_scaling() {
        let cmd = Command::SetRadioParams {
            params: RadioParams {
                freq_khz: 869_525,
                bandwidth_hz: 250_000,
                spreading_factor: 11,
                coding_rate: 5,
            },
        };
        let bytes = cmd.encode();
        assert_eq!(bytes.len(), 11);
        assert_eq!(u32::from_le_bytes(bytes[1..5].try_into().unwrap()), 869_525);
        assert_eq!(u32::from_le_bytes(bytes[5..9].try_into().unwrap()), 250_000);
        assert_eq!(&bytes[9..], &[11, 5]);
    }

    #[test]
    fn test_add_update_contact_omits_lastmod() {
        let cmd = Command::AddUpdateContact {
            contact: ContactInfo {
                name: "Base".to_string(),
                lastmod: 99,
                ..Default::default()
            },
        };
        assert_eq!(cmd.encode().len(), 1 + CONTACT_RECORD_SIZE - 4);
    }

    #[test]
    fn test_set_other_params_stops_at_first_missing_option() {
        let cmd = Command::SetOtherParams {
            manual_add_contacts: true,
            telemetry_modes: Some(TelemetryModes {
                base: TELEM_MODE_ALLOW_ALL,
                location: TELEM_MODE_DENY,
                environment: TELEM_MODE_ALLOW_FLAGS,
            }),
            advert_loc_policy: None,
            multi_acks: Some(2),
        };
        assert_eq!(cmd.encode(), vec![CMD_SET_OTHER_PARAMS, 1, 0b0001_0010]);
    }

    #[test]
    fn test_simple_commands_are_one_byte() {
        for cmd in [
            Command::GetDeviceTime,
            Command::SyncNextMessage,
            Command::GetBatteryAndStorage,
            Command::SignStart,
        ] {
            assert_eq!(cmd.encode(), vec![cmd.code()]);
        }
        assert_eq!(Command::Reboot.encode(), b"\x13reboot".to_vec());
    }
}
