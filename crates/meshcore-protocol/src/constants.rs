//! Wire constants for the MeshCore companion protocol.
//!
//! Command codes travel host → radio, response codes radio → host as the
//! reply to a command, and push codes (high bit set) are sent unsolicited.

// ============================================================================
// Stream framing
// ============================================================================

/// Delimiter that starts every host → radio frame on a stream transport (`<`).
pub const FRAME_DELIM_OUTBOUND: u8 = 0x3C;
/// Delimiter that starts every radio → host frame on a stream transport (`>`).
pub const FRAME_DELIM_INBOUND: u8 = 0x3E;
/// Delimiter byte plus the 2-byte little-endian length.
pub const FRAME_HEADER_SIZE: usize = 3;

// ============================================================================
// Command codes (host → radio)
// ============================================================================

pub const CMD_APP_START: u8 = 1;
pub const CMD_SEND_TXT_MSG: u8 = 2;
pub const CMD_SEND_CHANNEL_TXT_MSG: u8 = 3;
/// Enumerate contacts, optionally only those modified after a timestamp.
pub const CMD_GET_CONTACTS: u8 = 4;
pub const CMD_GET_DEVICE_TIME: u8 = 5;
pub const CMD_SET_DEVICE_TIME: u8 = 6;
pub const CMD_SEND_SELF_ADVERT: u8 = 7;
pub const CMD_SET_ADVERT_NAME: u8 = 8;
pub const CMD_ADD_UPDATE_CONTACT: u8 = 9;
/// Pop the oldest entry from the radio's offline message queue.
pub const CMD_SYNC_NEXT_MESSAGE: u8 = 10;
pub const CMD_SET_RADIO_PARAMS: u8 = 11;
pub const CMD_SET_RADIO_TX_POWER: u8 = 12;
pub const CMD_RESET_PATH: u8 = 13;
pub const CMD_SET_ADVERT_LATLON: u8 = 14;
pub const CMD_REMOVE_CONTACT: u8 = 15;
pub const CMD_SHARE_CONTACT: u8 = 16;
pub const CMD_EXPORT_CONTACT: u8 = 17;
pub const CMD_IMPORT_CONTACT: u8 = 18;
pub const CMD_REBOOT: u8 = 19;
pub const CMD_GET_BATT_AND_STORAGE: u8 = 20;
pub const CMD_SET_TUNING_PARAMS: u8 = 21;
/// First command of a connection; announces the app protocol version.
pub const CMD_DEVICE_QUERY: u8 = 22;
pub const CMD_EXPORT_PRIVATE_KEY: u8 = 23;
pub const CMD_IMPORT_PRIVATE_KEY: u8 = 24;
pub const CMD_SEND_RAW_DATA: u8 = 25;
pub const CMD_SEND_LOGIN: u8 = 26;
pub const CMD_SEND_STATUS_REQ: u8 = 27;
pub const CMD_HAS_CONNECTION: u8 = 28;
pub const CMD_LOGOUT: u8 = 29;
pub const CMD_GET_CONTACT_BY_KEY: u8 = 30;
pub const CMD_GET_CHANNEL: u8 = 31;
pub const CMD_SET_CHANNEL: u8 = 32;
pub const CMD_SIGN_START: u8 = 33;
pub const CMD_SIGN_DATA: u8 = 34;
pub const CMD_SIGN_FINISH: u8 = 35;
pub const CMD_SEND_TRACE_PATH: u8 = 36;
pub const CMD_SET_DEVICE_PIN: u8 = 37;
pub const CMD_SET_OTHER_PARAMS: u8 = 38;
pub const CMD_SEND_TELEMETRY_REQ: u8 = 39;
pub const CMD_GET_CUSTOM_VARS: u8 = 40;
pub const CMD_SET_CUSTOM_VAR: u8 = 41;
pub const CMD_GET_ADVERT_PATH: u8 = 42;
pub const CMD_GET_TUNING_PARAMS: u8 = 43;
// 44..=49 are reserved for WiFi configuration.
pub const CMD_SEND_BINARY_REQ: u8 = 50;
pub const CMD_FACTORY_RESET: u8 = 51;
pub const CMD_SEND_PATH_DISCOVERY_REQ: u8 = 52;
pub const CMD_SET_FLOOD_SCOPE: u8 = 54;
pub const CMD_SEND_CONTROL_DATA: u8 = 55;
pub const CMD_GET_STATS: u8 = 56;

// ============================================================================
// Stats kinds (argument of CMD_GET_STATS, echoed in RESP_CODE_STATS)
// ============================================================================

pub const STATS_TYPE_CORE: u8 = 0;
pub const STATS_TYPE_RADIO: u8 = 1;
pub const STATS_TYPE_PACKETS: u8 = 2;

// ============================================================================
// Response codes (radio → host, solicited)
// ============================================================================

pub const RESP_CODE_OK: u8 = 0;
/// Followed by one `ERR_CODE_*` byte.
pub const RESP_CODE_ERR: u8 = 1;
pub const RESP_CODE_CONTACTS_START: u8 = 2;
pub const RESP_CODE_CONTACT: u8 = 3;
pub const RESP_CODE_END_OF_CONTACTS: u8 = 4;
pub const RESP_CODE_SELF_INFO: u8 = 5;
pub const RESP_CODE_SENT: u8 = 6;
/// Contact message, v1 layout (no SNR header).
pub const RESP_CODE_CONTACT_MSG_RECV: u8 = 7;
/// Channel message, v1 layout (no SNR header).
pub const RESP_CODE_CHANNEL_MSG_RECV: u8 = 8;
pub const RESP_CODE_CURR_TIME: u8 = 9;
/// Offline queue is empty.
pub const RESP_CODE_NO_MORE_MESSAGES: u8 = 10;
pub const RESP_CODE_EXPORT_CONTACT: u8 = 11;
pub const RESP_CODE_BATT_AND_STORAGE: u8 = 12;
pub const RESP_CODE_DEVICE_INFO: u8 = 13;
pub const RESP_CODE_PRIVATE_KEY: u8 = 14;
pub const RESP_CODE_DISABLED: u8 = 15;
/// Contact message, v3 layout (SNR + 2 reserved bytes first).
pub const RESP_CODE_CONTACT_MSG_RECV_V3: u8 = 16;
/// Channel message, v3 layout (SNR + 2 reserved bytes first).
pub const RESP_CODE_CHANNEL_MSG_RECV_V3: u8 = 17;
pub const RESP_CODE_CHANNEL_INFO: u8 = 18;
pub const RESP_CODE_SIGN_START: u8 = 19;
pub const RESP_CODE_SIGNATURE: u8 = 20;
pub const RESP_CODE_CUSTOM_VARS: u8 = 21;
pub const RESP_CODE_ADVERT_PATH: u8 = 22;
pub const RESP_CODE_TUNING_PARAMS: u8 = 23;
pub const RESP_CODE_STATS: u8 = 24;

// ============================================================================
// Push codes (radio → host, unsolicited)
// ============================================================================

/// Any code with this bit set is a push notification.
pub const PUSH_CODE_MASK: u8 = 0x80;

pub const PUSH_CODE_ADVERT: u8 = 0x80;
pub const PUSH_CODE_PATH_UPDATED: u8 = 0x81;
/// An ACK for a previously sent direct message arrived.
pub const PUSH_CODE_SEND_CONFIRMED: u8 = 0x82;
pub const PUSH_CODE_MSG_WAITING: u8 = 0x83;
pub const PUSH_CODE_RAW_DATA: u8 = 0x84;
pub const PUSH_CODE_LOGIN_SUCCESS: u8 = 0x85;
pub const PUSH_CODE_LOGIN_FAIL: u8 = 0x86;
pub const PUSH_CODE_STATUS_RESPONSE: u8 = 0x87;
pub const PUSH_CODE_LOG_RX_DATA: u8 = 0x88;
pub const PUSH_CODE_TRACE_DATA: u8 = 0x89;
pub const PUSH_CODE_NEW_ADVERT: u8 = 0x8A;
pub const PUSH_CODE_TELEMETRY_RESPONSE: u8 = 0x8B;
pub const PUSH_CODE_BINARY_RESPONSE: u8 = 0x8C;
pub const PUSH_CODE_PATH_DISCOVERY_RESPONSE: u8 = 0x8D;
pub const PUSH_CODE_CONTROL_DATA: u8 = 0x8E;

// ============================================================================
// Control data payload types
// ============================================================================

/// High nibble of a discover-response control payload; low nibble is the node type.
pub const CTL_TYPE_DISCOVER_RESP: u8 = 0x90;
/// Mask selecting the control payload kind.
pub const CTL_TYPE_MASK: u8 = 0xF0;
/// snr_in(1) + tag(4).
pub const DISCOVER_RESP_MIN_LEN: usize = 5;

// ============================================================================
// Error codes carried by RESP_CODE_ERR
// ============================================================================

pub const ERR_CODE_UNSUPPORTED_CMD: u8 = 1;
pub const ERR_CODE_NOT_FOUND: u8 = 2;
pub const ERR_CODE_TABLE_FULL: u8 = 3;
pub const ERR_CODE_BAD_STATE: u8 = 4;
pub const ERR_CODE_FILE_IO_ERROR: u8 = 5;
pub const ERR_CODE_ILLEGAL_ARG: u8 = 6;

// ============================================================================
// Text types
// ============================================================================

pub const TXT_TYPE_PLAIN: u8 = 0;
pub const TXT_TYPE_CLI_DATA: u8 = 1;
/// Text prefixed by 4 bytes of the original sender's key.
pub const TXT_TYPE_SIGNED_PLAIN: u8 = 2;

// ============================================================================
// Advertisement / node types
// ============================================================================

pub const ADV_TYPE_NONE: u8 = 0;
pub const ADV_TYPE_CHAT: u8 = 1;
pub const ADV_TYPE_REPEATER: u8 = 2;
pub const ADV_TYPE_ROOM_SERVER: u8 = 3;
pub const ADV_TYPE_SENSOR: u8 = 4;

// ============================================================================
// Sizes
// ============================================================================

pub const PUB_KEY_SIZE: usize = 32;
pub const PUB_KEY_PREFIX_SIZE: usize = 6;
pub const SIGNATURE_SIZE: usize = 64;
/// Exported identity (private key + public key).
pub const IDENTITY_SIZE: usize = 64;
pub const MAX_PATH_SIZE: usize = 64;
/// Fixed width of contact and channel name fields.
pub const NAME_FIELD_SIZE: usize = 32;
pub const CHANNEL_SECRET_SIZE: usize = 16;
/// Typical encoded command size; used as a buffer capacity hint only.
pub const MAX_FRAME_SIZE: usize = 256;

/// pubkey + type + flags + path_len + path + name + last_advert + lat + lon + lastmod.
pub const CONTACT_RECORD_SIZE: usize =
    PUB_KEY_SIZE + 3 + MAX_PATH_SIZE + NAME_FIELD_SIZE + 4 + 4 + 4 + 4;

/// fw_ver + max_contacts/2 + max_channels + ble_pin + build(12) + model(40) + version(20).
pub const DEVICE_INFO_V3_SIZE: usize = 3 + 4 + 12 + 40 + 20;
/// Firmware version byte at which DeviceInfo grew the extended layout.
pub const DEVICE_INFO_V3_MIN_VERSION: u8 = 3;

// ============================================================================
// Telemetry
// ============================================================================

pub const TELEM_MODE_DENY: u8 = 0;
pub const TELEM_MODE_ALLOW_FLAGS: u8 = 1;
pub const TELEM_MODE_ALLOW_ALL: u8 = 2;

pub const TELEM_PERM_BASE: u8 = 0x01;
pub const TELEM_PERM_LOCATION: u8 = 0x02;
pub const TELEM_PERM_ENVIRONMENT: u8 = 0x04;

pub const ADVERT_LOC_NONE: u8 = 0;
pub const ADVERT_LOC_SHARE: u8 = 1;

/// Flood path length marker used in message records.
pub const PATH_LEN_FLOOD: u8 = 0xFF;
