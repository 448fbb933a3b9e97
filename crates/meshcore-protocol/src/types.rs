//! Typed records carried by commands, responses and push notifications.

use std::fmt;

use crate::constants::*;

/// A 32-byte Ed25519 public key identifying a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKey(pub [u8; PUB_KEY_SIZE]);

impl PublicKey {
    pub fn new(bytes: [u8; PUB_KEY_SIZE]) -> Self {
        PublicKey(bytes)
    }

    /// Returns `None` unless `slice` is exactly 32 bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; PUB_KEY_SIZE]>::try_from(slice).ok().map(PublicKey)
    }

    /// The 6-byte prefix that messages use to address this key.
    pub fn prefix(&self) -> PublicKeyPrefix {
        PublicKeyPrefix::from(self)
    }

    pub fn as_bytes(&self) -> &[u8; PUB_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// First six bytes of a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PublicKeyPrefix(pub [u8; PUB_KEY_PREFIX_SIZE]);

impl PublicKeyPrefix {
    pub fn new(bytes: [u8; PUB_KEY_PREFIX_SIZE]) -> Self {
        PublicKeyPrefix(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUB_KEY_PREFIX_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether `key` starts with this prefix.
    pub fn matches(&self, key: &PublicKey) -> bool {
        key.0.starts_with(&self.0)
    }
}

impl From<&PublicKey> for PublicKeyPrefix {
    fn from(key: &PublicKey) -> Self {
        let mut prefix = [0u8; PUB_KEY_PREFIX_SIZE];
        prefix.copy_from_slice(&key.0[..PUB_KEY_PREFIX_SIZE]);
        PublicKeyPrefix(prefix)
    }
}

impl fmt::Display for PublicKeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A contact record as stored by the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInfo {
    pub public_key: PublicKey,
    /// One of the `ADV_TYPE_*` values.
    pub contact_type: u8,
    pub flags: u8,
    /// Outbound path length; negative means no known path (flood).
    pub out_path_len: i8,
    /// The meaningful `out_path_len` bytes of the 64-byte path field.
    pub out_path: Vec<u8>,
    pub name: String,
    pub last_advert_timestamp: u32,
    /// Micro-degrees.
    pub gps_lat: i32,
    /// Micro-degrees.
    pub gps_lon: i32,
    /// When the radio last changed this record; drives incremental sync.
    pub lastmod: u32,
}

impl Default for ContactInfo {
    fn default() -> Self {
        ContactInfo {
            public_key: PublicKey::default(),
            contact_type: ADV_TYPE_CHAT,
            flags: 0,
            out_path_len: -1,
            out_path: Vec::new(),
            name: String::new(),
            last_advert_timestamp: 0,
            gps_lat: 0,
            gps_lon: 0,
            lastmod: 0,
        }
    }
}

impl ContactInfo {
    pub fn latitude(&self) -> f64 {
        micro_degrees(self.gps_lat)
    }

    pub fn longitude(&self) -> f64 {
        micro_degrees(self.gps_lon)
    }

    pub fn has_direct_path(&self) -> bool {
        self.out_path_len >= 0
    }
}

/// A group channel slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelInfo {
    pub index: u8,
    pub name: String,
    /// 128-bit channel secret.
    pub secret: [u8; CHANNEL_SECRET_SIZE],
}

/// Telemetry sharing policy, packed into one byte on the wire.
///
/// Bits 0-1 hold the base mode, bits 2-3 location, bits 4-5 environment;
/// each is one of the `TELEM_MODE_*` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryModes {
    pub base: u8,
    pub location: u8,
    pub environment: u8,
}

impl TelemetryModes {
    pub fn from_packed(byte: u8) -> Self {
        TelemetryModes {
            base: byte & 0x03,
            location: (byte >> 2) & 0x03,
            environment: (byte >> 4) & 0x03,
        }
    }

    pub fn packed(&self) -> u8 {
        (self.base & 0x03) | ((self.location & 0x03) << 2) | ((self.environment & 0x03) << 4)
    }
}

/// The radio's own identity and configuration (reply to `AppStart`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelfInfo {
    pub advert_type: u8,
    pub tx_power_dbm: u8,
    pub max_tx_power_dbm: u8,
    pub public_key: PublicKey,
    pub gps_lat: i32,
    pub gps_lon: i32,
    pub multi_acks: u8,
    pub advert_loc_policy: u8,
    pub telemetry_modes: TelemetryModes,
    pub manual_add_contacts: bool,
    /// Carried in kHz.
    pub freq_khz: u32,
    /// Carried in Hz.
    pub bandwidth_hz: u32,
    pub spreading_factor: u8,
    pub coding_rate: u8,
    pub node_name: String,
}

impl SelfInfo {
    pub fn latitude(&self) -> f64 {
        micro_degrees(self.gps_lat)
    }

    pub fn longitude(&self) -> f64 {
        micro_degrees(self.gps_lon)
    }

    pub fn frequency_mhz(&self) -> f64 {
        self.freq_khz as f64 / 1000.0
    }

    pub fn bandwidth_khz(&self) -> f64 {
        self.bandwidth_hz as f64 / 1000.0
    }
}

/// Reply to `DeviceQuery`. The layout depends on the firmware version byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInfo {
    /// Firmware older than v3 only reports its version code.
    Legacy { firmware_version_code: u8 },
    V3(DeviceInfoV3),
}

impl DeviceInfo {
    pub fn firmware_version_code(&self) -> u8 {
        match self {
            DeviceInfo::Legacy {
                firmware_version_code,
            } => *firmware_version_code,
            DeviceInfo::V3(info) => info.firmware_version_code,
        }
    }
}

/// Extended device description sent by v3+ firmware.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfoV3 {
    pub firmware_version_code: u8,
    /// Wire value is half the real table size.
    pub max_contacts_half: u8,
    pub max_group_channels: u8,
    pub ble_pin: u32,
    pub build_date: String,
    pub model: String,
    pub firmware_version: String,
}

impl DeviceInfoV3 {
    pub fn max_contacts(&self) -> usize {
        self.max_contacts_half as usize * 2
    }
}

/// LoRa modem settings as `CMD_SET_RADIO_PARAMS` carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioParams {
    pub freq_khz: u32,
    pub bandwidth_hz: u32,
    pub spreading_factor: u8,
    pub coding_rate: u8,
}

impl Default for RadioParams {
    fn default() -> Self {
        RadioParams {
            freq_khz: 910_525,
            bandwidth_hz: 62_500,
            spreading_factor: 7,
            coding_rate: 5,
        }
    }
}

/// Receive-delay and airtime tuning, both scaled by 1000 on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TuningParams {
    pub rx_delay_base: u32,
    pub airtime_factor: u32,
}

impl TuningParams {
    /// Receive delay base in milliseconds.
    pub fn rx_delay_base_ms(&self) -> f32 {
        self.rx_delay_base as f32 / 1000.0
    }

    pub fn airtime_factor_f32(&self) -> f32 {
        self.airtime_factor as f32 / 1000.0
    }
}

/// Battery voltage plus, on newer firmware, filesystem usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatteryAndStorage {
    pub battery_millivolts: u16,
    pub storage: Option<StorageInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageInfo {
    pub used_kb: u32,
    pub total_kb: u32,
}

impl BatteryAndStorage {
    pub fn battery_volts(&self) -> f32 {
        self.battery_millivolts as f32 / 1000.0
    }
}

/// Message text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    Plain,
    CliData,
    SignedPlain,
    Unknown(u8),
}

impl From<u8> for TextType {
    fn from(value: u8) -> Self {
        match value {
            TXT_TYPE_PLAIN => TextType::Plain,
            TXT_TYPE_CLI_DATA => TextType::CliData,
            TXT_TYPE_SIGNED_PLAIN => TextType::SignedPlain,
            other => TextType::Unknown(other),
        }
    }
}

impl From<TextType> for u8 {
    fn from(value: TextType) -> Self {
        match value {
            TextType::Plain => TXT_TYPE_PLAIN,
            TextType::CliData => TXT_TYPE_CLI_DATA,
            TextType::SignedPlain => TXT_TYPE_SIGNED_PLAIN,
            TextType::Unknown(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreStats {
    pub battery_mv: u16,
    pub uptime_secs: u32,
    pub error_count: u16,
    pub queue_len: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioStats {
    pub noise_floor: i16,
    pub last_rssi: i8,
    pub last_snr_x4: i8,
    pub tx_air_secs: u32,
    pub rx_air_secs: u32,
}

impl RadioStats {
    pub fn last_snr(&self) -> f32 {
        snr_db(self.last_snr_x4)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketStats {
    pub recv: u32,
    pub sent: u32,
    pub sent_flood: u32,
    pub sent_direct: u32,
    pub recv_flood: u32,
    pub recv_direct: u32,
}

/// Status block returned by a repeater or room server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepeaterStatus {
    pub battery_mv: u16,
    pub tx_queue_len: u16,
    pub noise_floor: i16,
    pub last_rssi: i16,
    pub packets_recv: u32,
    pub packets_sent: u32,
    pub airtime_secs: u32,
    pub uptime_secs: u32,
    pub sent_flood: u32,
    pub sent_direct: u32,
    pub recv_flood: u32,
    pub recv_direct: u32,
    pub full_events: u16,
    pub last_snr_x4: i16,
    pub direct_dups: u16,
    pub flood_dups: u16,
    /// Only reported by newer firmware.
    pub rx_airtime_secs: Option<u32>,
}

impl RepeaterStatus {
    /// Length of the block up to and including `flood_dups`.
    pub const MIN_SIZE: usize = 48;

    pub fn last_snr(&self) -> f32 {
        self.last_snr_x4 as f32 / 4.0
    }
}

/// A direct message pulled from the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
    pub sender_prefix: PublicKeyPrefix,
    /// `PATH_LEN_FLOOD` for flood-routed messages.
    pub path_len: u8,
    pub text_type: TextType,
    pub sender_timestamp: u32,
    /// Present in the v3 layout only.
    pub snr_x4: Option<i8>,
    /// Leading key bytes of the original author, for signed text.
    pub signer: Option<[u8; 4]>,
    pub text: String,
}

impl ContactMessage {
    pub fn snr(&self) -> Option<f32> {
        self.snr_x4.map(snr_db)
    }

    pub fn is_flood(&self) -> bool {
        self.path_len == PATH_LEN_FLOOD
    }
}

/// A group channel message pulled from the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub channel_idx: u8,
    pub path_len: u8,
    pub text_type: TextType,
    pub sender_timestamp: u32,
    pub snr_x4: Option<i8>,
    pub text: String,
}

impl ChannelMessage {
    pub fn snr(&self) -> Option<f32> {
        self.snr_x4.map(snr_db)
    }

    pub fn is_flood(&self) -> bool {
        self.path_len == PATH_LEN_FLOOD
    }
}

/// Telemetry returned by a remote node.
///
/// Push notifications carry no tag; replies to a binary telemetry request do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryResponse {
    pub responder_prefix: PublicKeyPrefix,
    pub tag: Option<u32>,
    /// Cayenne LPP encoded readings, passed through untouched.
    pub data: Vec<u8>,
}

/// Node discovery reply embedded in a control data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverResponse {
    /// Low nibble of the payload type (an `ADV_TYPE_*` value).
    pub node_type: u8,
    /// SNR of our discover request as heard by the responder.
    pub snr_in_x4: i8,
    pub tag: u32,
    /// Either an 8-byte prefix or the full 32-byte key.
    pub public_key: Vec<u8>,
}

impl DiscoverResponse {
    pub fn snr_in(&self) -> f32 {
        snr_db(self.snr_in_x4)
    }
}

/// Payload of a `PUSH_CODE_CONTROL_DATA` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlPayload {
    Discover(DiscoverResponse),
    /// Any other payload type, or a discover response too short to decode.
    Other { payload_type: u8, payload: Vec<u8> },
}

impl ControlPayload {
    pub fn payload_type(&self) -> u8 {
        match self {
            ControlPayload::Discover(resp) => CTL_TYPE_DISCOVER_RESP | (resp.node_type & 0x0F),
            ControlPayload::Other { payload_type, .. } => *payload_type,
        }
    }
}

/// Convert an SNR byte scaled by 4 into dB.
pub fn snr_db(snr_x4: i8) -> f32 {
    snr_x4 as f32 / 4.0
}

fn micro_degrees(value: i32) -> f64 {
    value as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matches_key() {
        let mut bytes = [0u8; PUB_KEY_SIZE];
        bytes[..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        let key = PublicKey::new(bytes);
        let prefix = key.prefix();
        assert_eq!(prefix.as_bytes(), &[1, 2, 3, 4, 5, 6]);
        assert!(prefix.matches(&key));
        assert_eq!(prefix.to_hex(), "010203040506");
        assert!(PublicKey::from_slice(&bytes[..31]).is_none());
    }

    #[test]
    fn test_telemetry_modes_packing() {
        let modes = TelemetryModes::from_packed(0b0010_0110);
        assert_eq!(modes.base, TELEM_MODE_ALLOW_ALL);
        assert_eq!(modes.location, TELEM_MODE_ALLOW_FLAGS);
        assert_eq!(modes.environment, TELEM_MODE_ALLOW_ALL);
        assert_eq!(modes.packed(), 0b0010_0110);
    }

    #[test]
    fn test_scaled_accessors() {
        let info = SelfInfo {
            gps_lat: 47_606_200,
            gps_lon: -122_332_100,
            freq_khz: 910_525,
            bandwidth_hz: 62_500,
            ..Default::default()
        };
        assert!((info.latitude() - 47.6062).abs() < 1e-9);
        assert!((info.longitude() + 122.3321).abs() < 1e-9);
        assert!((info.frequency_mhz() - 910.525).abs() < 1e-9);
        assert!((info.bandwidth_khz() - 62.5).abs() < 1e-9);
        assert_eq!(snr_db(0x28), 10.0);
        assert_eq!(snr_db(-6), -1.5);
    }
}
