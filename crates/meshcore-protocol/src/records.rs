//! Field layouts of the multi-field records.
//!
//! Each `read_*` function takes the record body (the frame without its code
//! byte) and each `put_*` function appends the same layout to a buffer.

use bytes::BufMut;

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::*;
use crate::wire::{put_fixed_text, WireReader};

// ============================================================================
// Contact
// ============================================================================

pub(crate) fn read_contact(data: &[u8]) -> Result<ContactInfo, ProtocolError> {
    let mut r = WireReader::new(data);
    r.require(CONTACT_RECORD_SIZE)?;

    let public_key = PublicKey(r.array()?);
    let contact_type = r.u8()?;
    let flags = r.u8()?;
    let out_path_len = r.i8()?;
    let path_field = r.bytes(MAX_PATH_SIZE)?;
    let meaningful = usize::try_from(out_path_len).unwrap_or(0).min(MAX_PATH_SIZE);

    Ok(ContactInfo {
        public_key,
        contact_type,
        flags,
        out_path_len,
        out_path: path_field[..meaningful].to_vec(),
        name: r.fixed_text(NAME_FIELD_SIZE)?,
        last_advert_timestamp: r.u32()?,
        gps_lat: r.i32()?,
        gps_lon: r.i32()?,
        lastmod: r.u32()?,
    })
}

/// Writes the contact layout. `with_lastmod` is false for `AddUpdateContact`,
/// which lets the radio stamp the record with its own clock.
pub(crate) fn put_contact(buf: &mut Vec<u8>, contact: &ContactInfo, with_lastmod: bool) {
    buf.put_slice(contact.public_key.as_bytes());
    buf.put_u8(contact.contact_type);
    buf.put_u8(contact.flags);
    buf.put_i8(contact.out_path_len);
    let path_len = contact.out_path.len().min(MAX_PATH_SIZE);
    buf.put_slice(&contact.out_path[..path_len]);
    buf.put_bytes(0, MAX_PATH_SIZE - path_len);
    put_fixed_text(buf, &contact.name, NAME_FIELD_SIZE);
    buf.put_u32_le(contact.last_advert_timestamp);
    buf.put_i32_le(contact.gps_lat);
    buf.put_i32_le(contact.gps_lon);
    if with_lastmod {
        buf.put_u32_le(contact.lastmod);
    }
}

// ============================================================================
// Self / device info
// ============================================================================

pub(crate) fn read_self_info(data: &[u8]) -> Result<SelfInfo, ProtocolError> {
    let mut r = WireReader::new(data);
    // Everything before the trailing name is fixed.
    r.require(3 + PUB_KEY_SIZE + 8 + 4 + 8 + 2)?;

    Ok(SelfInfo {
        advert_type: r.u8()?,
        tx_power_dbm: r.u8()?,
        max_tx_power_dbm: r.u8()?,
        public_key: PublicKey(r.array()?),
        gps_lat: r.i32()?,
        gps_lon: r.i32()?,
        multi_acks: r.u8()?,
        advert_loc_policy: r.u8()?,
        telemetry_modes: TelemetryModes::from_packed(r.u8()?),
        manual_add_contacts: r.u8()? != 0,
        freq_khz: r.u32()?,
        bandwidth_hz: r.u32()?,
        spreading_factor: r.u8()?,
        coding_rate: r.u8()?,
        node_name: r.rest_text(),
    })
}

pub(crate) fn put_self_info(buf: &mut Vec<u8>, info: &SelfInfo) {
    buf.put_u8(info.advert_type);
    buf.put_u8(info.tx_power_dbm);
    buf.put_u8(info.max_tx_power_dbm);
    buf.put_slice(info.public_key.as_bytes());
    buf.put_i32_le(info.gps_lat);
    buf.put_i32_le(info.gps_lon);
    buf.put_u8(info.multi_acks);
    buf.put_u8(info.advert_loc_policy);
    buf.put_u8(info.telemetry_modes.packed());
    buf.put_u8(info.manual_add_contacts as u8);
    buf.put_u32_le(info.freq_khz);
    buf.put_u32_le(info.bandwidth_hz);
    buf.put_u8(info.spreading_factor);
    buf.put_u8(info.coding_rate);
    buf.put_slice(info.node_name.as_bytes());
}

pub(crate) fn read_device_info(data: &[u8]) -> Result<DeviceInfo, ProtocolError> {
    let mut r = WireReader::new(data);
    let firmware_version_code = r.u8()?;
    if firmware_version_code < DEVICE_INFO_V3_MIN_VERSION {
        return Ok(DeviceInfo::Legacy {
            firmware_version_code,
        });
    }

    r.require(DEVICE_INFO_V3_SIZE - 1)?;
    Ok(DeviceInfo::V3(DeviceInfoV3 {
        firmware_version_code,
        max_contacts_half: r.u8()?,
        max_group_channels: r.u8()?,
        ble_pin: r.u32()?,
        build_date: r.fixed_text(12)?,
        model: r.fixed_text(40)?,
        firmware_version: r.fixed_text(20)?,
    }))
}

pub(crate) fn put_device_info(buf: &mut Vec<u8>, info: &DeviceInfo) {
    match info {
        DeviceInfo::Legacy {
            firmware_version_code,
        } => buf.put_u8(*firmware_version_code),
        DeviceInfo::V3(info) => {
            buf.put_u8(info.firmware_version_code);
            buf.put_u8(info.max_contacts_half);
            buf.put_u8(info.max_group_channels);
            buf.put_u32_le(info.ble_pin);
            put_fixed_text(buf, &info.build_date, 12);
            put_fixed_text(buf, &info.model, 40);
            put_fixed_text(buf, &info.firmware_version, 20);
        }
    }
}

pub(crate) fn read_channel_info(data: &[u8]) -> Result<ChannelInfo, ProtocolError> {
    let mut r = WireReader::new(data);
    r.require(1 + NAME_FIELD_SIZE + CHANNEL_SECRET_SIZE)?;
    Ok(ChannelInfo {
        index: r.u8()?,
        name: r.fixed_text(NAME_FIELD_SIZE)?,
        secret: r.array()?,
    })
}

pub(crate) fn put_channel_info(buf: &mut Vec<u8>, channel: &ChannelInfo) {
    buf.put_u8(channel.index);
    put_fixed_text(buf, &channel.name, NAME_FIELD_SIZE);
    buf.put_slice(&channel.secret);
}

// ============================================================================
// Messages
// ============================================================================

/// Layout revision of a received message record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLayout {
    /// No signal header.
    V1,
    /// `snr(i8) + reserved(2)` before the v1 fields.
    V3,
}

fn read_snr_header(r: &mut WireReader<'_>, layout: MessageLayout) -> Result<Option<i8>, ProtocolError> {
    match layout {
        MessageLayout::V1 => Ok(None),
        MessageLayout::V3 => {
            let snr = r.i8()?;
            r.skip(2)?;
            Ok(Some(snr))
        }
    }
}

fn put_snr_header(buf: &mut Vec<u8>, snr_x4: Option<i8>, layout: MessageLayout) {
    if layout == MessageLayout::V3 {
        buf.put_i8(snr_x4.unwrap_or(0));
        buf.put_bytes(0, 2);
    }
}

pub(crate) fn read_contact_message(
    data: &[u8],
    layout: MessageLayout,
) -> Result<ContactMessage, ProtocolError> {
    let mut r = WireReader::new(data);
    let header = match layout {
        MessageLayout::V1 => 12,
        MessageLayout::V3 => 15,
    };
    r.require(header)?;

    let snr_x4 = read_snr_header(&mut r, layout)?;
    let sender_prefix = PublicKeyPrefix(r.array()?);
    let path_len = r.u8()?;
    let text_type = TextType::from(r.u8()?);
    let sender_timestamp = r.u32()?;

    let signer = if text_type == TextType::SignedPlain && r.remaining() >= 4 {
        Some(r.array()?)
    } else {
        None
    };

    Ok(ContactMessage {
        sender_prefix,
        path_len,
        text_type,
        sender_timestamp,
        snr_x4,
        signer,
        text: String::from_utf8_lossy(r.rest()).into_owned(),
    })
}

pub(crate) fn put_contact_message(buf: &mut Vec<u8>, msg: &ContactMessage, layout: MessageLayout) {
    put_snr_header(buf, msg.snr_x4, layout);
    buf.put_slice(msg.sender_prefix.as_bytes());
    buf.put_u8(msg.path_len);
    buf.put_u8(msg.text_type.into());
    buf.put_u32_le(msg.sender_timestamp);
    if let Some(signer) = &msg.signer {
        buf.put_slice(signer);
    }
    buf.put_slice(msg.text.as_bytes());
}

pub(crate) fn read_channel_message(
    data: &[u8],
    layout: MessageLayout,
) -> Result<ChannelMessage, ProtocolError> {
    let mut r = WireReader::new(data);
    let header = match layout {
        MessageLayout::V1 => 7,
        MessageLayout::V3 => 10,
    };
    r.require(header)?;

    Ok(ChannelMessage {
        snr_x4: read_snr_header(&mut r, layout)?,
        channel_idx: r.u8()?,
        path_len: r.u8()?,
        text_type: TextType::from(r.u8()?),
        sender_timestamp: r.u32()?,
        text: String::from_utf8_lossy(r.rest()).into_owned(),
    })
}

pub(crate) fn put_channel_message(buf: &mut Vec<u8>, msg: &ChannelMessage, layout: MessageLayout) {
    put_snr_header(buf, msg.snr_x4, layout);
    buf.put_u8(msg.channel_idx);
    buf.put_u8(msg.path_len);
    buf.put_u8(msg.text_type.into());
    buf.put_u32_le(msg.sender_timestamp);
    buf.put_slice(msg.text.as_bytes());
}

// ============================================================================
// Stats
// ============================================================================

pub(crate) fn read_core_stats(r: &mut WireReader<'_>) -> Result<CoreStats, ProtocolError> {
    r.require(9)?;
    Ok(CoreStats {
        battery_mv: r.u16()?,
        uptime_secs: r.u32()?,
        error_count: r.u16()?,
        queue_len: r.u8()?,
    })
}

pub(crate) fn read_radio_stats(r: &mut WireReader<'_>) -> Result<RadioStats, ProtocolError> {
    r.require(12)?;
    Ok(RadioStats {
        noise_floor: r.i16()?,
        last_rssi: r.i8()?,
        last_snr_x4: r.i8()?,
        tx_air_secs: r.u32()?,
        rx_air_secs: r.u32()?,
    })
}

pub(crate) fn read_packet_stats(r: &mut WireReader<'_>) -> Result<PacketStats, ProtocolError> {
    r.require(24)?;
    Ok(PacketStats {
        recv: r.u32()?,
        sent: r.u32()?,
        sent_flood: r.u32()?,
        sent_direct: r.u32()?,
        recv_flood: r.u32()?,
        recv_direct: r.u32()?,
    })
}

pub(crate) fn read_repeater_status(data: &[u8]) -> Result<RepeaterStatus, ProtocolError> {
    let mut r = WireReader::new(data);
    r.require(RepeaterStatus::MIN_SIZE)?;
    Ok(RepeaterStatus {
        battery_mv: r.u16()?,
        tx_queue_len: r.u16()?,
        noise_floor: r.i16()?,
        last_rssi: r.i16()?,
        packets_recv: r.u32()?,
        packets_sent: r.u32()?,
        airtime_secs: r.u32()?,
        uptime_secs: r.u32()?,
        sent_flood: r.u32()?,
        sent_direct: r.u32()?,
        recv_flood: r.u32()?,
        recv_direct: r.u32()?,
        full_events: r.u16()?,
        last_snr_x4: r.i16()?,
        direct_dups: r.u16()?,
        flood_dups: r.u16()?,
        rx_airtime_secs: r.u32().ok(),
    })
}

pub(crate) fn put_repeater_status(buf: &mut Vec<u8>, status: &RepeaterStatus) {
    buf.put_u16_le(status.battery_mv);
    buf.put_u16_le(status.tx_queue_len);
    buf.put_i16_le(status.noise_floor);
    buf.put_i16_le(status.last_rssi);
    buf.put_u32_le(status.packets_recv);
    buf.put_u32_le(status.packets_sent);
    buf.put_u32_le(status.airtime_secs);
    buf.put_u32_le(status.uptime_secs);
    buf.put_u32_le(status.sent_flood);
    buf.put_u32_le(status.sent_direct);
    buf.put_u32_le(status.recv_flood);
    buf.put_u32_le(status.recv_direct);
    buf.put_u16_le(status.full_events);
    buf.put_i16_le(status.last_snr_x4);
    buf.put_u16_le(status.direct_dups);
    buf.put_u16_le(status.flood_dups);
    if let Some(rx_airtime) = status.rx_airtime_secs {
        buf.put_u32_le(rx_airtime);
    }
}

// ============================================================================
// Telemetry, control data, paths
// ============================================================================

/// Push layout: `reserved(1) + prefix(6) + data`.
pub(crate) fn read_pushed_telemetry(data: &[u8]) -> Result<TelemetryResponse, ProtocolError> {
    let mut r = WireReader::new(data);
    r.require(1 + PUB_KEY_PREFIX_SIZE)?;
    r.skip(1)?;
    Ok(TelemetryResponse {
        responder_prefix: PublicKeyPrefix(r.array()?),
        tag: None,
        data: r.rest().to_vec(),
    })
}

/// Polled layout: `prefix(6) + tag(4) + data`.
pub(crate) fn read_polled_telemetry(data: &[u8]) -> Result<TelemetryResponse, ProtocolError> {
    let mut r = WireReader::new(data);
    r.require(PUB_KEY_PREFIX_SIZE + 4)?;
    Ok(TelemetryResponse {
        responder_prefix: PublicKeyPrefix(r.array()?),
        tag: Some(r.u32()?),
        data: r.rest().to_vec(),
    })
}

/// Decodes the part of a control data frame after `snr + rssi + path_len`.
pub(crate) fn read_control_payload(r: &mut WireReader<'_>) -> Result<ControlPayload, ProtocolError> {
    let payload_type = r.u8()?;
    let payload = r.rest();

    if payload_type & CTL_TYPE_MASK == CTL_TYPE_DISCOVER_RESP && payload.len() >= DISCOVER_RESP_MIN_LEN {
        let mut inner = WireReader::new(payload);
        return Ok(ControlPayload::Discover(DiscoverResponse {
            node_type: payload_type & 0x0F,
            snr_in_x4: inner.i8()?,
            tag: inner.u32()?,
            public_key: inner.rest().to_vec(),
        }));
    }

    Ok(ControlPayload::Other {
        payload_type,
        payload: payload.to_vec(),
    })
}

pub(crate) fn put_control_payload(buf: &mut Vec<u8>, payload: &ControlPayload) {
    buf.put_u8(payload.payload_type());
    match payload {
        ControlPayload::Discover(resp) => {
            buf.put_i8(resp.snr_in_x4);
            buf.put_u32_le(resp.tag);
            buf.put_slice(&resp.public_key);
        }
        ControlPayload::Other { payload, .. } => buf.put_slice(payload),
    }
}

/// A length byte followed by that many path bytes.
pub(crate) fn read_path(r: &mut WireReader<'_>) -> Result<Vec<u8>, ProtocolError> {
    let len = r.u8()? as usize;
    Ok(r.bytes(len)?.to_vec())
}

pub(crate) fn put_path(buf: &mut Vec<u8>, path: &[u8]) {
    buf.put_u8(path.len() as u8);
    buf.put_slice(path);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_contact() -> ContactInfo {
        ContactInfo {
            public_key: PublicKey([0x11; PUB_KEY_SIZE]),
            contact_type: ADV_TYPE_REPEATER,
            flags: 0x01,
            out_path_len: 2,
            out_path: vec![0xA1, 0xB2],
            name: "Hilltop".to_string(),
            last_advert_timestamp: 1_700_000_000,
            gps_lat: 47_606_200,
            gps_lon: -122_332_100,
            lastmod: 1_700_000_100,
        }
    }

    #[test]
    fn test_contact_layout_is_147_bytes() {
        let mut buf = Vec::new();
        put_contact(&mut buf, &sample_contact(), true);
        assert_eq!(buf.len(), CONTACT_RECORD_SIZE);
        assert_eq!(CONTACT_RECORD_SIZE, 147);
        // path_len then the two meaningful path bytes
        assert_eq!(&buf[34..37], &[2, 0xA1, 0xB2]);
        // name field begins after the 64-byte path
        assert_eq!(&buf[99..106], b"Hilltop");

        let decoded = read_contact(&buf).unwrap();
        assert_eq!(decoded, sample_contact());
    }

    #[test]
    fn test_contact_flood_path_is_empty() {
        let mut contact = sample_contact();
        contact.out_path_len = -1;
        contact.out_path.clear();
        let mut buf = Vec::new();
        put_contact(&mut buf, &contact, true);
        assert_eq!(buf[34], 0xFF);

        let decoded = read_contact(&buf).unwrap();
        assert_eq!(decoded.out_path_len, -1);
        assert!(decoded.out_path.is_empty());
        assert!(!decoded.has_direct_path());
    }

    #[test]
    fn test_contact_truncated_fails() {
        let mut buf = Vec::new();
        put_contact(&mut buf, &sample_contact(), false);
        assert_eq!(
            read_contact(&buf),
            Err(ProtocolError::too_short(CONTACT_RECORD_SIZE, CONTACT_RECORD_SIZE - 4))
        );
    }

    #[test]
    fn test_device_info_legacy_and_v3() {
        assert_eq!(
            read_device_info(&[2]).unwrap(),
            DeviceInfo::Legacy {
                firmware_version_code: 2
            }
        );

        let mut data = vec![8, 175, 40];
        data.extend_from_slice(&123456u32.to_le_bytes());
        put_fixed_text(&mut data, "12 Jan 2025", 12);
        put_fixed_text(&mut data, "Heltec V3", 40);
        put_fixed_text(&mut data, "v1.11.0", 20);
        assert_eq!(data.len(), DEVICE_INFO_V3_SIZE);

        match read_device_info(&data).unwrap() {
            DeviceInfo::V3(info) => {
                assert_eq!(info.max_contacts(), 350);
                assert_eq!(info.max_group_channels, 40);
                assert_eq!(info.ble_pin, 123456);
                assert_eq!(info.build_date, "12 Jan 2025");
                assert_eq!(info.model, "Heltec V3");
                assert_eq!(info.firmware_version, "v1.11.0");
            }
            other => panic!("expected v3 device info, got {:?}", other),
        }

        // v3 firmware byte with a short body is a failure, not a legacy record
        assert!(read_device_info(&data[..40]).is_err());
    }

    #[test]
    fn test_repeater_status_optional_tail() {
        let status = RepeaterStatus {
            battery_mv: 4100,
            noise_floor: -110,
            last_snr_x4: 22,
            uptime_secs: 3600,
            ..Default::default()
        };
        let mut buf = Vec::new();
        put_repeater_status(&mut buf, &status);
        assert_eq!(buf.len(), RepeaterStatus::MIN_SIZE);
        let decoded = read_repeater_status(&buf).unwrap();
        assert_eq!(decoded, status);
        assert_eq!(decoded.last_snr(), 5.5);

        buf.extend_from_slice(&77u32.to_le_bytes());
        assert_eq!(read_repeater_status(&buf).unwrap().rx_airtime_secs, Some(77));
    }

    #[test]
    fn test_path_length_overrun_fails() {
        let data = [3u8, 0xAA, 0xBB];
        let mut r = WireReader::new(&data);
        assert_eq!(read_path(&mut r), Err(ProtocolError::too_short(4, 3)));
    }
}
