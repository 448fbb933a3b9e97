//! End-to-end decoding of a captured-style device byte stream.

use meshcore_protocol::*;

/// Build the bytes a radio would write for a sequence of responses.
fn device_stream(messages: &[Message]) -> Vec<u8> {
    let framer = StreamFramer::device();
    let mut wire = Vec::new();
    for message in messages {
        wire.extend_from_slice(&framer.wrap(&message.encode()).unwrap());
    }
    wire
}

fn sample_contact(name: &str, lastmod: u32) -> ContactInfo {
    ContactInfo {
        public_key: PublicKey([lastmod as u8; PUB_KEY_SIZE]),
        contact_type: ADV_TYPE_CHAT,
        out_path_len: 2,
        out_path: vec![0x11, 0x22],
        name: name.to_string(),
        last_advert_timestamp: lastmod - 10,
        gps_lat: 47_606_200,
        gps_lon: -122_332_100,
        lastmod,
        ..Default::default()
    }
}

#[test]
fn test_contact_exchange_survives_odd_chunking() {
    let expected = vec![
        Message::Response(Response::ContactsStart { total_count: 2 }),
        Message::Response(Response::Contact(sample_contact("Alice", 100))),
        Message::Push(PushNotification::MessageWaiting),
        Message::Response(Response::Contact(sample_contact("Bob", 200))),
        Message::Response(Response::EndOfContacts {
            most_recent_lastmod: 200,
        }),
    ];
    let wire = device_stream(&expected);

    let mut framer = StreamFramer::host();
    let mut decoded = Vec::new();
    // Chunk sizes that land inside delimiters, lengths and payloads.
    for chunk in wire.chunks(7) {
        for frame in framer.ingest(chunk) {
            decoded.push(Message::parse(&frame));
        }
    }

    assert_eq!(decoded, expected);
    assert_eq!(framer.buffered_len(), 0);
}

#[test]
fn test_bad_frame_does_not_poison_following_frames() {
    let framer = StreamFramer::device();
    let mut wire = framer.wrap(&[RESP_CODE_SENT, 1, 2]).unwrap().to_vec();
    wire.extend_from_slice(&framer.wrap(&Response::Ok.encode()).unwrap());

    let mut host = StreamFramer::host();
    let messages: Vec<Message> = host.ingest(&wire).iter().map(|f| Message::parse(f)).collect();

    assert_eq!(messages.len(), 2);
    match &messages[0] {
        Message::ParseFailure { raw, reason } => {
            assert_eq!(&raw[..], &[RESP_CODE_SENT, 1, 2]);
            assert!(matches!(reason, ProtocolError::FrameTooShort { .. }));
        }
        other => panic!("expected parse failure, got {:?}", other),
    }
    assert_eq!(messages[1], Message::Response(Response::Ok));
}

#[test]
fn test_device_info_versions() {
    let legacy = Response::decode(&[RESP_CODE_DEVICE_INFO, 2]).unwrap();
    assert_eq!(
        legacy,
        Response::DeviceInfo(DeviceInfo::Legacy {
            firmware_version_code: 2
        })
    );

    let v3 = Response::DeviceInfo(DeviceInfo::V3(DeviceInfoV3 {
        firmware_version_code: 8,
        max_contacts_half: 175,
        max_group_channels: 40,
        ble_pin: 123_456,
        build_date: "12 Oct 2026".to_string(),
        model: "Heltec V3".to_string(),
        firmware_version: "v1.9.1".to_string(),
    }));
    let bytes = v3.encode();
    assert_eq!(bytes.len(), 1 + DEVICE_INFO_V3_SIZE);
    match Response::decode(&bytes).unwrap() {
        Response::DeviceInfo(DeviceInfo::V3(info)) => {
            assert_eq!(info.max_contacts(), 350);
            assert_eq!(info.model, "Heltec V3");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_command_wrapped_for_stream() {
    let framer = StreamFramer::host();
    let wire = framer
        .wrap(
            &Command::AppStart {
                app_version: 3,
                app_name: "mccli".to_string(),
            }
            .encode(),
        )
        .unwrap();
    assert_eq!(wire[0], FRAME_DELIM_OUTBOUND);
    assert_eq!(u16::from_le_bytes([wire[1], wire[2]]), 1 + 1 + 6 + 5);
    assert_eq!(wire[3], CMD_APP_START);
    assert_eq!(&wire[11..], b"mccli");
}
