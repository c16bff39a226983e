//! Property-based tests for the wire codec

use bytes::{Bytes, BytesMut};
use proptest::prelude::*;

use crate::header::{PfcpHeader, PfcpMessageType};
use crate::ie::RawIe;
use crate::message::{build_message, parse_message, HeartbeatRequest, PfcpMessage};

fn arb_message_type() -> impl Strategy<Value = PfcpMessageType> {
    prop_oneof![
        Just(PfcpMessageType::HeartbeatRequest),
        Just(PfcpMessageType::HeartbeatResponse),
        Just(PfcpMessageType::AssociationSetupRequest),
        Just(PfcpMessageType::AssociationSetupResponse),
        Just(PfcpMessageType::SessionEstablishmentRequest),
        Just(PfcpMessageType::SessionDeletionResponse),
    ]
}

proptest! {
    #[test]
    fn header_round_trips(
        message_type in arb_message_type(),
        seq in 0u32..0x0100_0000,
        seid in proptest::option::of(any::<u64>()),
    ) {
        let mut header = match seid {
            Some(seid) => PfcpHeader::new_with_seid(message_type, seid, seq),
            None => PfcpHeader::new(message_type, seq),
        };
        header.length = header.length_for_body(0);

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        prop_assert_eq!(buf.len(), header.header_len());

        let mut bytes = buf.freeze();
        let decoded = PfcpHeader::decode(&mut bytes).unwrap();
        prop_assert_eq!(decoded, header);
    }

    #[test]
    fn raw_ie_round_trips(ie_type in any::<u16>(), data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let ie = RawIe { ie_type, data: Bytes::from(data) };
        let mut buf = BytesMut::new();
        ie.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = RawIe::decode(&mut bytes).unwrap();
        prop_assert_eq!(decoded, ie);
        prop_assert!(bytes.is_empty());
    }

    #[test]
    fn heartbeat_round_trips(ts in any::<u32>(), seq in 0u32..0x0100_0000) {
        let message = PfcpMessage::HeartbeatRequest(HeartbeatRequest::new(ts));
        let buf = build_message(&message, seq, None);
        let mut bytes = buf.freeze();
        let (header, parsed) = parse_message(&mut bytes).unwrap();
        prop_assert_eq!(header.sequence_number, seq);
        prop_assert_eq!(parsed, message);
    }

    #[test]
    fn parse_never_panics_on_garbage(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let mut bytes = Bytes::from(data);
        let _ = parse_message(&mut bytes);
    }
}
