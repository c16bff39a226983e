//! PFCP message header encoding and decoding
//!
//! The PFCP header (TS 29.244 clause 7.2.2) is 8 octets for node-related
//! messages and 16 octets when the S flag is set and a SEID is present.
//! The sequence number occupies 3 octets in both forms.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{PfcpError, PfcpResult};

/// PFCP protocol version carried in every header
pub const PFCP_VERSION: u8 = 1;

/// Header length without a SEID
pub const PFCP_HEADER_LEN: usize = 8;

/// Header length with a SEID
pub const PFCP_HEADER_LEN_WITH_SEID: usize = 16;

/// PFCP message types used on the Sxb/N4 interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PfcpMessageType {
    HeartbeatRequest = 1,
    HeartbeatResponse = 2,
    AssociationSetupRequest = 5,
    AssociationSetupResponse = 6,
    AssociationReleaseRequest = 9,
    AssociationReleaseResponse = 10,
    SessionEstablishmentRequest = 50,
    SessionEstablishmentResponse = 51,
    SessionModificationRequest = 52,
    SessionModificationResponse = 53,
    SessionDeletionRequest = 54,
    SessionDeletionResponse = 55,
}

impl PfcpMessageType {
    /// Whether messages of this type carry a SEID in the header
    pub fn has_seid(&self) -> bool {
        matches!(
            self,
            Self::SessionEstablishmentRequest
                | Self::SessionEstablishmentResponse
                | Self::SessionModificationRequest
                | Self::SessionModificationResponse
                | Self::SessionDeletionRequest
                | Self::SessionDeletionResponse
        )
    }

    /// Human-readable message type name
    pub fn name(&self) -> &'static str {
        match self {
            Self::HeartbeatRequest => "Heartbeat Request",
            Self::HeartbeatResponse => "Heartbeat Response",
            Self::AssociationSetupRequest => "Association Setup Request",
            Self::AssociationSetupResponse => "Association Setup Response",
            Self::AssociationReleaseRequest => "Association Release Request",
            Self::AssociationReleaseResponse => "Association Release Response",
            Self::SessionEstablishmentRequest => "Session Establishment Request",
            Self::SessionEstablishmentResponse => "Session Establishment Response",
            Self::SessionModificationRequest => "Session Modification Request",
            Self::SessionModificationResponse => "Session Modification Response",
            Self::SessionDeletionRequest => "Session Deletion Request",
            Self::SessionDeletionResponse => "Session Deletion Response",
        }
    }
}

impl TryFrom<u8> for PfcpMessageType {
    type Error = PfcpError;

    fn try_from(value: u8) -> PfcpResult<Self> {
        match value {
            1 => Ok(Self::HeartbeatRequest),
            2 => Ok(Self::HeartbeatResponse),
            5 => Ok(Self::AssociationSetupRequest),
            6 => Ok(Self::AssociationSetupResponse),
            9 => Ok(Self::AssociationReleaseRequest),
            10 => Ok(Self::AssociationReleaseResponse),
            50 => Ok(Self::SessionEstablishmentRequest),
            51 => Ok(Self::SessionEstablishmentResponse),
            52 => Ok(Self::SessionModificationRequest),
            53 => Ok(Self::SessionModificationResponse),
            54 => Ok(Self::SessionDeletionRequest),
            55 => Ok(Self::SessionDeletionResponse),
            other => Err(PfcpError::InvalidMessageType(other)),
        }
    }
}

/// PFCP message header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfcpHeader {
    pub version: u8,
    pub message_type: PfcpMessageType,
    /// Length of everything following the first 4 octets
    pub length: u16,
    /// Present iff the S flag is set
    pub seid: Option<u64>,
    /// 24-bit sequence number
    pub sequence_number: u32,
}

impl PfcpHeader {
    /// Header for a node-related message (no SEID)
    pub fn new(message_type: PfcpMessageType, sequence_number: u32) -> Self {
        Self {
            version: PFCP_VERSION,
            message_type,
            length: 0,
            seid: None,
            sequence_number,
        }
    }

    /// Header for a session-related message
    pub fn new_with_seid(message_type: PfcpMessageType, seid: u64, sequence_number: u32) -> Self {
        Self {
            version: PFCP_VERSION,
            message_type,
            length: 0,
            seid: Some(seid),
            sequence_number,
        }
    }

    /// Encoded header length for this header's form
    pub fn header_len(&self) -> usize {
        if self.seid.is_some() {
            PFCP_HEADER_LEN_WITH_SEID
        } else {
            PFCP_HEADER_LEN
        }
    }

    /// The header `length` field for a body of `body_len` octets
    pub fn length_for_body(&self, body_len: usize) -> u16 {
        let tail = self.header_len() - 4;
        (body_len + tail) as u16
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let s_flag = u8::from(self.seid.is_some());
        buf.put_u8(((self.version & 0x07) << 5) | s_flag);
        buf.put_u8(self.message_type as u8);
        buf.put_u16(self.length);
        if let Some(seid) = self.seid {
            buf.put_u64(seid);
        }
        let seq = self.sequence_number.to_be_bytes();
        buf.put_slice(&seq[1..4]);
        buf.put_u8(0); // spare
    }

    pub fn decode(buf: &mut Bytes) -> PfcpResult<Self> {
        if buf.remaining() < PFCP_HEADER_LEN {
            return Err(PfcpError::BufferTooShort {
                needed: PFCP_HEADER_LEN,
                available: buf.remaining(),
            });
        }
        let flags = buf.get_u8();
        let version = flags >> 5;
        if version != PFCP_VERSION {
            return Err(PfcpError::VersionNotSupported(version));
        }
        let s_flag = flags & 0x01 != 0;
        let message_type = PfcpMessageType::try_from(buf.get_u8())?;
        let length = buf.get_u16();
        let seid = if s_flag {
            if buf.remaining() < 8 + 4 {
                return Err(PfcpError::BufferTooShort {
                    needed: 12,
                    available: buf.remaining(),
                });
            }
            Some(buf.get_u64())
        } else {
            None
        };
        let mut seq_bytes = [0u8; 4];
        buf.copy_to_slice(&mut seq_bytes[1..4]);
        let sequence_number = u32::from_be_bytes(seq_bytes);
        let _spare = buf.get_u8();
        Ok(Self {
            version,
            message_type,
            length,
            seid,
            sequence_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_header_round_trip() {
        let mut header = PfcpHeader::new(PfcpMessageType::HeartbeatRequest, 42);
        header.length = header.length_for_body(8);

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), PFCP_HEADER_LEN);

        let mut bytes = buf.freeze();
        let decoded = PfcpHeader::decode(&mut bytes).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.seid, None);
        assert_eq!(decoded.length, 8 + 4);
    }

    #[test]
    fn session_header_round_trip() {
        let mut header =
            PfcpHeader::new_with_seid(PfcpMessageType::SessionEstablishmentRequest, 0xDEAD_BEEF, 7);
        header.length = header.length_for_body(0);

        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(buf.len(), PFCP_HEADER_LEN_WITH_SEID);

        let mut bytes = buf.freeze();
        let decoded = PfcpHeader::decode(&mut bytes).unwrap();
        assert_eq!(decoded.seid, Some(0xDEAD_BEEF));
        assert_eq!(decoded.sequence_number, 7);
        assert_eq!(decoded.length, 12);
    }

    #[test]
    fn sequence_number_is_24_bit() {
        let header = PfcpHeader::new(PfcpMessageType::HeartbeatRequest, 0x00FF_FFFF);
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        let mut bytes = buf.freeze();
        let decoded = PfcpHeader::decode(&mut bytes).unwrap();
        assert_eq!(decoded.sequence_number, 0x00FF_FFFF);
    }

    #[test]
    fn rejects_unknown_version() {
        let mut raw = BytesMut::new();
        raw.put_u8(2 << 5);
        raw.put_u8(1);
        raw.put_u16(4);
        raw.put_slice(&[0, 0, 1, 0]);
        let mut bytes = raw.freeze();
        assert_eq!(
            PfcpHeader::decode(&mut bytes),
            Err(PfcpError::VersionNotSupported(2))
        );
    }

    #[test]
    fn rejects_unknown_message_type() {
        let mut raw = BytesMut::new();
        raw.put_u8(1 << 5);
        raw.put_u8(99);
        raw.put_u16(4);
        raw.put_slice(&[0, 0, 1, 0]);
        let mut bytes = raw.freeze();
        assert_eq!(
            PfcpHeader::decode(&mut bytes),
            Err(PfcpError::InvalidMessageType(99))
        );
    }
}
