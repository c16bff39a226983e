//! Information Element TLV scaffolding
//!
//! Every PFCP IE is a type/length header followed by a payload. This module
//! provides the generic header, a raw (undissected) IE representation used
//! when scanning message bodies, and small helpers for the fixed-width
//! payloads that make up most of the protocol.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{PfcpError, PfcpResult};

/// IE type codes used by this codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum IeType {
    CreatePdr = 1,
    Pdi = 2,
    CreateFar = 3,
    ForwardingParameters = 4,
    CreateUrr = 6,
    CreateQer = 7,
    UpdatePdr = 9,
    UpdateFar = 10,
    UpdateForwardingParameters = 11,
    UpdateUrr = 13,
    UpdateQer = 14,
    Cause = 19,
    SourceInterface = 20,
    FTeid = 21,
    NetworkInstance = 22,
    SdfFilter = 23,
    GateStatus = 25,
    Mbr = 26,
    Gbr = 27,
    Precedence = 29,
    VolumeThreshold = 31,
    ReportingTriggers = 37,
    DestinationInterface = 42,
    ApplyAction = 44,
    PdrId = 56,
    FSeid = 57,
    NodeId = 60,
    MeasurementMethod = 62,
    VolumeQuota = 73,
    UrrId = 81,
    OuterHeaderCreation = 84,
    UeIpAddress = 93,
    OuterHeaderRemoval = 95,
    RecoveryTimeStamp = 96,
    FarId = 108,
    QerId = 109,
    PdnType = 113,
    UserPlaneIpResourceInformation = 116,
}

/// Generic IE header: 2 octets of type, 2 octets of payload length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IeHeader {
    pub ie_type: u16,
    pub length: u16,
}

impl IeHeader {
    pub const LEN: usize = 4;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.ie_type);
        buf.put_u16(self.length);
    }

    pub fn decode(buf: &mut Bytes) -> PfcpResult<Self> {
        if buf.remaining() < Self::LEN {
            return Err(PfcpError::BufferTooShort {
                needed: Self::LEN,
                available: buf.remaining(),
            });
        }
        Ok(Self {
            ie_type: buf.get_u16(),
            length: buf.get_u16(),
        })
    }
}

/// An IE whose payload has not been dissected
///
/// Message bodies are scanned as a sequence of these; IEs the codec does not
/// understand are skipped rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIe {
    pub ie_type: u16,
    pub data: Bytes,
}

impl RawIe {
    pub fn new(ie_type: IeType, data: Bytes) -> Self {
        Self {
            ie_type: ie_type as u16,
            data,
        }
    }

    /// Total encoded size including the IE header
    pub fn encoded_len(&self) -> usize {
        IeHeader::LEN + self.data.len()
    }

    pub fn is_type(&self, ie_type: IeType) -> bool {
        self.ie_type == ie_type as u16
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        IeHeader {
            ie_type: self.ie_type,
            length: self.data.len() as u16,
        }
        .encode(buf);
        buf.put_slice(&self.data);
    }

    pub fn decode(buf: &mut Bytes) -> PfcpResult<Self> {
        let header = IeHeader::decode(buf)?;
        let length = header.length as usize;
        if buf.remaining() < length {
            return Err(PfcpError::BufferTooShort {
                needed: length,
                available: buf.remaining(),
            });
        }
        let data = buf.copy_to_bytes(length);
        Ok(Self {
            ie_type: header.ie_type,
            data,
        })
    }
}

pub fn encode_u8_ie(buf: &mut BytesMut, ie_type: IeType, value: u8) {
    IeHeader {
        ie_type: ie_type as u16,
        length: 1,
    }
    .encode(buf);
    buf.put_u8(value);
}

pub fn encode_u16_ie(buf: &mut BytesMut, ie_type: IeType, value: u16) {
    IeHeader {
        ie_type: ie_type as u16,
        length: 2,
    }
    .encode(buf);
    buf.put_u16(value);
}

pub fn encode_u32_ie(buf: &mut BytesMut, ie_type: IeType, value: u32) {
    IeHeader {
        ie_type: ie_type as u16,
        length: 4,
    }
    .encode(buf);
    buf.put_u32(value);
}

pub fn encode_u64_ie(buf: &mut BytesMut, ie_type: IeType, value: u64) {
    IeHeader {
        ie_type: ie_type as u16,
        length: 8,
    }
    .encode(buf);
    buf.put_u64(value);
}

pub fn encode_bytes_ie(buf: &mut BytesMut, ie_type: IeType, value: &[u8]) {
    IeHeader {
        ie_type: ie_type as u16,
        length: value.len() as u16,
    }
    .encode(buf);
    buf.put_slice(value);
}

/// Decode helpers for fixed-width IE payloads

pub fn decode_u32_payload(data: &Bytes) -> PfcpResult<u32> {
    if data.len() < 4 {
        return Err(PfcpError::BufferTooShort {
            needed: 4,
            available: data.len(),
        });
    }
    let mut data = data.clone();
    Ok(data.get_u32())
}
