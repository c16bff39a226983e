//! PFCP message structures and the build/parse entry points
//!
//! One struct per message, a `PfcpMessage` enum over all of them, and the
//! free functions `build_message` / `parse_message` that add and strip the
//! PFCP header. Session requests carry their rule IEs pre-encoded
//! (`RawIe`): whether a rule is included at all, and whether it takes the
//! create or the update form, is the caller's decision.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{PfcpError, PfcpResult};
use crate::header::{PfcpHeader, PfcpMessageType};
use crate::ie::{decode_u32_payload, encode_u32_ie, IeHeader, IeType, RawIe};
use crate::types::{FSeid, NodeId, PdnType, PfcpCause};

/// Whether an IE type code is one of the grouped rule IEs
pub fn is_rule_ie(ie_type: u16) -> bool {
    ie_type == IeType::CreatePdr as u16
        || ie_type == IeType::CreateFar as u16
        || ie_type == IeType::CreateQer as u16
        || ie_type == IeType::CreateUrr as u16
        || ie_type == IeType::UpdatePdr as u16
        || ie_type == IeType::UpdateFar as u16
        || ie_type == IeType::UpdateQer as u16
        || ie_type == IeType::UpdateUrr as u16
}

// ============================================================================
// Node-related messages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatRequest {
    pub recovery_time_stamp: u32,
}

impl HeartbeatRequest {
    pub fn new(recovery_time_stamp: u32) -> Self {
        Self { recovery_time_stamp }
    }

    pub fn encode_body(&self, buf: &mut BytesMut) {
        encode_u32_ie(buf, IeType::RecoveryTimeStamp, self.recovery_time_stamp);
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut recovery_time_stamp = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::RecoveryTimeStamp) {
                recovery_time_stamp = Some(decode_u32_payload(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            recovery_time_stamp: recovery_time_stamp
                .ok_or(PfcpError::MissingMandatoryIe("Recovery Time Stamp"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatResponse {
    pub recovery_time_stamp: u32,
}

impl HeartbeatResponse {
    pub fn new(recovery_time_stamp: u32) -> Self {
        Self { recovery_time_stamp }
    }

    pub fn encode_body(&self, buf: &mut BytesMut) {
        encode_u32_ie(buf, IeType::RecoveryTimeStamp, self.recovery_time_stamp);
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut recovery_time_stamp = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::RecoveryTimeStamp) {
                recovery_time_stamp = Some(decode_u32_payload(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            recovery_time_stamp: recovery_time_stamp
                .ok_or(PfcpError::MissingMandatoryIe("Recovery Time Stamp"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSetupRequest {
    pub node_id: NodeId,
    pub recovery_time_stamp: u32,
}

impl AssociationSetupRequest {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.node_id.encode(buf);
        encode_u32_ie(buf, IeType::RecoveryTimeStamp, self.recovery_time_stamp);
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut node_id = None;
        let mut recovery_time_stamp = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::NodeId) {
                node_id = Some(NodeId::decode(&ie.data)?);
            } else if ie.is_type(IeType::RecoveryTimeStamp) {
                recovery_time_stamp = Some(decode_u32_payload(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            node_id: node_id.ok_or(PfcpError::MissingMandatoryIe("Node ID"))?,
            recovery_time_stamp: recovery_time_stamp
                .ok_or(PfcpError::MissingMandatoryIe("Recovery Time Stamp"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationSetupResponse {
    pub node_id: NodeId,
    pub cause: PfcpCause,
    pub recovery_time_stamp: Option<u32>,
}

impl AssociationSetupResponse {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.node_id.encode(buf);
        self.cause.encode(buf);
        if let Some(ts) = self.recovery_time_stamp {
            encode_u32_ie(buf, IeType::RecoveryTimeStamp, ts);
        }
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut node_id = None;
        let mut cause = None;
        let mut recovery_time_stamp = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::NodeId) {
                node_id = Some(NodeId::decode(&ie.data)?);
            } else if ie.is_type(IeType::Cause) {
                cause = Some(PfcpCause::decode(&ie.data)?);
            } else if ie.is_type(IeType::RecoveryTimeStamp) {
                recovery_time_stamp = Some(decode_u32_payload(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            node_id: node_id.ok_or(PfcpError::MissingMandatoryIe("Node ID"))?,
            cause: cause.ok_or(PfcpError::MissingMandatoryIe("Cause"))?,
            recovery_time_stamp,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationReleaseRequest {
    pub node_id: NodeId,
}

impl AssociationReleaseRequest {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.node_id.encode(buf);
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut node_id = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::NodeId) {
                node_id = Some(NodeId::decode(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            node_id: node_id.ok_or(PfcpError::MissingMandatoryIe("Node ID"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationReleaseResponse {
    pub node_id: NodeId,
    pub cause: PfcpCause,
}

impl AssociationReleaseResponse {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.node_id.encode(buf);
        self.cause.encode(buf);
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut node_id = None;
        let mut cause = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::NodeId) {
                node_id = Some(NodeId::decode(&ie.data)?);
            } else if ie.is_type(IeType::Cause) {
                cause = Some(PfcpCause::decode(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            node_id: node_id.ok_or(PfcpError::MissingMandatoryIe("Node ID"))?,
            cause: cause.ok_or(PfcpError::MissingMandatoryIe("Cause"))?,
        })
    }
}

// ============================================================================
// Session-related messages
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEstablishmentRequest {
    pub node_id: NodeId,
    pub f_seid: FSeid,
    pub pdn_type: PdnType,
    /// Create-form rule IEs, in the order they should appear on the wire
    pub rules: Vec<RawIe>,
}

impl SessionEstablishmentRequest {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.node_id.encode(buf);
        self.f_seid.encode(buf);
        self.pdn_type.encode(buf);
        for rule in &self.rules {
            rule.encode(buf);
        }
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut node_id = None;
        let mut f_seid = None;
        let mut pdn_type = None;
        let mut rules = Vec::new();
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::NodeId) {
                node_id = Some(NodeId::decode(&ie.data)?);
            } else if ie.is_type(IeType::FSeid) {
                f_seid = Some(FSeid::decode(&ie.data)?);
            } else if ie.is_type(IeType::PdnType) {
                let value = *ie.data.first().ok_or(PfcpError::MalformedIe("PDN Type"))?;
                pdn_type = Some(match value {
                    1 => PdnType::Ipv4,
                    2 => PdnType::Ipv6,
                    3 => PdnType::Ipv4v6,
                    4 => PdnType::NonIp,
                    _ => return Err(PfcpError::MalformedIe("PDN Type")),
                });
            } else if is_rule_ie(ie.ie_type) {
                rules.push(ie.clone());
            }
            Ok(())
        })?;
        Ok(Self {
            node_id: node_id.ok_or(PfcpError::MissingMandatoryIe("Node ID"))?,
            f_seid: f_seid.ok_or(PfcpError::MissingMandatoryIe("F-SEID"))?,
            pdn_type: pdn_type.ok_or(PfcpError::MissingMandatoryIe("PDN Type"))?,
            rules,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEstablishmentResponse {
    pub cause: PfcpCause,
    /// The UPF's F-SEID for the session, when accepted
    pub f_seid: Option<FSeid>,
}

impl SessionEstablishmentResponse {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.cause.encode(buf);
        if let Some(f_seid) = &self.f_seid {
            f_seid.encode(buf);
        }
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut cause = None;
        let mut f_seid = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::Cause) {
                cause = Some(PfcpCause::decode(&ie.data)?);
            } else if ie.is_type(IeType::FSeid) {
                f_seid = Some(FSeid::decode(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            cause: cause.ok_or(PfcpError::MissingMandatoryIe("Cause"))?,
            f_seid,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionModificationRequest {
    pub f_seid: FSeid,
    /// Rule IEs in create or update form, caller's choice
    pub rules: Vec<RawIe>,
}

impl SessionModificationRequest {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.f_seid.encode(buf);
        for rule in &self.rules {
            rule.encode(buf);
        }
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut f_seid = None;
        let mut rules = Vec::new();
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::FSeid) {
                f_seid = Some(FSeid::decode(&ie.data)?);
            } else if is_rule_ie(ie.ie_type) {
                rules.push(ie.clone());
            }
            Ok(())
        })?;
        Ok(Self {
            f_seid: f_seid.ok_or(PfcpError::MissingMandatoryIe("F-SEID"))?,
            rules,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionModificationResponse {
    pub cause: PfcpCause,
}

impl SessionModificationResponse {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.cause.encode(buf);
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut cause = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::Cause) {
                cause = Some(PfcpCause::decode(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            cause: cause.ok_or(PfcpError::MissingMandatoryIe("Cause"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDeletionRequest {
    pub f_seid: FSeid,
}

impl SessionDeletionRequest {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.f_seid.encode(buf);
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut f_seid = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::FSeid) {
                f_seid = Some(FSeid::decode(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            f_seid: f_seid.ok_or(PfcpError::MissingMandatoryIe("F-SEID"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDeletionResponse {
    pub cause: PfcpCause,
}

impl SessionDeletionResponse {
    pub fn encode_body(&self, buf: &mut BytesMut) {
        self.cause.encode(buf);
    }

    pub fn decode_body(buf: &mut Bytes) -> PfcpResult<Self> {
        let mut cause = None;
        for_each_ie(buf, |ie| {
            if ie.is_type(IeType::Cause) {
                cause = Some(PfcpCause::decode(&ie.data)?);
            }
            Ok(())
        })?;
        Ok(Self {
            cause: cause.ok_or(PfcpError::MissingMandatoryIe("Cause"))?,
        })
    }
}

// ============================================================================
// Message enum and build/parse
// ============================================================================

/// Any PFCP message this codec can carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PfcpMessage {
    HeartbeatRequest(HeartbeatRequest),
    HeartbeatResponse(HeartbeatResponse),
    AssociationSetupRequest(AssociationSetupRequest),
    AssociationSetupResponse(AssociationSetupResponse),
    AssociationReleaseRequest(AssociationReleaseRequest),
    AssociationReleaseResponse(AssociationReleaseResponse),
    SessionEstablishmentRequest(SessionEstablishmentRequest),
    SessionEstablishmentResponse(SessionEstablishmentResponse),
    SessionModificationRequest(SessionModificationRequest),
    SessionModificationResponse(SessionModificationResponse),
    SessionDeletionRequest(SessionDeletionRequest),
    SessionDeletionResponse(SessionDeletionResponse),
}

impl PfcpMessage {
    pub fn message_type(&self) -> PfcpMessageType {
        match self {
            Self::HeartbeatRequest(_) => PfcpMessageType::HeartbeatRequest,
            Self::HeartbeatResponse(_) => PfcpMessageType::HeartbeatResponse,
            Self::AssociationSetupRequest(_) => PfcpMessageType::AssociationSetupRequest,
            Self::AssociationSetupResponse(_) => PfcpMessageType::AssociationSetupResponse,
            Self::AssociationReleaseRequest(_) => PfcpMessageType::AssociationReleaseRequest,
            Self::AssociationReleaseResponse(_) => PfcpMessageType::AssociationReleaseResponse,
            Self::SessionEstablishmentRequest(_) => PfcpMessageType::SessionEstablishmentRequest,
            Self::SessionEstablishmentResponse(_) => PfcpMessageType::SessionEstablishmentResponse,
            Self::SessionModificationRequest(_) => PfcpMessageType::SessionModificationRequest,
            Self::SessionModificationResponse(_) => PfcpMessageType::SessionModificationResponse,
            Self::SessionDeletionRequest(_) => PfcpMessageType::SessionDeletionRequest,
            Self::SessionDeletionResponse(_) => PfcpMessageType::SessionDeletionResponse,
        }
    }

    pub fn encode_body(&self, buf: &mut BytesMut) {
        match self {
            Self::HeartbeatRequest(m) => m.encode_body(buf),
            Self::HeartbeatResponse(m) => m.encode_body(buf),
            Self::AssociationSetupRequest(m) => m.encode_body(buf),
            Self::AssociationSetupResponse(m) => m.encode_body(buf),
            Self::AssociationReleaseRequest(m) => m.encode_body(buf),
            Self::AssociationReleaseResponse(m) => m.encode_body(buf),
            Self::SessionEstablishmentRequest(m) => m.encode_body(buf),
            Self::SessionEstablishmentResponse(m) => m.encode_body(buf),
            Self::SessionModificationRequest(m) => m.encode_body(buf),
            Self::SessionModificationResponse(m) => m.encode_body(buf),
            Self::SessionDeletionRequest(m) => m.encode_body(buf),
            Self::SessionDeletionResponse(m) => m.encode_body(buf),
        }
    }

    pub fn decode_body(message_type: PfcpMessageType, buf: &mut Bytes) -> PfcpResult<Self> {
        Ok(match message_type {
            PfcpMessageType::HeartbeatRequest => {
                Self::HeartbeatRequest(HeartbeatRequest::decode_body(buf)?)
            }
            PfcpMessageType::HeartbeatResponse => {
                Self::HeartbeatResponse(HeartbeatResponse::decode_body(buf)?)
            }
            PfcpMessageType::AssociationSetupRequest => {
                Self::AssociationSetupRequest(AssociationSetupRequest::decode_body(buf)?)
            }
            PfcpMessageType::AssociationSetupResponse => {
                Self::AssociationSetupResponse(AssociationSetupResponse::decode_body(buf)?)
            }
            PfcpMessageType::AssociationReleaseRequest => {
                Self::AssociationReleaseRequest(AssociationReleaseRequest::decode_body(buf)?)
            }
            PfcpMessageType::AssociationReleaseResponse => {
                Self::AssociationReleaseResponse(AssociationReleaseResponse::decode_body(buf)?)
            }
            PfcpMessageType::SessionEstablishmentRequest => {
                Self::SessionEstablishmentRequest(SessionEstablishmentRequest::decode_body(buf)?)
            }
            PfcpMessageType::SessionEstablishmentResponse => {
                Self::SessionEstablishmentResponse(SessionEstablishmentResponse::decode_body(buf)?)
            }
            PfcpMessageType::SessionModificationRequest => {
                Self::SessionModificationRequest(SessionModificationRequest::decode_body(buf)?)
            }
            PfcpMessageType::SessionModificationResponse => {
                Self::SessionModificationResponse(SessionModificationResponse::decode_body(buf)?)
            }
            PfcpMessageType::SessionDeletionRequest => {
                Self::SessionDeletionRequest(SessionDeletionRequest::decode_body(buf)?)
            }
            PfcpMessageType::SessionDeletionResponse => {
                Self::SessionDeletionResponse(SessionDeletionResponse::decode_body(buf)?)
            }
        })
    }
}

/// Iterate the IEs of a message body, skipping types the caller ignores
fn for_each_ie<F>(buf: &mut Bytes, mut f: F) -> PfcpResult<()>
where
    F: FnMut(&RawIe) -> PfcpResult<()>,
{
    while buf.remaining() >= IeHeader::LEN {
        let ie = RawIe::decode(buf)?;
        f(&ie)?;
    }
    Ok(())
}

/// Encode a complete PFCP datagram: header (with the length field filled in)
/// followed by the message body
pub fn build_message(message: &PfcpMessage, sequence_number: u32, seid: Option<u64>) -> BytesMut {
    let mut body = BytesMut::new();
    message.encode_body(&mut body);

    let mut header = match seid {
        Some(seid) => PfcpHeader::new_with_seid(message.message_type(), seid, sequence_number),
        None => PfcpHeader::new(message.message_type(), sequence_number),
    };
    header.length = header.length_for_body(body.len());

    let mut buf = BytesMut::with_capacity(header.header_len() + body.len());
    header.encode(&mut buf);
    buf.extend_from_slice(&body);
    buf
}

/// Parse a complete PFCP datagram into its header and message
pub fn parse_message(buf: &mut Bytes) -> PfcpResult<(PfcpHeader, PfcpMessage)> {
    let header = PfcpHeader::decode(buf)?;
    let message = PfcpMessage::decode_body(header.message_type, buf)?;
    Ok((header, message))
}
