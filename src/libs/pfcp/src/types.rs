//! PFCP IE payload types
//!
//! Typed payloads for the IEs this codec speaks, plus the grouped rule
//! structures (PDR/FAR/QER/URR). Rules encode a canonical inner body that is
//! independent of the create/update wrapper, so callers can compare rule
//! content across resubmissions.

use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{PfcpError, PfcpResult};
use crate::ie::{
    encode_bytes_ie, encode_u16_ie, encode_u32_ie, encode_u8_ie, IeHeader, IeType, RawIe,
};

/// Standard PFCP UDP port
pub const PFCP_UDP_PORT: u16 = 8805;

// ============================================================================
// Cause
// ============================================================================

/// PFCP cause values (TS 29.244 8.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PfcpCause {
    RequestAccepted = 1,
    RequestRejected = 64,
    SessionContextNotFound = 65,
    MandatoryIeMissing = 66,
    ConditionalIeMissing = 67,
    InvalidLength = 68,
    NoEstablishedPfcpAssociation = 72,
    NoResourcesAvailable = 73,
    SystemFailure = 76,
}

impl PfcpCause {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::RequestAccepted)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestAccepted => "Request accepted",
            Self::RequestRejected => "Request rejected",
            Self::SessionContextNotFound => "Session context not found",
            Self::MandatoryIeMissing => "Mandatory IE missing",
            Self::ConditionalIeMissing => "Conditional IE missing",
            Self::InvalidLength => "Invalid length",
            Self::NoEstablishedPfcpAssociation => "No established PFCP association",
            Self::NoResourcesAvailable => "No resources available",
            Self::SystemFailure => "System failure",
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        encode_u8_ie(buf, IeType::Cause, *self as u8);
    }

    pub fn decode(data: &Bytes) -> PfcpResult<Self> {
        let value = *data.first().ok_or(PfcpError::MalformedIe("Cause"))?;
        Self::try_from(value)
    }
}

impl TryFrom<u8> for PfcpCause {
    type Error = PfcpError;

    fn try_from(value: u8) -> PfcpResult<Self> {
        match value {
            1 => Ok(Self::RequestAccepted),
            64 => Ok(Self::RequestRejected),
            65 => Ok(Self::SessionContextNotFound),
            66 => Ok(Self::MandatoryIeMissing),
            67 => Ok(Self::ConditionalIeMissing),
            68 => Ok(Self::InvalidLength),
            72 => Ok(Self::NoEstablishedPfcpAssociation),
            73 => Ok(Self::NoResourcesAvailable),
            76 => Ok(Self::SystemFailure),
            other => Err(PfcpError::InvalidCause(other)),
        }
    }
}

// ============================================================================
// Interfaces
// ============================================================================

/// Source Interface values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SourceInterface {
    Access = 0,
    Core = 1,
    SgiLan = 2,
    CpFunction = 3,
}

impl TryFrom<u8> for SourceInterface {
    type Error = PfcpError;

    fn try_from(value: u8) -> PfcpResult<Self> {
        match value {
            0 => Ok(Self::Access),
            1 => Ok(Self::Core),
            2 => Ok(Self::SgiLan),
            3 => Ok(Self::CpFunction),
            other => Err(PfcpError::InvalidInterfaceValue(other)),
        }
    }
}

/// Destination Interface values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DestinationInterface {
    Access = 0,
    Core = 1,
    SgiLan = 2,
    CpFunction = 3,
}

impl TryFrom<u8> for DestinationInterface {
    type Error = PfcpError;

    fn try_from(value: u8) -> PfcpResult<Self> {
        match value {
            0 => Ok(Self::Access),
            1 => Ok(Self::Core),
            2 => Ok(Self::SgiLan),
            3 => Ok(Self::CpFunction),
            other => Err(PfcpError::InvalidInterfaceValue(other)),
        }
    }
}

// ============================================================================
// Node ID
// ============================================================================

/// Node ID (IPv4 or FQDN form)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeId {
    Ipv4(Ipv4Addr),
    Fqdn(String),
}

impl NodeId {
    pub fn new_ipv4(addr: Ipv4Addr) -> Self {
        Self::Ipv4(addr)
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut payload = BytesMut::new();
        match self {
            Self::Ipv4(addr) => {
                payload.put_u8(0);
                payload.put_slice(&addr.octets());
            }
            Self::Fqdn(name) => {
                payload.put_u8(2);
                payload.put_slice(name.as_bytes());
            }
        }
        encode_bytes_ie(buf, IeType::NodeId, &payload);
    }

    pub fn decode(data: &Bytes) -> PfcpResult<Self> {
        let mut data = data.clone();
        if data.remaining() < 1 {
            return Err(PfcpError::MalformedIe("NodeId"));
        }
        match data.get_u8() {
            0 => {
                if data.remaining() < 4 {
                    return Err(PfcpError::MalformedIe("NodeId"));
                }
                let mut octets = [0u8; 4];
                data.copy_to_slice(&mut octets);
                Ok(Self::Ipv4(Ipv4Addr::from(octets)))
            }
            2 => Ok(Self::Fqdn(
                String::from_utf8_lossy(&data.copy_to_bytes(data.remaining())).into_owned(),
            )),
            _ => Err(PfcpError::MalformedIe("NodeId")),
        }
    }
}

// ============================================================================
// F-SEID / F-TEID / UE IP Address
// ============================================================================

/// Fully qualified SEID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FSeid {
    pub seid: u64,
    pub ipv4: Option<Ipv4Addr>,
}

impl FSeid {
    const FLAG_V6: u8 = 0x01;
    const FLAG_V4: u8 = 0x02;

    pub fn new_ipv4(seid: u64, addr: Ipv4Addr) -> Self {
        Self {
            seid,
            ipv4: Some(addr),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut payload = BytesMut::new();
        let mut flags = 0u8;
        if self.ipv4.is_some() {
            flags |= Self::FLAG_V4;
        }
        payload.put_u8(flags);
        payload.put_u64(self.seid);
        if let Some(addr) = self.ipv4 {
            payload.put_slice(&addr.octets());
        }
        encode_bytes_ie(buf, IeType::FSeid, &payload);
    }

    pub fn decode(data: &Bytes) -> PfcpResult<Self> {
        let mut data = data.clone();
        if data.remaining() < 9 {
            return Err(PfcpError::MalformedIe("F-SEID"));
        }
        let flags = data.get_u8();
        let seid = data.get_u64();
        let ipv4 = if flags & Self::FLAG_V4 != 0 {
            if data.remaining() < 4 {
                return Err(PfcpError::MalformedIe("F-SEID"));
            }
            let mut octets = [0u8; 4];
            data.copy_to_slice(&mut octets);
            Some(Ipv4Addr::from(octets))
        } else {
            None
        };
        Ok(Self { seid, ipv4 })
    }
}

/// Fully qualified TEID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FTeid {
    pub teid: u32,
    pub ipv4: Option<Ipv4Addr>,
}

impl FTeid {
    const FLAG_V4: u8 = 0x01;

    pub fn new_ipv4(teid: u32, addr: Ipv4Addr) -> Self {
        Self {
            teid,
            ipv4: Some(addr),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut payload = BytesMut::new();
        let mut flags = 0u8;
        if self.ipv4.is_some() {
            flags |= Self::FLAG_V4;
        }
        payload.put_u8(flags);
        payload.put_u32(self.teid);
        if let Some(addr) = self.ipv4 {
            payload.put_slice(&addr.octets());
        }
        encode_bytes_ie(buf, IeType::FTeid, &payload);
    }
}

/// UE IP Address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UeIpAddress {
    pub ipv4: Ipv4Addr,
    /// S/D flag: set when the address refers to the destination side
    pub is_destination: bool,
}

impl UeIpAddress {
    const FLAG_V4: u8 = 0x02;
    const FLAG_SD: u8 = 0x04;

    pub fn new_ipv4(addr: Ipv4Addr) -> Self {
        Self {
            ipv4: addr,
            is_destination: false,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut payload = BytesMut::new();
        let mut flags = Self::FLAG_V4;
        if self.is_destination {
            flags |= Self::FLAG_SD;
        }
        payload.put_u8(flags);
        payload.put_slice(&self.ipv4.octets());
        encode_bytes_ie(buf, IeType::UeIpAddress, &payload);
    }
}

// ============================================================================
// Packet detection helpers
// ============================================================================

/// SDF Filter, flow description form only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdfFilter {
    pub flow_description: String,
}

impl SdfFilter {
    const FLAG_FD: u8 = 0x01;

    pub fn new(flow_description: &str) -> Self {
        Self {
            flow_description: flow_description.to_string(),
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut payload = BytesMut::new();
        payload.put_u8(Self::FLAG_FD);
        payload.put_u8(0); // spare
        payload.put_u16(self.flow_description.len() as u16);
        payload.put_slice(self.flow_description.as_bytes());
        encode_bytes_ie(buf, IeType::SdfFilter, &payload);
    }
}

/// Outer Header Removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OuterHeaderRemoval {
    pub description: u8,
}

impl OuterHeaderRemoval {
    pub const GTPU_UDP_IPV4: u8 = 0;

    pub fn gtpu_udp_ipv4() -> Self {
        Self {
            description: Self::GTPU_UDP_IPV4,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        encode_u8_ie(buf, IeType::OuterHeaderRemoval, self.description);
    }
}

/// Outer Header Creation, GTP-U/UDP/IPv4 form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OuterHeaderCreation {
    pub teid: u32,
    pub ipv4: Ipv4Addr,
}

impl OuterHeaderCreation {
    /// Description field with only the GTP-U/UDP/IPv4 bit set
    const DESC_GTPU_UDP_IPV4: u16 = 0x0100;

    pub fn new_gtpu_ipv4(teid: u32, addr: Ipv4Addr) -> Self {
        Self { teid, ipv4: addr }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut payload = BytesMut::new();
        payload.put_u16(Self::DESC_GTPU_UDP_IPV4);
        payload.put_u32(self.teid);
        payload.put_slice(&self.ipv4.octets());
        encode_bytes_ie(buf, IeType::OuterHeaderCreation, &payload);
    }
}

// ============================================================================
// Forwarding / QoS / usage reporting payloads
// ============================================================================

/// Apply Action flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyAction {
    pub drop: bool,
    pub forward: bool,
    pub buffer: bool,
}

impl ApplyAction {
    pub fn forward() -> Self {
        Self {
            forward: true,
            ..Default::default()
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if self.drop {
            flags |= 0x01;
        }
        if self.forward {
            flags |= 0x02;
        }
        if self.buffer {
            flags |= 0x04;
        }
        encode_u8_ie(buf, IeType::ApplyAction, flags);
    }
}

/// Gate Status; 0 means open for each direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStatus {
    pub ul_open: bool,
    pub dl_open: bool,
}

impl GateStatus {
    pub fn both_open() -> Self {
        Self {
            ul_open: true,
            dl_open: true,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let ul = u8::from(!self.ul_open);
        let dl = u8::from(!self.dl_open);
        encode_u8_ie(buf, IeType::GateStatus, (ul << 2) | dl);
    }
}

/// Bitrate pair used for both MBR and GBR; each direction is 5 octets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitrate {
    pub uplink: u64,
    pub downlink: u64,
}

impl Bitrate {
    pub fn symmetric(rate: u64) -> Self {
        Self {
            uplink: rate,
            downlink: rate,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut, ie_type: IeType) {
        let mut payload = BytesMut::new();
        payload.put_slice(&self.uplink.to_be_bytes()[3..8]);
        payload.put_slice(&self.downlink.to_be_bytes()[3..8]);
        encode_bytes_ie(buf, ie_type, &payload);
    }
}

/// Measurement Method flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeasurementMethod {
    pub duration: bool,
    pub volume: bool,
    pub event: bool,
}

impl MeasurementMethod {
    pub fn volume() -> Self {
        Self {
            volume: true,
            ..Default::default()
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut flags = 0u8;
        if self.duration {
            flags |= 0x01;
        }
        if self.volume {
            flags |= 0x02;
        }
        if self.event {
            flags |= 0x04;
        }
        encode_u8_ie(buf, IeType::MeasurementMethod, flags);
    }
}

/// Reporting Triggers flags, 2 octets on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportingTriggers {
    pub periodic: bool,
    pub volume_threshold: bool,
    pub volume_quota: bool,
}

impl ReportingTriggers {
    pub fn encode(&self, buf: &mut BytesMut) {
        let mut octet5 = 0u8;
        if self.periodic {
            octet5 |= 0x01;
        }
        if self.volume_threshold {
            octet5 |= 0x02;
        }
        let mut octet6 = 0u8;
        if self.volume_quota {
            octet6 |= 0x01;
        }
        encode_u16_ie(
            buf,
            IeType::ReportingTriggers,
            u16::from_be_bytes([octet5, octet6]),
        );
    }
}

/// Volume value shared by the Volume Threshold and Volume Quota IEs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Volume {
    pub total: Option<u64>,
    pub uplink: Option<u64>,
    pub downlink: Option<u64>,
}

impl Volume {
    const FLAG_TOVOL: u8 = 0x01;
    const FLAG_ULVOL: u8 = 0x02;
    const FLAG_DLVOL: u8 = 0x04;

    pub fn new_total(total: u64) -> Self {
        Self {
            total: Some(total),
            ..Default::default()
        }
    }

    pub fn encode(&self, buf: &mut BytesMut, ie_type: IeType) {
        let mut payload = BytesMut::new();
        let mut flags = 0u8;
        if self.total.is_some() {
            flags |= Self::FLAG_TOVOL;
        }
        if self.uplink.is_some() {
            flags |= Self::FLAG_ULVOL;
        }
        if self.downlink.is_some() {
            flags |= Self::FLAG_DLVOL;
        }
        payload.put_u8(flags);
        for volume in [self.total, self.uplink, self.downlink].into_iter().flatten() {
            payload.put_u64(volume);
        }
        encode_bytes_ie(buf, ie_type, &payload);
    }
}

/// PDN Type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PdnType {
    Ipv4 = 1,
    Ipv6 = 2,
    Ipv4v6 = 3,
    NonIp = 4,
}

impl PdnType {
    pub fn encode(&self, buf: &mut BytesMut) {
        encode_u8_ie(buf, IeType::PdnType, *self as u8);
    }
}

// ============================================================================
// Grouped rules
// ============================================================================

fn encode_grouped(buf: &mut BytesMut, ie_type: IeType, body: &[u8]) {
    IeHeader {
        ie_type: ie_type as u16,
        length: body.len() as u16,
    }
    .encode(buf);
    buf.put_slice(body);
}

/// Packet Detection Information carried inside a PDR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdi {
    pub source_interface: SourceInterface,
    pub local_f_teid: Option<FTeid>,
    pub ue_ip_address: Option<UeIpAddress>,
    pub network_instance: Option<String>,
    pub sdf_filter: Option<SdfFilter>,
}

impl Pdi {
    fn encode_body(&self) -> BytesMut {
        let mut body = BytesMut::new();
        encode_u8_ie(&mut body, IeType::SourceInterface, self.source_interface as u8);
        if let Some(f_teid) = &self.local_f_teid {
            f_teid.encode(&mut body);
        }
        if let Some(ue_addr) = &self.ue_ip_address {
            ue_addr.encode(&mut body);
        }
        if let Some(instance) = &self.network_instance {
            encode_bytes_ie(&mut body, IeType::NetworkInstance, instance.as_bytes());
        }
        if let Some(sdf) = &self.sdf_filter {
            sdf.encode(&mut body);
        }
        body
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        encode_grouped(buf, IeType::Pdi, &self.encode_body());
    }
}

/// Packet Detection Rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdrRule {
    pub pdr_id: u16,
    pub precedence: u32,
    pub pdi: Pdi,
    pub outer_header_removal: Option<OuterHeaderRemoval>,
    pub far_id: u32,
    pub qer_id: u32,
    pub urr_id: u32,
}

impl PdrRule {
    /// Inner body; identical for the create and update forms
    pub fn canonical_body(&self) -> Bytes {
        let mut body = BytesMut::new();
        encode_u16_ie(&mut body, IeType::PdrId, self.pdr_id);
        encode_u32_ie(&mut body, IeType::Precedence, self.precedence);
        if let Some(ohr) = &self.outer_header_removal {
            ohr.encode(&mut body);
        }
        self.pdi.encode(&mut body);
        encode_u32_ie(&mut body, IeType::FarId, self.far_id);
        encode_u32_ie(&mut body, IeType::QerId, self.qer_id);
        encode_u32_ie(&mut body, IeType::UrrId, self.urr_id);
        body.freeze()
    }

    pub fn to_ie(&self, update: bool) -> RawIe {
        let ie_type = if update { IeType::UpdatePdr } else { IeType::CreatePdr };
        RawIe::new(ie_type, self.canonical_body())
    }
}

/// Forwarding Parameters carried inside a FAR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingParameters {
    pub destination_interface: DestinationInterface,
    pub outer_header_creation: Option<OuterHeaderCreation>,
}

impl ForwardingParameters {
    fn encode_body(&self) -> BytesMut {
        let mut body = BytesMut::new();
        encode_u8_ie(
            &mut body,
            IeType::DestinationInterface,
            self.destination_interface as u8,
        );
        if let Some(ohc) = &self.outer_header_creation {
            ohc.encode(&mut body);
        }
        body
    }
}

/// Forwarding Action Rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarRule {
    pub far_id: u32,
    pub apply_action: ApplyAction,
    pub forwarding: ForwardingParameters,
}

impl FarRule {
    fn encode_body(&self, update: bool) -> Bytes {
        let mut body = BytesMut::new();
        encode_u32_ie(&mut body, IeType::FarId, self.far_id);
        self.apply_action.encode(&mut body);
        let params_type = if update {
            IeType::UpdateForwardingParameters
        } else {
            IeType::ForwardingParameters
        };
        encode_grouped(&mut body, params_type, &self.forwarding.encode_body());
        body.freeze()
    }

    /// Inner body in create form, used for content comparison regardless of
    /// the form actually put on the wire
    pub fn canonical_body(&self) -> Bytes {
        self.encode_body(false)
    }

    pub fn to_ie(&self, update: bool) -> RawIe {
        let ie_type = if update { IeType::UpdateFar } else { IeType::CreateFar };
        RawIe::new(ie_type, self.encode_body(update))
    }
}

/// QoS Enforcement Rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QerRule {
    pub qer_id: u32,
    pub gate_status: GateStatus,
    pub maximum_bitrate: Bitrate,
    pub guaranteed_bitrate: Bitrate,
}

impl QerRule {
    pub fn canonical_body(&self) -> Bytes {
        let mut body = BytesMut::new();
        encode_u32_ie(&mut body, IeType::QerId, self.qer_id);
        self.gate_status.encode(&mut body);
        self.maximum_bitrate.encode(&mut body, IeType::Mbr);
        self.guaranteed_bitrate.encode(&mut body, IeType::Gbr);
        body.freeze()
    }

    pub fn to_ie(&self, update: bool) -> RawIe {
        let ie_type = if update { IeType::UpdateQer } else { IeType::CreateQer };
        RawIe::new(ie_type, self.canonical_body())
    }
}

/// Usage Reporting Rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrrRule {
    pub urr_id: u32,
    pub measurement_method: MeasurementMethod,
    pub reporting_triggers: ReportingTriggers,
    pub volume_quota: Volume,
    pub volume_threshold: Volume,
}

impl UrrRule {
    pub fn canonical_body(&self) -> Bytes {
        let mut body = BytesMut::new();
        encode_u32_ie(&mut body, IeType::UrrId, self.urr_id);
        self.measurement_method.encode(&mut body);
        self.reporting_triggers.encode(&mut body);
        self.volume_quota.encode(&mut body, IeType::VolumeQuota);
        self.volume_threshold.encode(&mut body, IeType::VolumeThreshold);
        body.freeze()
    }

    pub fn to_ie(&self, update: bool) -> RawIe {
        let ie_type = if update { IeType::UpdateUrr } else { IeType::CreateUrr };
        RawIe::new(ie_type, self.canonical_body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ie::RawIe;

    fn decode_one(buf: BytesMut) -> RawIe {
        let mut bytes = buf.freeze();
        let ie = RawIe::decode(&mut bytes).unwrap();
        assert!(bytes.is_empty());
        ie
    }

    #[test]
    fn fseid_encode_decode() {
        let fseid = FSeid::new_ipv4(0x1122, Ipv4Addr::new(10, 0, 0, 1));
        let mut buf = BytesMut::new();
        fseid.encode(&mut buf);

        let ie = decode_one(buf);
        assert_eq!(ie.ie_type, IeType::FSeid as u16);
        assert_eq!(ie.data[0], 0x02); // V4 flag only
        assert_eq!(FSeid::decode(&ie.data).unwrap(), fseid);
    }

    #[test]
    fn node_id_ipv4_round_trip() {
        let node_id = NodeId::new_ipv4(Ipv4Addr::new(192, 168, 0, 9));
        let mut buf = BytesMut::new();
        node_id.encode(&mut buf);
        let ie = decode_one(buf);
        assert_eq!(NodeId::decode(&ie.data).unwrap(), node_id);
    }

    #[test]
    fn apply_action_flags() {
        let mut action = ApplyAction::forward();
        action.buffer = true;
        let mut buf = BytesMut::new();
        action.encode(&mut buf);
        let ie = decode_one(buf);
        assert_eq!(ie.data[0], 0x02 | 0x04);
    }

    #[test]
    fn gate_status_open_encodes_zero() {
        let mut buf = BytesMut::new();
        GateStatus::both_open().encode(&mut buf);
        let ie = decode_one(buf);
        assert_eq!(ie.data[0], 0);
    }

    #[test]
    fn bitrate_uses_five_octets_per_direction() {
        let mut buf = BytesMut::new();
        Bitrate::symmetric(12_345_678).encode(&mut buf, IeType::Mbr);
        let ie = decode_one(buf);
        assert_eq!(ie.data.len(), 10);
        assert_eq!(&ie.data[0..5], &[0x00, 0x00, 0xBC, 0x61, 0x4E]);
    }

    #[test]
    fn volume_total_only() {
        let mut buf = BytesMut::new();
        Volume::new_total(100_000).encode(&mut buf, IeType::VolumeQuota);
        let ie = decode_one(buf);
        assert_eq!(ie.data.len(), 9);
        assert_eq!(ie.data[0], 0x01);
    }

    #[test]
    fn cause_decode() {
        let mut buf = BytesMut::new();
        PfcpCause::RequestAccepted.encode(&mut buf);
        let ie = decode_one(buf);
        let cause = PfcpCause::decode(&ie.data).unwrap();
        assert!(cause.is_success());
        assert_eq!(PfcpCause::try_from(99), Err(PfcpError::InvalidCause(99)));
    }

    fn sample_far(tunnel: bool) -> FarRule {
        FarRule {
            far_id: 7,
            apply_action: ApplyAction::forward(),
            forwarding: ForwardingParameters {
                destination_interface: DestinationInterface::Access,
                outer_header_creation: tunnel
                    .then(|| OuterHeaderCreation::new_gtpu_ipv4(256, Ipv4Addr::new(140, 0, 100, 1))),
            },
        }
    }

    #[test]
    fn far_canonical_body_is_form_independent() {
        let far = sample_far(true);
        let create = far.to_ie(false);
        let update = far.to_ie(true);
        assert_eq!(create.ie_type, IeType::CreateFar as u16);
        assert_eq!(update.ie_type, IeType::UpdateFar as u16);
        // Wire forms differ (forwarding parameters IE code), canonical does not
        assert_ne!(create.data, update.data);
        assert_eq!(far.canonical_body(), create.data);
    }

    #[test]
    fn far_content_change_changes_canonical_body() {
        assert_ne!(sample_far(false).canonical_body(), sample_far(true).canonical_body());
    }

    #[test]
    fn pdr_wrapper_type_follows_update_flag() {
        let pdr = PdrRule {
            pdr_id: 1,
            precedence: 2,
            pdi: Pdi {
                source_interface: SourceInterface::Access,
                local_f_teid: Some(FTeid::new_ipv4(255, Ipv4Addr::new(140, 0, 100, 254))),
                ue_ip_address: None,
                network_instance: None,
                sdf_filter: Some(SdfFilter::new("permit out ip from any to any")),
            },
            outer_header_removal: Some(OuterHeaderRemoval::gtpu_udp_ipv4()),
            far_id: 1,
            qer_id: 1,
            urr_id: 1,
        };
        assert_eq!(pdr.to_ie(false).ie_type, IeType::CreatePdr as u16);
        assert_eq!(pdr.to_ie(true).ie_type, IeType::UpdatePdr as u16);
        assert_eq!(pdr.to_ie(false).data, pdr.to_ie(true).data);
    }
}
