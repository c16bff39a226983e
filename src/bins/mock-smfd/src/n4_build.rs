//! N4 request builders
//!
//! Fabricates plausible rule content for simulated UEs (one UE per session,
//! an uplink and a downlink flow each) and assembles the PFCP requests the
//! client sends. Every rule passes through the session's change cache on the
//! way into a request; rules whose content is unchanged since the last
//! transmission are omitted unless forced, and rules previously sent take
//! the update form.

use std::net::Ipv4Addr;

use bytes::Bytes;
use clap::Args;

use pfcp::ie::RawIe;
use pfcp::message::{
    AssociationReleaseRequest, AssociationSetupRequest, HeartbeatRequest, PfcpMessage,
    SessionDeletionRequest, SessionEstablishmentRequest, SessionModificationRequest,
};
use pfcp::types::{
    ApplyAction, Bitrate, DestinationInterface, FSeid, FTeid, FarRule, ForwardingParameters,
    GateStatus, MeasurementMethod, NodeId, OuterHeaderCreation, OuterHeaderRemoval, Pdi, PdnType,
    PdrRule, QerRule, ReportingTriggers, SdfFilter, SourceInterface, UeIpAddress, UrrRule, Volume,
};

use crate::context::{RuleCache, RuleChange, Session};
use crate::pool::UePool;

/// Fully wildcard SDF filter applied to every PDR
pub const WILDCARD_SDF: &str = "0.0.0.0/0 0.0.0.0/0 0 : 65535 0 : 65535 0x0/0x0";

/// Network instance tagged onto downlink PDRs
pub const DEFAULT_NETWORK_INSTANCE: &str = "internetinternetinternetinterne";

const QER_BITRATE: u64 = 12_345_678;
const URR_VOLUME_QUOTA: u64 = 100_000;
const URR_UPLINK_THRESHOLD: u64 = 40_000;
const URR_DOWNLINK_THRESHOLD: u64 = 50_000;

/// Per-command session parameters
#[derive(Debug, Clone, Args)]
pub struct SessionParams {
    /// The number of sessions for which UE flows should be created
    #[arg(long, default_value_t = 1)]
    pub session_count: u64,

    /// The IPv4 prefix from which UE addresses will be drawn
    #[arg(long, default_value = "17.0.0.0/24")]
    pub ue_pool: UePool,

    /// The IPv4 address of the UPF's S1U interface
    #[arg(long, default_value = "140.0.100.254")]
    pub s1u_addr: Ipv4Addr,

    /// The IPv4 address of the eNodeB
    #[arg(long, default_value = "140.0.100.1")]
    pub enb_addr: Ipv4Addr,

    /// The SEID of the first session; later sessions increment from here
    #[arg(long, default_value_t = 1)]
    pub seid_base: u64,

    /// The first TEID to use for the first UE flow
    #[arg(long, default_value_t = 255)]
    pub teid_base: u32,

    /// The first PDR ID to use for the first UE flow
    #[arg(long, default_value_t = 1)]
    pub pdr_base: u16,

    /// The first FAR ID to use for the first UE flow
    #[arg(long, default_value_t = 1)]
    pub far_base: u32,

    /// The first URR ID to use for the first UE flow
    #[arg(long, default_value_t = 1)]
    pub urr_base: u32,

    /// The first QER ID to use for the first UE flow
    #[arg(long, default_value_t = 1)]
    pub qer_base: u32,

    /// The priority/precedence of PDRs
    #[arg(long, default_value_t = 2)]
    pub pdr_precedence: u32,

    /// Set the buffering flag on downlink FARs
    #[arg(long)]
    pub buffer: bool,
}

/// Identifier pair assigned to one UE's uplink and downlink flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowIds {
    pub teid_up: u32,
    pub teid_down: u32,
    pub pdr_up: u16,
    pub pdr_down: u16,
    pub far_up: u32,
    pub far_down: u32,
    pub qer_up: u32,
    pub qer_down: u32,
    pub urr_up: u32,
    pub urr_down: u32,
}

impl FlowIds {
    /// IDs for the session at `index`: each base advances by two per session
    pub fn for_session(params: &SessionParams, index: u64) -> Self {
        let pair = (index * 2) as u32;
        Self {
            teid_up: params.teid_base + pair,
            teid_down: params.teid_base + pair + 1,
            pdr_up: params.pdr_base + pair as u16,
            pdr_down: params.pdr_base + pair as u16 + 1,
            far_up: params.far_base + pair,
            far_down: params.far_base + pair + 1,
            qer_up: params.qer_base + pair,
            qer_down: params.qer_base + pair + 1,
            urr_up: params.urr_base + pair,
            urr_down: params.urr_base + pair + 1,
        }
    }
}

// ============================================================================
// Node messages
// ============================================================================

pub fn build_heartbeat(recovery_time_stamp: u32) -> PfcpMessage {
    PfcpMessage::HeartbeatRequest(HeartbeatRequest::new(recovery_time_stamp))
}

pub fn build_association_setup(local_addr: Ipv4Addr, recovery_time_stamp: u32) -> PfcpMessage {
    PfcpMessage::AssociationSetupRequest(AssociationSetupRequest {
        node_id: NodeId::new_ipv4(local_addr),
        recovery_time_stamp,
    })
}

pub fn build_association_release(local_addr: Ipv4Addr) -> PfcpMessage {
    PfcpMessage::AssociationReleaseRequest(AssociationReleaseRequest {
        node_id: NodeId::new_ipv4(local_addr),
    })
}

// ============================================================================
// Rule fabrication
// ============================================================================

fn uplink_pdr(ids: &FlowIds, params: &SessionParams) -> PdrRule {
    PdrRule {
        pdr_id: ids.pdr_up,
        precedence: params.pdr_precedence,
        pdi: Pdi {
            source_interface: SourceInterface::Access,
            local_f_teid: Some(FTeid::new_ipv4(ids.teid_up, params.s1u_addr)),
            ue_ip_address: None,
            network_instance: None,
            sdf_filter: Some(SdfFilter::new(WILDCARD_SDF)),
        },
        outer_header_removal: Some(OuterHeaderRemoval::gtpu_udp_ipv4()),
        far_id: ids.far_up,
        qer_id: ids.qer_up,
        urr_id: ids.urr_up,
    }
}

fn downlink_pdr(ids: &FlowIds, params: &SessionParams, ue_addr: Ipv4Addr) -> PdrRule {
    PdrRule {
        pdr_id: ids.pdr_down,
        precedence: params.pdr_precedence,
        pdi: Pdi {
            source_interface: SourceInterface::Core,
            local_f_teid: None,
            ue_ip_address: Some(UeIpAddress::new_ipv4(ue_addr)),
            network_instance: Some(DEFAULT_NETWORK_INSTANCE.to_string()),
            sdf_filter: Some(SdfFilter::new(WILDCARD_SDF)),
        },
        outer_header_removal: None,
        far_id: ids.far_down,
        qer_id: ids.qer_down,
        urr_id: ids.urr_down,
    }
}

fn uplink_far(far_id: u32) -> FarRule {
    FarRule {
        far_id,
        apply_action: ApplyAction::forward(),
        forwarding: ForwardingParameters {
            destination_interface: DestinationInterface::Core,
            outer_header_creation: None,
        },
    }
}

/// Downlink FAR toward the access side. `tunnel` is only set on session
/// modification; the UPF does not accept outer header creation at
/// establishment time. A buffering FAR tunnels with TEID 0.
fn downlink_far(far_id: u32, tunnel: Option<(u32, Ipv4Addr)>, buffer: bool) -> FarRule {
    FarRule {
        far_id,
        apply_action: ApplyAction {
            forward: true,
            buffer,
            drop: false,
        },
        forwarding: ForwardingParameters {
            destination_interface: DestinationInterface::Access,
            outer_header_creation: tunnel.map(|(teid, enb_addr)| {
                OuterHeaderCreation::new_gtpu_ipv4(if buffer { 0 } else { teid }, enb_addr)
            }),
        },
    }
}

fn flow_qer(qer_id: u32) -> QerRule {
    QerRule {
        qer_id,
        gate_status: GateStatus::both_open(),
        maximum_bitrate: Bitrate::symmetric(QER_BITRATE),
        guaranteed_bitrate: Bitrate::symmetric(QER_BITRATE),
    }
}

fn flow_urr(urr_id: u32, threshold: u64) -> UrrRule {
    UrrRule {
        urr_id,
        measurement_method: MeasurementMethod::volume(),
        reporting_triggers: ReportingTriggers {
            periodic: false,
            volume_threshold: true,
            volume_quota: true,
        },
        volume_quota: Volume::new_total(URR_VOLUME_QUOTA),
        volume_threshold: Volume::new_total(threshold),
    }
}

/// Classify a rule against the cache, then append it unless its content is
/// unchanged (forced rules go out regardless). Previously sent rules take
/// the update form.
fn push_if_needed(
    rules: &mut Vec<RawIe>,
    cache: &mut RuleCache,
    rule_id: u32,
    canonical: Bytes,
    force: bool,
    kind: &str,
    to_ie: impl FnOnce(bool) -> RawIe,
) {
    let change = cache.classify(rule_id, canonical);
    let update = change != RuleChange::New;
    if force || change != RuleChange::Unchanged {
        log::debug!("{kind} {rule_id}: {change:?}, included (update={update})");
        rules.push(to_ie(update));
    } else {
        log::debug!("{kind} {rule_id}: unchanged, omitted");
    }
}

// ============================================================================
// Session messages
// ============================================================================

/// Establishment request for one session: both PDRs, FARs (untunnelled),
/// QERs and URRs for its UE
pub fn build_session_establishment(
    session: &mut Session,
    params: &SessionParams,
    index: u64,
    ue_addr: Ipv4Addr,
    local_addr: Ipv4Addr,
) -> PfcpMessage {
    let ids = FlowIds::for_session(params, index);
    let mut rules = Vec::new();

    for pdr in [
        uplink_pdr(&ids, params),
        downlink_pdr(&ids, params, ue_addr),
    ] {
        push_if_needed(
            &mut rules,
            &mut session.sent_pdrs,
            u32::from(pdr.pdr_id),
            pdr.canonical_body(),
            false,
            "PDR",
            |update| pdr.to_ie(update),
        );
    }

    for far in [
        uplink_far(ids.far_up),
        downlink_far(ids.far_down, None, params.buffer),
    ] {
        push_if_needed(
            &mut rules,
            &mut session.sent_fars,
            far.far_id,
            far.canonical_body(),
            false,
            "FAR",
            |update| far.to_ie(update),
        );
    }

    for qer in [flow_qer(ids.qer_up), flow_qer(ids.qer_down)] {
        push_if_needed(
            &mut rules,
            &mut session.sent_qers,
            qer.qer_id,
            qer.canonical_body(),
            false,
            "QER",
            |update| qer.to_ie(update),
        );
    }

    for urr in [
        flow_urr(ids.urr_up, URR_UPLINK_THRESHOLD),
        flow_urr(ids.urr_down, URR_DOWNLINK_THRESHOLD),
    ] {
        push_if_needed(
            &mut rules,
            &mut session.sent_urrs,
            urr.urr_id,
            urr.canonical_body(),
            false,
            "URR",
            |update| urr.to_ie(update),
        );
    }

    PfcpMessage::SessionEstablishmentRequest(SessionEstablishmentRequest {
        node_id: NodeId::new_ipv4(local_addr),
        f_seid: FSeid::new_ipv4(session.our_seid, local_addr),
        pdn_type: PdnType::Ipv4,
        rules,
    })
}

/// Modification request for one session: FARs only, with the downlink FAR
/// now tunnelled toward the eNodeB
pub fn build_session_modification(
    session: &mut Session,
    params: &SessionParams,
    index: u64,
    force: bool,
    local_addr: Ipv4Addr,
) -> PfcpMessage {
    let ids = FlowIds::for_session(params, index);
    let mut rules = Vec::new();

    for far in [
        uplink_far(ids.far_up),
        downlink_far(
            ids.far_down,
            Some((ids.teid_down, params.enb_addr)),
            params.buffer,
        ),
    ] {
        push_if_needed(
            &mut rules,
            &mut session.sent_fars,
            far.far_id,
            far.canonical_body(),
            force,
            "FAR",
            |update| far.to_ie(update),
        );
    }

    PfcpMessage::SessionModificationRequest(SessionModificationRequest {
        f_seid: FSeid::new_ipv4(session.our_seid, local_addr),
        rules,
    })
}

pub fn build_session_deletion(session: &Session, local_addr: Ipv4Addr) -> PfcpMessage {
    PfcpMessage::SessionDeletionRequest(SessionDeletionRequest {
        f_seid: FSeid::new_ipv4(session.our_seid, local_addr),
    })
}
