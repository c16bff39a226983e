//! PFCP Protocol Library
//!
//! Message building and parsing for PFCP (Packet Forwarding Control
//! Protocol, 3GPP TS 29.244), the protocol spoken between the control plane
//! (SMF) and user plane (UPF) on the N4/Sxb reference point.
//!
//! # Features
//!
//! - PFCP header encoding/decoding
//! - Node messages (Heartbeat, Association Setup/Release)
//! - Session messages (Establishment, Modification, Deletion)
//! - Typed IE payloads and grouped PDR/FAR/QER/URR rules
//!
//! # Example
//!
//! ```rust
//! use pfcp::message::{build_message, HeartbeatRequest, PfcpMessage};
//!
//! let msg = PfcpMessage::HeartbeatRequest(HeartbeatRequest::new(1234567890));
//! let buf = build_message(&msg, 1, None);
//! assert_eq!(buf[1], 1); // message type
//! ```

pub mod error;
pub mod header;
pub mod ie;
pub mod message;
pub mod types;

#[cfg(test)]
mod property_tests;

pub use error::{PfcpError, PfcpResult};
pub use header::{
    PfcpHeader, PfcpMessageType, PFCP_HEADER_LEN, PFCP_HEADER_LEN_WITH_SEID, PFCP_VERSION,
};
pub use types::PFCP_UDP_PORT;

/// Re-export of the commonly used types
pub mod prelude {
    pub use crate::error::{PfcpError, PfcpResult};
    pub use crate::header::{PfcpHeader, PfcpMessageType};
    pub use crate::ie::{IeHeader, IeType, RawIe};
    pub use crate::message::{
        build_message, parse_message, AssociationReleaseRequest, AssociationReleaseResponse,
        AssociationSetupRequest, AssociationSetupResponse, HeartbeatRequest, HeartbeatResponse,
        PfcpMessage, SessionDeletionRequest, SessionDeletionResponse, SessionEstablishmentRequest,
        SessionEstablishmentResponse, SessionModificationRequest, SessionModificationResponse,
    };
    pub use crate::types::{
        ApplyAction, Bitrate, DestinationInterface, FSeid, FTeid, FarRule, ForwardingParameters,
        GateStatus, MeasurementMethod, NodeId, OuterHeaderCreation, OuterHeaderRemoval, Pdi,
        PdnType, PdrRule, PfcpCause, QerRule, ReportingTriggers, SdfFilter, SourceInterface,
        UeIpAddress, UrrRule, Volume,
    };
}
