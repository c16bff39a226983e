//! PFCP request path
//!
//! Owns the UDP socket toward the UPF and performs the blocking
//! request/response exchange every operation goes through. A single lock is
//! held across the whole send-then-receive unit so the command thread and
//! the heartbeat thread can never interleave exchanges and pick up each
//! other's responses.

use std::net::{SocketAddrV4, UdpSocket};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;

use pfcp::header::PfcpMessageType;
use pfcp::message::{build_message, parse_message, PfcpMessage};

use crate::context::{SmfError, SmfResult};
use crate::pcap::PcapWriter;

const RECV_BUFFER_LEN: usize = 1500;

#[derive(Debug)]
pub struct PfcpPath {
    socket: UdpSocket,
    local: SocketAddrV4,
    peer: SocketAddrV4,
    exchange_lock: Mutex<()>,
    capture: Option<Mutex<PcapWriter>>,
}

impl PfcpPath {
    /// Bind the local PFCP endpoint and connect it to the peer. A `timeout`
    /// of `None` keeps the receive side blocking indefinitely.
    pub fn connect(
        local: SocketAddrV4,
        peer: SocketAddrV4,
        timeout: Option<Duration>,
        capture: Option<PcapWriter>,
    ) -> SmfResult<Self> {
        let socket = UdpSocket::bind(local)?;
        socket.connect(peer)?;
        socket.set_read_timeout(timeout)?;
        // Recover the actual port when bound to an ephemeral one
        let local = match socket.local_addr()? {
            std::net::SocketAddr::V4(addr) => addr,
            other => {
                return Err(SmfError::Io(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("not an IPv4 endpoint: {other}"),
                )))
            }
        };
        log::info!("PFCP socket open: {local} -> {peer}");
        Ok(Self {
            socket,
            local,
            peer,
            exchange_lock: Mutex::new(()),
            capture: capture.map(Mutex::new),
        })
    }

    /// Send `message` and block until the response arrives; the response
    /// must be of `expected` type or the exchange fails with
    /// `UnexpectedResponse`.
    pub fn send_receive(
        &self,
        message: &PfcpMessage,
        sequence_number: u32,
        seid: Option<u64>,
        expected: PfcpMessageType,
    ) -> SmfResult<PfcpMessage> {
        let _exchange = self.exchange_lock.lock().expect("exchange lock poisoned");

        let request = build_message(message, sequence_number, seid);
        log::debug!(
            "sending {} (seq {sequence_number}, {} bytes)",
            message.message_type().name(),
            request.len()
        );
        self.capture_packet(self.local, self.peer, &request)?;
        self.socket.send(&request)?;

        let mut buf = [0u8; RECV_BUFFER_LEN];
        let received = self.socket.recv(&mut buf)?;
        self.capture_packet(self.peer, self.local, &buf[..received])?;

        let mut bytes = Bytes::copy_from_slice(&buf[..received]);
        let (header, response) = parse_message(&mut bytes)?;
        log::debug!(
            "received {} (seq {}, {received} bytes)",
            header.message_type.name(),
            header.sequence_number
        );

        if header.message_type != expected {
            return Err(SmfError::UnexpectedResponse {
                expected,
                received: header.message_type,
            });
        }
        Ok(response)
    }

    fn capture_packet(&self, src: SocketAddrV4, dst: SocketAddrV4, data: &[u8]) -> SmfResult<()> {
        if let Some(capture) = &self.capture {
            capture
                .lock()
                .expect("capture lock poisoned")
                .record(src, dst, data)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfcp::message::{HeartbeatRequest, HeartbeatResponse};
    use std::net::Ipv4Addr;

    fn loopback(port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)
    }

    /// One-shot scripted peer: receives a datagram and answers with `reply`
    fn spawn_responder(reply: PfcpMessage) -> SocketAddrV4 {
        let socket = UdpSocket::bind(loopback(0)).unwrap();
        let addr = match socket.local_addr().unwrap() {
            std::net::SocketAddr::V4(addr) => addr,
            _ => unreachable!(),
        };
        std::thread::spawn(move || {
            let mut buf = [0u8; RECV_BUFFER_LEN];
            let (received, from) = socket.recv_from(&mut buf).unwrap();
            let mut bytes = Bytes::copy_from_slice(&buf[..received]);
            let (header, _) = parse_message(&mut bytes).unwrap();
            let out = build_message(&reply, header.sequence_number, None);
            socket.send_to(&out, from).unwrap();
        });
        addr
    }

    #[test]
    fn exchange_returns_the_expected_response() {
        let peer = spawn_responder(PfcpMessage::HeartbeatResponse(HeartbeatResponse::new(77)));
        let path = PfcpPath::connect(loopback(0), peer, None, None).unwrap();

        let response = path
            .send_receive(
                &PfcpMessage::HeartbeatRequest(HeartbeatRequest::new(1)),
                1,
                None,
                PfcpMessageType::HeartbeatResponse,
            )
            .unwrap();
        match response {
            PfcpMessage::HeartbeatResponse(resp) => assert_eq!(resp.recovery_time_stamp, 77),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn mismatched_response_type_is_an_error() {
        // Answer a heartbeat with a heartbeat *request*
        let peer = spawn_responder(PfcpMessage::HeartbeatRequest(HeartbeatRequest::new(1)));
        let path = PfcpPath::connect(loopback(0), peer, None, None).unwrap();

        let err = path
            .send_receive(
                &PfcpMessage::HeartbeatRequest(HeartbeatRequest::new(1)),
                2,
                None,
                PfcpMessageType::HeartbeatResponse,
            )
            .unwrap_err();
        match err {
            SmfError::UnexpectedResponse { expected, received } => {
                assert_eq!(expected, PfcpMessageType::HeartbeatResponse);
                assert_eq!(received, PfcpMessageType::HeartbeatRequest);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn receive_timeout_surfaces_as_io_error() {
        // Peer that never answers
        let silent = UdpSocket::bind(loopback(0)).unwrap();
        let peer = match silent.local_addr().unwrap() {
            std::net::SocketAddr::V4(addr) => addr,
            _ => unreachable!(),
        };
        let path = PfcpPath::connect(
            loopback(0),
            peer,
            Some(Duration::from_millis(50)),
            None,
        )
        .unwrap();

        let err = path
            .send_receive(
                &PfcpMessage::HeartbeatRequest(HeartbeatRequest::new(1)),
                1,
                None,
                PfcpMessageType::HeartbeatResponse,
            )
            .unwrap_err();
        assert!(matches!(err, SmfError::Io(_)));
    }
}
