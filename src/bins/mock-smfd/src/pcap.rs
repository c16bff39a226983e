//! Packet capture
//!
//! Appends every sent and received PFCP datagram to a pcap file so an
//! exchange can be replayed in wireshark. Records are LINKTYPE_IPV4: a
//! hand-built IPv4/UDP envelope around the raw PFCP payload, written in the
//! order the datagrams crossed the socket.

use std::fs::File;
use std::io::{self, Write};
use std::net::SocketAddrV4;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, BytesMut};

const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
const PCAP_VERSION_MAJOR: u16 = 2;
const PCAP_VERSION_MINOR: u16 = 4;
const PCAP_SNAPLEN: u32 = 65_535;
const LINKTYPE_IPV4: u32 = 228;

const IPV4_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;
const IPPROTO_UDP: u8 = 17;

/// Append-only pcap file writer
#[derive(Debug)]
pub struct PcapWriter {
    file: File,
}

impl PcapWriter {
    /// Create (truncating) the capture file and write the global header
    pub fn create(path: &Path) -> io::Result<Self> {
        let mut file = File::create(path)?;
        let mut header = BytesMut::with_capacity(24);
        header.put_u32_le(PCAP_MAGIC);
        header.put_u16_le(PCAP_VERSION_MAJOR);
        header.put_u16_le(PCAP_VERSION_MINOR);
        header.put_u32_le(0); // thiszone
        header.put_u32_le(0); // sigfigs
        header.put_u32_le(PCAP_SNAPLEN);
        header.put_u32_le(LINKTYPE_IPV4);
        file.write_all(&header)?;
        Ok(Self { file })
    }

    /// Append one datagram, timestamped now
    pub fn record(&mut self, src: SocketAddrV4, dst: SocketAddrV4, payload: &[u8]) -> io::Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let packet_len = IPV4_HEADER_LEN + UDP_HEADER_LEN + payload.len();

        let mut record = BytesMut::with_capacity(16 + packet_len);
        record.put_u32_le(now.as_secs() as u32);
        record.put_u32_le(now.subsec_micros());
        record.put_u32_le(packet_len as u32);
        record.put_u32_le(packet_len as u32);

        put_ipv4_header(&mut record, src, dst, UDP_HEADER_LEN + payload.len());
        record.put_u16(src.port());
        record.put_u16(dst.port());
        record.put_u16((UDP_HEADER_LEN + payload.len()) as u16);
        record.put_u16(0); // UDP checksum unset
        record.put_slice(payload);

        self.file.write_all(&record)?;
        self.file.flush()
    }
}

fn put_ipv4_header(buf: &mut BytesMut, src: SocketAddrV4, dst: SocketAddrV4, body_len: usize) {
    let total_len = (IPV4_HEADER_LEN + body_len) as u16;
    let mut header = [0u8; IPV4_HEADER_LEN];
    header[0] = 0x45; // version 4, IHL 5
    header[2..4].copy_from_slice(&total_len.to_be_bytes());
    header[8] = 64; // TTL
    header[9] = IPPROTO_UDP;
    header[12..16].copy_from_slice(&src.ip().octets());
    header[16..20].copy_from_slice(&dst.ip().octets());
    let checksum = ipv4_checksum(&header);
    header[10..12].copy_from_slice(&checksum.to_be_bytes());
    buf.put_slice(&header);
}

fn ipv4_checksum(header: &[u8]) -> u16 {
    let mut sum = 0u32;
    for chunk in header.chunks(2) {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}
