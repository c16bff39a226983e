//! Liveness timer
//!
//! A dedicated thread that keeps the PFCP association alive with periodic
//! Heartbeat exchanges. The period is counted down in 1-second sleeps so the
//! terminate flag is observed promptly; ticks are skipped entirely while no
//! association is established.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pfcp::header::PfcpMessageType;

use crate::context::SmfContext;
use crate::n4_build;
use crate::pfcp_path::PfcpPath;

/// Seconds between heartbeat ticks
pub const HEARTBEAT_PERIOD_SECS: u64 = 5;

pub fn spawn_heartbeat(ctx: Arc<SmfContext>, path: Arc<PfcpPath>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("heartbeat".to_string())
        .spawn(move || heartbeat_loop(&ctx, &path))
        .expect("failed to spawn heartbeat thread")
}

fn heartbeat_loop(ctx: &SmfContext, path: &PfcpPath) {
    loop {
        for _ in 0..HEARTBEAT_PERIOD_SECS {
            thread::sleep(Duration::from_secs(1));
            if ctx.is_terminating() {
                log::debug!("heartbeat thread exiting");
                return;
            }
        }
        heartbeat_tick(ctx, path);
    }
}

/// One heartbeat tick; returns whether an exchange was attempted
fn heartbeat_tick(ctx: &SmfContext, path: &PfcpPath) -> bool {
    if !ctx.is_established() {
        // Don't heartbeat unless an association is currently established
        return false;
    }
    let message = n4_build::build_heartbeat(ctx.recovery_time_stamp);
    let sequence = ctx.next_sequence();
    match path.send_receive(&message, sequence, None, PfcpMessageType::HeartbeatResponse) {
        Ok(_) => log::debug!("heartbeat acknowledged (seq {sequence})"),
        Err(e) => log::error!("heartbeat exchange failed: {e}"),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use std::time::Instant;

    fn idle_path() -> PfcpPath {
        // Connected to a throwaway endpoint; an idle tick never touches it
        let target = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let peer = match target.local_addr().unwrap() {
            std::net::SocketAddr::V4(addr) => addr,
            _ => unreachable!(),
        };
        PfcpPath::connect(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0), peer, None, None).unwrap()
    }

    #[test]
    fn no_heartbeat_while_idle() {
        let ctx = SmfContext::new(Ipv4Addr::LOCALHOST, 100);
        let path = idle_path();
        assert!(!heartbeat_tick(&ctx, &path));
        // The shared sequence allocator was not consumed
        assert_eq!(ctx.next_sequence(), 1);
    }

    #[test]
    fn terminate_flag_stops_the_thread_mid_period() {
        let ctx = Arc::new(SmfContext::new(Ipv4Addr::LOCALHOST, 100));
        let path = Arc::new(idle_path());
        let handle = spawn_heartbeat(Arc::clone(&ctx), path);

        ctx.set_terminating();
        let start = Instant::now();
        handle.join().unwrap();
        // Well under the full heartbeat period
        assert!(start.elapsed() < Duration::from_secs(HEARTBEAT_PERIOD_SECS));
    }
}
