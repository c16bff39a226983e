//! Mock SMF
//!
//! A command-driven PFCP client for exercising a UPF: it maintains a PFCP
//! association (with heartbeats) and establishes, modifies and deletes
//! sessions populated with fabricated rules for simulated UEs. Commands are
//! read interactively from stdin, or polled from a file for scripted runs.

mod context;
mod n4_build;
mod pcap;
mod pfcp_path;
mod pool;
mod timer;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use pfcp::header::PfcpMessageType;
use pfcp::message::PfcpMessage;
use pfcp::types::PfcpCause;

use crate::context::{recovery_time_stamp_now, SmfContext, SmfResult};
use crate::n4_build::SessionParams;
use crate::pcap::PcapWriter;
use crate::pfcp_path::PfcpPath;

#[derive(Parser, Debug)]
#[command(name = "mock-smfd", version, about = "Mock SMF: drive a UPF over PFCP")]
struct Args {
    /// Address or hostname of the UPF
    upf_addr: String,

    /// Local address to bind the PFCP socket to
    #[arg(long, default_value = "127.0.0.1")]
    local_addr: Ipv4Addr,

    /// UDP port used for PFCP on both ends
    #[arg(long, default_value_t = pfcp::PFCP_UDP_PORT)]
    port: u16,

    /// File to poll for input commands instead of stdin
    #[arg(long)]
    input_file: Option<PathBuf>,

    /// File in which to record sent and received PFCP packets
    #[arg(long)]
    pcap_file: Option<PathBuf>,

    /// Receive timeout in seconds for request/response exchanges
    #[arg(long)]
    timeout: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// One line of user input
#[derive(Parser, Debug)]
#[command(name = "", no_binary_name = true, disable_version_flag = true)]
enum Command {
    /// Set up the PFCP association
    Associate,
    /// Create PFCP session(s)
    Create(SessionParams),
    /// Modify PFCP session(s)
    Modify(ModifyParams),
    /// Delete PFCP session(s)
    Delete(SessionParams),
    /// Tear down the PFCP association
    Disassociate,
    /// Ungracefully tear down the PFCP association (local state only)
    Interrupt,
    /// Delete any remaining sessions and exit
    Stop,
}

#[derive(Debug, clap::Args)]
struct ModifyParams {
    #[command(flatten)]
    session: SessionParams,

    /// Resend rules even when their content is unchanged
    #[arg(long)]
    force: bool,
}

fn init_logging(args: &Args) {
    let level = match args.log_level.as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .write_style(env_logger::WriteStyle::Never)
        .init();
}

fn resolve_upf_addr(host: &str, port: u16) -> Result<Ipv4Addr> {
    if let Ok(addr) = host.parse::<Ipv4Addr>() {
        return Ok(addr);
    }
    let addrs = (host, port)
        .to_socket_addrs()
        .with_context(|| format!("cannot resolve UPF address '{host}'"))?;
    addrs
        .into_iter()
        .find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .ok_or_else(|| anyhow!("'{host}' does not resolve to an IPv4 address"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let peer_addr = resolve_upf_addr(&args.upf_addr, args.port)?;
    let ctx = Arc::new(SmfContext::new(args.local_addr, recovery_time_stamp_now()));

    {
        let ctx = Arc::clone(&ctx);
        ctrlc::set_handler(move || {
            log::info!("interrupt received, shutting down");
            ctx.set_terminating();
        })
        .context("failed to install signal handler")?;
    }

    let capture = match &args.pcap_file {
        Some(path) => Some(
            PcapWriter::create(path)
                .with_context(|| format!("cannot open capture file {}", path.display()))?,
        ),
        None => None,
    };

    let path = Arc::new(PfcpPath::connect(
        SocketAddrV4::new(args.local_addr, args.port),
        SocketAddrV4::new(peer_addr, args.port),
        args.timeout.map(Duration::from_secs),
        capture,
    )?);

    let heartbeat = timer::spawn_heartbeat(Arc::clone(&ctx), Arc::clone(&path));

    let mut source = match &args.input_file {
        Some(path) => CommandSource::File {
            file: File::open(path)
                .with_context(|| format!("cannot open input file {}", path.display()))?,
            position: 0,
        },
        None => CommandSource::Interactive,
    };

    let result = command_loop(&ctx, &path, &mut source);

    ctx.set_terminating();
    if heartbeat.join().is_err() {
        log::error!("heartbeat thread panicked");
    }
    result.map_err(Into::into)
}

// ============================================================================
// Command input
// ============================================================================

enum CommandSource {
    Interactive,
    /// Polled for unread complete lines every 500 ms
    File {
        file: File,
        position: u64,
    },
}

impl CommandSource {
    fn next_line(&mut self, ctx: &SmfContext) -> io::Result<Option<String>> {
        match self {
            Self::Interactive => {
                print_menu();
                print!("Enter your selection : ");
                io::stdout().flush()?;
                let mut line = String::new();
                if io::stdin().read_line(&mut line)? == 0 {
                    return Ok(None); // EOF
                }
                Ok(Some(line))
            }
            Self::File { file, position } => loop {
                if ctx.is_terminating() {
                    return Ok(None);
                }
                file.seek(SeekFrom::Start(*position))?;
                let mut line = String::new();
                let read = BufReader::new(&*file).read_line(&mut line)?;
                if read > 0 && line.ends_with('\n') {
                    *position += read as u64;
                    return Ok(Some(line));
                }
                thread::sleep(Duration::from_millis(500));
            },
        }
    }
}

fn print_menu() {
    const CHOICES: &[(&str, &str)] = &[
        ("associate", "Setup PFCP Association"),
        ("create", "Create PFCP Session(s)"),
        ("modify", "Modify PFCP Session(s)"),
        ("delete", "Delete PFCP Session(s)"),
        ("disassociate", "Teardown PFCP Association"),
        ("interrupt", "Ungracefully teardown PFCP association"),
        ("stop", "Exit"),
    ];
    for (choice, description) in CHOICES {
        println!("\"{choice}\" - {description}");
    }
}

fn command_loop(ctx: &SmfContext, path: &PfcpPath, source: &mut CommandSource) -> SmfResult<()> {
    loop {
        if ctx.is_terminating() {
            return Ok(());
        }
        let Some(line) = source.next_line(ctx)? else {
            return Ok(());
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let command = match Command::try_parse_from(trimmed.split_whitespace()) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        let result = match command {
            Command::Associate => do_associate(ctx, path),
            Command::Create(params) => do_create(ctx, path, &params),
            Command::Modify(params) => do_modify(ctx, path, &params.session, params.force),
            Command::Delete(params) => do_delete(ctx, path, &params),
            Command::Disassociate => do_disassociate(ctx, path),
            Command::Interrupt => {
                ctx.interrupt();
                log::info!("association interrupted locally, sessions dropped");
                Ok(())
            }
            Command::Stop => {
                do_stop(ctx, path);
                ctx.set_terminating();
                return Ok(());
            }
        };

        // A failed operation is reported and the loop keeps serving
        // commands; only stop or end of input ends the client
        if let Err(e) = result {
            log::error!("command failed: {e}");
        }
    }
}

// ============================================================================
// Operations
// ============================================================================

fn log_cause(operation: &str, cause: PfcpCause) {
    if cause.is_success() {
        log::info!("{operation} accepted");
    } else {
        log::warn!("{operation} rejected by peer: {}", cause.name());
    }
}

fn do_associate(ctx: &SmfContext, path: &PfcpPath) -> SmfResult<()> {
    // Each association's traffic starts from sequence number 1
    ctx.reset_sequence();
    let message = n4_build::build_association_setup(ctx.local_addr, ctx.recovery_time_stamp);
    let response = path.send_receive(
        &message,
        ctx.next_sequence(),
        None,
        PfcpMessageType::AssociationSetupResponse,
    )?;
    if let PfcpMessage::AssociationSetupResponse(resp) = response {
        log_cause("association setup", resp.cause);
    }
    ctx.set_established(true);
    Ok(())
}

fn do_create(ctx: &SmfContext, path: &PfcpPath, params: &SessionParams) -> SmfResult<()> {
    let local = ctx.local_addr;
    let ue_addrs = params.ue_pool.addresses(params.session_count as usize)?;
    for (index, ue_addr) in ue_addrs.into_iter().enumerate() {
        let our_seid = params.seid_base + index as u64;
        ctx.register_session(our_seid)?;

        let message = ctx.with_session(our_seid, |session| {
            Ok(n4_build::build_session_establishment(
                session,
                params,
                index as u64,
                ue_addr,
                local,
            ))
        })?;
        let response = path.send_receive(
            &message,
            ctx.next_sequence(),
            Some(0),
            PfcpMessageType::SessionEstablishmentResponse,
        )?;

        if let PfcpMessage::SessionEstablishmentResponse(resp) = response {
            log_cause("session establishment", resp.cause);
            if let Some(f_seid) = resp.f_seid {
                ctx.with_session(our_seid, |session| {
                    session.peer_seid = Some(f_seid.seid);
                    Ok(())
                })?;
                log::info!("session {our_seid}: UE {ue_addr}, peer SEID {}", f_seid.seid);
            }
        }
    }
    Ok(())
}

fn do_modify(
    ctx: &SmfContext,
    path: &PfcpPath,
    params: &SessionParams,
    force: bool,
) -> SmfResult<()> {
    let local = ctx.local_addr;
    for index in 0..params.session_count {
        let our_seid = params.seid_base + index;
        let peer_seid = ctx.with_session(our_seid, |session| session.peer_seid())?;
        let message = ctx.with_session(our_seid, |session| {
            Ok(n4_build::build_session_modification(
                session, params, index, force, local,
            ))
        })?;
        let response = path.send_receive(
            &message,
            ctx.next_sequence(),
            Some(peer_seid),
            PfcpMessageType::SessionModificationResponse,
        )?;
        if let PfcpMessage::SessionModificationResponse(resp) = response {
            log_cause("session modification", resp.cause);
        }
    }
    Ok(())
}

fn do_delete(ctx: &SmfContext, path: &PfcpPath, params: &SessionParams) -> SmfResult<()> {
    for index in 0..params.session_count {
        delete_one(ctx, path, params.seid_base + index)?;
    }
    Ok(())
}

fn delete_one(ctx: &SmfContext, path: &PfcpPath, our_seid: u64) -> SmfResult<()> {
    let local = ctx.local_addr;
    let peer_seid = ctx.with_session(our_seid, |session| session.peer_seid())?;
    let message = ctx.with_session(our_seid, |session| {
        Ok(n4_build::build_session_deletion(session, local))
    })?;
    let response = path.send_receive(
        &message,
        ctx.next_sequence(),
        Some(peer_seid),
        PfcpMessageType::SessionDeletionResponse,
    )?;
    if let PfcpMessage::SessionDeletionResponse(resp) = response {
        log_cause("session deletion", resp.cause);
    }
    ctx.remove_session(our_seid)?;
    log::info!("session {our_seid} deleted");
    Ok(())
}

fn do_disassociate(ctx: &SmfContext, path: &PfcpPath) -> SmfResult<()> {
    let message = n4_build::build_association_release(ctx.local_addr);
    let response = path.send_receive(
        &message,
        ctx.next_sequence(),
        None,
        PfcpMessageType::AssociationReleaseResponse,
    )?;
    if let PfcpMessage::AssociationReleaseResponse(resp) = response {
        log_cause("association release", resp.cause);
    }
    ctx.set_established(false);
    Ok(())
}

/// Best-effort teardown before exit: every remaining session is deleted
/// (continuing past individual failures), then the association is released
fn do_stop(ctx: &SmfContext, path: &PfcpPath) {
    if ctx.is_established() {
        let remaining = ctx.session_seids();
        if !remaining.is_empty() {
            log::info!("exiting with {} session(s) active, deleting first", remaining.len());
            for our_seid in remaining {
                if let Err(e) = delete_one(ctx, path, our_seid) {
                    log::error!("failed to delete session {our_seid}: {e}");
                }
            }
        }
        if let Err(e) = do_disassociate(ctx, path) {
            log::error!("failed to release association: {e}");
        }
    }
    log::info!("stopping");
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::UdpSocket;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;

    use pfcp::message::{
        build_message, parse_message, AssociationReleaseResponse, HeartbeatResponse,
        SessionDeletionResponse,
    };
    use pfcp::types::NodeId;

    /// Scripted peer: answers each received request with the next reply in
    /// the script, echoing the request's sequence number and SEID
    fn spawn_script_responder(replies: Vec<PfcpMessage>) -> (SocketAddrV4, Arc<AtomicUsize>) {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let addr = match socket.local_addr().unwrap() {
            SocketAddr::V4(addr) => addr,
            _ => unreachable!(),
        };
        let answered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&answered);
        thread::spawn(move || {
            let mut buf = [0u8; 1500];
            for reply in replies {
                let Ok((received, from)) = socket.recv_from(&mut buf) else {
                    return;
                };
                let mut bytes = Bytes::copy_from_slice(&buf[..received]);
                let Ok((header, _)) = parse_message(&mut bytes) else {
                    continue;
                };
                let out = build_message(&reply, header.sequence_number, header.seid);
                counter.fetch_add(1, Ordering::SeqCst);
                socket.send_to(&out, from).unwrap();
            }
        });
        (addr, answered)
    }

    fn test_path(peer: SocketAddrV4) -> PfcpPath {
        PfcpPath::connect(
            SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0),
            peer,
            Some(Duration::from_millis(200)),
            None,
        )
        .unwrap()
    }

    #[test]
    fn failed_command_does_not_end_the_loop() {
        // Both associate attempts are answered with the wrong message kind;
        // the loop must report each failure and still reach the next command
        let (peer, answered) = spawn_script_responder(vec![
            PfcpMessage::HeartbeatResponse(HeartbeatResponse::new(1)),
            PfcpMessage::HeartbeatResponse(HeartbeatResponse::new(1)),
        ]);
        let path = test_path(peer);
        let ctx = SmfContext::new(Ipv4Addr::LOCALHOST, 1);

        let script = std::env::temp_dir().join(format!("mock-smfd-{}-loop.txt", std::process::id()));
        std::fs::write(&script, "associate\nassociate\nstop\n").unwrap();
        let mut source = CommandSource::File {
            file: File::open(&script).unwrap(),
            position: 0,
        };

        command_loop(&ctx, &path, &mut source).unwrap();
        std::fs::remove_file(&script).ok();

        assert_eq!(answered.load(Ordering::SeqCst), 2);
        assert!(ctx.is_terminating());
        // Neither exchange succeeded, so no association was established
        assert!(!ctx.is_established());
    }

    #[test]
    fn stop_tears_down_sessions_and_association_best_effort() {
        // First deletion is answered with the wrong kind and fails; the
        // second deletion and the association release must still go out
        let (peer, answered) = spawn_script_responder(vec![
            PfcpMessage::HeartbeatResponse(HeartbeatResponse::new(1)),
            PfcpMessage::SessionDeletionResponse(SessionDeletionResponse {
                cause: PfcpCause::RequestAccepted,
            }),
            PfcpMessage::AssociationReleaseResponse(AssociationReleaseResponse {
                node_id: NodeId::new_ipv4(Ipv4Addr::LOCALHOST),
                cause: PfcpCause::RequestAccepted,
            }),
        ]);
        let path = test_path(peer);
        let ctx = SmfContext::new(Ipv4Addr::LOCALHOST, 1);
        ctx.set_established(true);
        for our_seid in [1u64, 2] {
            ctx.register_session(our_seid).unwrap();
            ctx.with_session(our_seid, |session| {
                session.peer_seid = Some(our_seid + 100);
                Ok(())
            })
            .unwrap();
        }

        do_stop(&ctx, &path);

        assert_eq!(answered.load(Ordering::SeqCst), 3);
        assert!(!ctx.is_established());
        // The failed deletion left its session registered
        assert_eq!(ctx.session_seids(), vec![1]);
    }

    #[test]
    fn parses_bare_commands() {
        assert!(matches!(
            Command::try_parse_from(["associate"]).unwrap(),
            Command::Associate
        ));
        assert!(matches!(
            Command::try_parse_from(["stop"]).unwrap(),
            Command::Stop
        ));
    }

    #[test]
    fn parses_create_with_options() {
        let command = Command::try_parse_from([
            "create",
            "--session-count",
            "2",
            "--ue-pool",
            "10.0.0.0/24",
            "--buffer",
        ])
        .unwrap();
        match command {
            Command::Create(params) => {
                assert_eq!(params.session_count, 2);
                assert_eq!(params.ue_pool.to_string(), "10.0.0.0/24");
                assert!(params.buffer);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn create_defaults_match_the_documented_values() {
        let command = Command::try_parse_from(["create"]).unwrap();
        match command {
            Command::Create(params) => {
                assert_eq!(params.session_count, 1);
                assert_eq!(params.ue_pool.to_string(), "17.0.0.0/24");
                assert_eq!(params.s1u_addr, Ipv4Addr::new(140, 0, 100, 254));
                assert_eq!(params.enb_addr, Ipv4Addr::new(140, 0, 100, 1));
                assert_eq!(params.seid_base, 1);
                assert_eq!(params.teid_base, 255);
                assert_eq!(params.pdr_precedence, 2);
                assert!(!params.buffer);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_forced_modify() {
        let command = Command::try_parse_from(["modify", "--force"]).unwrap();
        match command {
            Command::Modify(params) => assert!(params.force),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_commands_and_options() {
        assert!(Command::try_parse_from(["reassociate"]).is_err());
        assert!(Command::try_parse_from(["create", "--ue-pool", "not-a-prefix"]).is_err());
    }

    #[test]
    fn resolves_literal_addresses_without_dns() {
        assert_eq!(
            resolve_upf_addr("140.0.100.254", 8805).unwrap(),
            Ipv4Addr::new(140, 0, 100, 254)
        );
    }
}
