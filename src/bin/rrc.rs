//! `rrc`: the operator-facing daemon binary (§6, §6.1).
//!
//! ```text
//! rrc --node-id <u8> --config <path> [dump-state]
//! ```
//!
//! Exit codes: 0 clean, 2 configuration error, 3 IPC startup failure, 4
//! unrecoverable invariant violation (a caught panic in the tick loop).

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration as StdDuration;

use clap::{Parser, Subcommand};

use rrc_core::config::Config;
use rrc_core::core::RrcCore;
use rrc_core::ipc::{l2, l3, l7, phy, Coupling};
use rrc_core::time::SystemTimer;
use rrc_core::voice::VoiceEvent;

#[derive(Parser, Debug)]
#[command(name = "rrc", about = "Radio Resource Control daemon for a tactical MANET radio")]
struct Cli {
    /// This node's id on the network.
    #[arg(long)]
    node_id: u8,

    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a JSON snapshot of queue/tracker/sync/voice/NC state and exit.
    DumpState,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            log::error!("configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    config.node_id = cli.node_id;

    let (l7_out_tx, l7_out_rx) = mpsc::channel::<l7::Outbound>();
    let (l7_in_tx, l7_in_rx) = mpsc::channel::<l7::Inbound>();
    let (l3_out_tx, l3_out_rx) = mpsc::channel::<l3::Outbound>();
    let (l3_in_tx, l3_in_rx) = mpsc::channel::<l3::Inbound>();
    let (l2_out_tx, l2_out_rx) = mpsc::channel::<l2::Outbound>();
    let (l2_in_tx, l2_in_rx) = mpsc::channel::<l2::Inbound>();
    let (phy_tx, phy_rx) = mpsc::channel::<phy::Inbound>();

    // In this hosted build the peer subsystems (L3/L2/PHY) are external
    // processes reached over some transport not modeled here; dropping the
    // sender/receiver halves we don't own yet would make every send/recv
    // fail immediately, so the other ends are deliberately leaked onto a
    // background thread that does nothing but keep the channels alive. The
    // L7 inbound sender is the exception: the handset's PTT/CC control
    // input is read from stdin by `spawn_voice_control_reader` below.
    thread::spawn(move || {
        let _keepalive = (l7_out_rx, l3_out_rx, l2_out_rx, l3_in_tx, l2_in_tx, phy_tx);
        thread::park();
    });
    spawn_voice_control_reader(l7_in_tx);

    let l7 = Coupling::new(l7_out_tx, l7_in_rx);
    let l3 = Coupling::new(l3_out_tx, l3_in_rx);
    let l2 = Coupling::new(l2_out_tx, l2_in_rx);

    let mut core = RrcCore::new(config, SystemTimer::new(), l7, l3, l2, phy_rx);

    match cli.command {
        Some(Command::DumpState) => {
            let snapshot = core.snapshot();
            match serde_json::to_string_pretty(&snapshot) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::from(0)
                }
                Err(err) => {
                    log::error!("failed to serialize state snapshot: {err}");
                    ExitCode::from(4)
                }
            }
        }
        None => run_tick_loop(&mut core),
    }
}

/// Reads line-delimited PTT/CC control words from stdin and forwards them
/// to the tick loop as `l7::Inbound::VoiceEvent`s (§4.5). Each line is one
/// of: `ptt-press`, `ptt-release`, `contention-succeeded`,
/// `contention-failed`, `cc-received`, `end-call`.
fn spawn_voice_control_reader(l7_in_tx: Sender<l7::Inbound>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log::warn!("voice control stdin read error: {err}");
                    continue;
                }
            };
            let event = match line.trim() {
                "ptt-press" => VoiceEvent::PttPress,
                "ptt-release" => VoiceEvent::PttRelease,
                "contention-succeeded" => VoiceEvent::ContentionSucceeded,
                "contention-failed" => VoiceEvent::ContentionFailed,
                "cc-received" => VoiceEvent::CcReceived,
                "end-call" => VoiceEvent::EndCall,
                "" => continue,
                other => {
                    log::warn!("ignoring unrecognized voice control word: {other:?}");
                    continue;
                }
            };
            if l7_in_tx.send(l7::Inbound::VoiceEvent(event)).is_err() {
                log::warn!("voice control reader: RRC tick loop is gone, exiting");
                return;
            }
        }
    });
}

fn run_tick_loop(core: &mut RrcCore<SystemTimer>) -> ExitCode {
    core.ensure_nc_slot();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| loop {
        core.tick();
        thread::sleep(StdDuration::from_millis(u64::from(rrc_core::time::SLOT_DURATION_MS)));
    }));

    match result {
        Ok(()) => ExitCode::from(0),
        Err(_) => {
            log::error!("tick loop panicked; exiting with invariant-violation status");
            ExitCode::from(4)
        }
    }
}
