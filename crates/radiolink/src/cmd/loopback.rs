use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use radiolink_frame::TRANSMIT;
use radiolink_session::{Session, SessionConfig, SessionHandle};
use radiolink_transport::{EdgeLine, LoopbackBus, RecordingPin};
use tracing::{info, warn};

use crate::cmd::{LoopbackArgs, Outgoing};
use crate::exit::{session_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_records, OutputFormat, PacketRecord};

type Received = Arc<Mutex<Vec<PacketRecord>>>;

pub fn run(args: LoopbackArgs, format: OutputFormat, config: &SessionConfig) -> CliResult<i32> {
    if args.sends.is_empty() && !args.request_rssi {
        return Err(CliError::usage("nothing to do: pass --send or --request-rssi"));
    }

    let mut bus = LoopbackBus::new();
    if let Some(rssi) = args.rssi {
        bus = bus.with_rssi(rssi);
    }
    bus.set_rssi_command(config.rssi_command);

    let mut session = Session::with_config(bus.clone(), RecordingPin::new(), config.clone());
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    session.on_message_buffer(move |payload, received_at| {
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PacketRecord::new(TRANSMIT, payload, Some(received_at)));
    });
    session.on_rssi(|rssi| info!(rssi, "rssi sample"));
    session.init().map_err(|err| session_error("init failed", err))?;
    bus.fail_next(args.fail_next);

    let handle = SessionHandle::new(session);
    let mut line = EdgeLine::new();
    handle.attach(&mut line);

    let running = Arc::new(AtomicBool::new(true));
    if args.rounds == 0 {
        install_ctrlc_handler(running.clone())?;
    }

    let mut round = 0u64;
    while running.load(Ordering::SeqCst) && (args.rounds == 0 || round < args.rounds) {
        if round > 0 {
            thread::sleep(Duration::from_millis(args.interval_ms));
        }
        run_round(&handle, &bus, &line, &args);
        let batch = std::mem::take(&mut *received.lock().unwrap_or_else(PoisonError::into_inner));
        print_records(&batch, format);
        round += 1;
    }

    let stats = handle.lock().stats();
    info!(
        rounds = round,
        tx_serial = stats.tx_serial,
        rx_frames = stats.rx_frames,
        errors = stats.errors,
        "loopback finished"
    );
    if stats.errors > 0 {
        let last_error = handle.lock().last_error();
        eprintln!("{} operation(s) failed; last error: {last_error}", stats.errors);
        return Ok(FAILURE);
    }
    Ok(SUCCESS)
}

fn run_round(
    handle: &SessionHandle<LoopbackBus, RecordingPin>,
    bus: &LoopbackBus,
    line: &EdgeLine,
    args: &LoopbackArgs,
) {
    {
        let mut session = handle.lock();
        for message in &args.sends {
            // Failures are latched and counted by the session.
            let _ = send(&mut session, message);
        }
        if args.request_rssi {
            if let Ok(None) = session.request_rssi() {
                warn!("radio did not answer the rssi request");
            }
        }
    }

    // One edge per pending frame, as the radio would raise them.
    while bus.pending() > 0 {
        line.pulse();
    }
}

fn send(
    session: &mut Session<LoopbackBus, RecordingPin>,
    message: &Outgoing,
) -> radiolink_session::Result<()> {
    match message {
        Outgoing::Raw(text) => session.send_raw(text),
        Outgoing::Number(value) => session.send_number(*value),
        Outgoing::String(text) => session.send_string(text),
        Outgoing::Value(name, value) => session.send_value(name, *value),
        Outgoing::Buffer(data) => session.send_buffer(data),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
