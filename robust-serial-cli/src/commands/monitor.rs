//! Serial monitor command implementation.
//!
//! - Reader thread: serial → bounded queue
//! - Main thread: queue → stdout
//! - Ctrl+C: pending chunks are discarded, the reader stops and the port is
//!   closed
//! - Read error: pending chunks are written out first

use std::{
    io::{self, Read, Write},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use console::style;
use log::{debug, info};
use robust_serial::{ClearableQueue, PortResolver, ReadMode};

use crate::config::Settings;

/// Chunks buffered between the reader and stdout.
const QUEUE_DEPTH: usize = 64;

/// Bytes requested per read.
const READ_CHUNK: usize = 1024;

/// How often both threads re-check the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause after a read that returned nothing in non-blocking mode.
const IDLE_BACKOFF: Duration = Duration::from_millis(5);

type ChunkQueue = ClearableQueue<Vec<u8>>;

/// Run the serial monitor until Ctrl+C or a read error.
pub(crate) fn cmd_monitor(quiet: bool, settings: &Settings) -> Result<()> {
    let resolver = PortResolver::native();
    let port = resolver.open(settings.port.as_ref(), &settings.connection)?;
    let name = port.name().clone();
    let read_mode = port.read_mode();

    if !quiet {
        eprintln!(
            "{} Monitoring {} at {} baud",
            style("📡").cyan(),
            style(&name).green(),
            port.baud_rate()
        );
        eprintln!("{}", style("Press Ctrl+C to exit").dim());
    }

    let running = Arc::new(AtomicBool::new(true));
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let running = Arc::clone(&running);
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || {
            interrupted.store(true, Ordering::SeqCst);
            running.store(false, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl+C handler")?;
    }

    let queue: Arc<ChunkQueue> = Arc::new(ClearableQueue::bounded(QUEUE_DEPTH));
    let reader = spawn_reader(port, Arc::clone(&queue), Arc::clone(&running));

    let mut stdout = io::stdout().lock();
    let mut forwarded = forward(&queue, &running, &mut stdout);
    running.store(false, Ordering::SeqCst);

    // Only Ctrl+C discards output. A reader that failed queued its last
    // bytes before stopping.
    if forwarded.is_ok() && !interrupted.load(Ordering::SeqCst) {
        forwarded = flush_pending(&queue, &mut stdout);
    }
    drop(stdout);

    let discarded = queue.clear()?;
    if interrupted.load(Ordering::SeqCst) {
        info!("Interrupted, discarded {discarded} pending chunk(s)");
    } else if discarded > 0 {
        debug!("Discarded {discarded} pending chunk(s)");
    }

    // A blocking read only returns when data arrives, so the reader may
    // still be parked inside it. Its handle goes away with the process.
    if read_mode == ReadMode::Blocking && !reader.is_finished() {
        debug!("Reader for {name} still blocked in read, leaving it behind");
        return forwarded;
    }

    let (port, read_result) = reader
        .join()
        .map_err(|_| anyhow!("Serial reader thread panicked"))?;
    resolver.close(port)?;

    forwarded?;
    read_result.with_context(|| format!("Failed to read from {name}"))?;
    Ok(())
}

/// Move everything read from `port` into `queue` until `running` clears or
/// a read fails. Hands the port back with the outcome.
fn spawn_reader<R>(
    mut port: R,
    queue: Arc<ChunkQueue>,
    running: Arc<AtomicBool>,
) -> JoinHandle<(R, io::Result<()>)>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; READ_CHUNK];
        while running.load(Ordering::SeqCst) {
            match port.read(&mut buf) {
                Ok(0) => thread::sleep(IDLE_BACKOFF),
                Ok(n) => {
                    let mut chunk = buf[..n].to_vec();
                    while let Err(rejected) = queue.put_timeout(chunk, POLL_INTERVAL) {
                        if !running.load(Ordering::SeqCst) {
                            return (port, Ok(()));
                        }
                        chunk = rejected;
                    }
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(IDLE_BACKOFF),
                Err(e) if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {},
                Err(e) => {
                    running.store(false, Ordering::SeqCst);
                    return (port, Err(e));
                },
            }
        }
        (port, Ok(()))
    })
}

/// Copy queued chunks to `out` while `running` is set.
fn forward(queue: &ChunkQueue, running: &AtomicBool, out: &mut dyn Write) -> Result<()> {
    while running.load(Ordering::SeqCst) {
        if let Some(chunk) = queue.get_timeout(POLL_INTERVAL) {
            write_chunk(queue, &chunk, out)?;
        }
    }
    Ok(())
}

/// Write out everything still queued without waiting for more.
fn flush_pending(queue: &ChunkQueue, out: &mut dyn Write) -> Result<()> {
    while let Some(chunk) = queue.try_get() {
        write_chunk(queue, &chunk, out)?;
    }
    Ok(())
}

fn write_chunk(queue: &ChunkQueue, chunk: &[u8], out: &mut dyn Write) -> Result<()> {
    let written = out.write_all(chunk).and_then(|()| out.flush());
    queue.task_done()?;
    written.context("Failed to write to stdout")
}
