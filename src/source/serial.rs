// SerialSource - pull-based sample acquisition from the rig's serial port
//
// The rig firmware prints one reading per line: 9 comma-separated integers
// (time, tx, rx1..rx7). The reader thread parses each line and hands it to
// the controller; malformed lines are skipped silently so a glitchy line
// never disturbs previously collected data.

use std::io::{BufRead, BufReader, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{log_source_error, SourceError};
use crate::run::RunController;
use crate::sample::Sample;
use crate::source::SampleSource;

/// Read timeout on the port; also bounds how quickly stop() takes effect.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Backoff after an unexpected read error before trying again.
const ERROR_BACKOFF: Duration = Duration::from_millis(500);

pub struct SerialSource {
    port_path: String,
    baud_rate: u32,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SerialSource {
    pub fn new(port_path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_path: port_path.into(),
            baud_rate,
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    fn read_loop(
        running: Arc<AtomicBool>,
        port: Box<dyn serialport::SerialPort>,
        controller: Arc<RunController>,
    ) {
        let mut reader = BufReader::new(port);
        let mut line = String::new();

        while running.load(Ordering::SeqCst) {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    // Port yielded EOF; give the device a moment
                    std::thread::sleep(ERROR_BACKOFF);
                }
                Ok(_) => match Sample::parse_line(&line) {
                    Some(sample) => {
                        controller.ingest(sample);
                    }
                    None => {
                        log::debug!("Skipping malformed serial line: {:?}", line.trim_end());
                    }
                },
                Err(err) if err.kind() == ErrorKind::TimedOut => {
                    // Idle port; loop around to re-check the running flag
                }
                Err(err) => {
                    log::warn!("Serial read error: {}", err);
                    std::thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        log::info!("Serial reader stopped");
    }
}

impl SampleSource for SerialSource {
    fn start(&self, controller: Arc<RunController>) -> Result<(), SourceError> {
        if self.running.swap(true, Ordering::SeqCst) {
            let err = SourceError::AlreadyRunning;
            log_source_error(&err, "serial_start");
            return Err(err);
        }

        let port = serialport::new(&self.port_path, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|err| {
                self.running.store(false, Ordering::SeqCst);
                let err = SourceError::OpenFailed {
                    port: self.port_path.clone(),
                    details: err.to_string(),
                };
                log_source_error(&err, "serial_start");
                err
            })?;

        log::info!(
            "Serial reader started on {} at {} baud",
            self.port_path,
            self.baud_rate
        );

        let running = Arc::clone(&self.running);
        let handle = std::thread::spawn(move || Self::read_loop(running, port, controller));

        if let Ok(mut worker) = self.worker.lock() {
            *worker = Some(handle);
        }

        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Ok(mut worker) = self.worker.lock() {
            if let Some(handle) = worker.take() {
                let _ = handle.join();
            }
        }
    }
}
