// Sample - one raw reading from the capacitive sensor rig
//
// The rig reports a device-clock timestamp, a TX drive value, and seven RX
// channel values per reading. Both acquisition paths (HTTP push and serial
// pull) normalize into this type before anything else touches the data;
// malformed input is rejected at that boundary and never stored.

use serde::{Deserialize, Serialize};

/// Number of RX channels reported by the rig per reading.
pub const RX_CHANNELS: usize = 7;

/// One sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Device-clock timestamp in milliseconds.
    pub timestamp_ms: f64,
    /// TX drive value.
    pub tx: f64,
    /// RX channel readings, always exactly [RX_CHANNELS] values.
    pub rx: [f64; RX_CHANNELS],
}

impl Sample {
    pub fn new(timestamp_ms: f64, tx: f64, rx: [f64; RX_CHANNELS]) -> Self {
        Self { timestamp_ms, tx, rx }
    }

    /// Maximum RX value across all channels of this reading.
    pub fn max_rx(&self) -> f64 {
        self.rx.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Parse one serial line of the form `time,tx,rx1,...,rx7`.
    ///
    /// The rig firmware emits exactly 9 comma-separated integers per line.
    /// Anything else (wrong field count, non-numeric fields, partial lines)
    /// returns `None`; the serial reader skips such lines without affecting
    /// previously collected data.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut values = [0i64; 2 + RX_CHANNELS];
        let mut count = 0;

        for field in line.trim().split(',') {
            if count >= values.len() {
                return None;
            }
            values[count] = field.trim().parse::<i64>().ok()?;
            count += 1;
        }

        if count != values.len() {
            return None;
        }

        let mut rx = [0.0; RX_CHANNELS];
        for (slot, value) in rx.iter_mut().zip(&values[2..]) {
            *slot = *value as f64;
        }

        Some(Self {
            timestamp_ms: values[0] as f64,
            tx: values[1] as f64,
            rx,
        })
    }
}
