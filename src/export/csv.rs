// CSV export of one sample view
//
// Columns: Time, TX, RX1..RX7, NewTime. NewTime is the device timestamp
// rebased to the first sample of the view. An empty view produces an empty
// file (the download endpoints still serve it), matching the rig's
// long-standing file contract.

use std::fs::File;
use std::path::Path;

use crate::error::ExportError;
use crate::sample::{Sample, RX_CHANNELS};

pub(crate) fn write_csv(path: &Path, samples: &[Sample]) -> Result<(), ExportError> {
    if samples.is_empty() {
        File::create(path).map_err(|err| ExportError::Io {
            path: path.display().to_string(),
            details: err.to_string(),
        })?;
        return Ok(());
    }

    let mut writer = csv::Writer::from_path(path).map_err(|err| ExportError::Csv {
        path: path.display().to_string(),
        details: err.to_string(),
    })?;

    writer
        .write_record(header())
        .map_err(|err| ExportError::Csv {
            path: path.display().to_string(),
            details: err.to_string(),
        })?;

    let base = samples[0].timestamp_ms;
    for sample in samples {
        let mut record = Vec::with_capacity(3 + RX_CHANNELS);
        record.push(sample.timestamp_ms.to_string());
        record.push(sample.tx.to_string());
        for value in &sample.rx {
            record.push(value.to_string());
        }
        record.push((sample.timestamp_ms - base).to_string());

        writer.write_record(&record).map_err(|err| ExportError::Csv {
            path: path.display().to_string(),
            details: err.to_string(),
        })?;
    }

    writer.flush().map_err(|err| ExportError::Io {
        path: path.display().to_string(),
        details: err.to_string(),
    })
}

fn header() -> Vec<String> {
    let mut columns = vec!["Time".to_string(), "TX".to_string()];
    for channel in 1..=RX_CHANNELS {
        columns.push(format!("RX{}", channel));
    }
    columns.push("NewTime".to_string());
    columns
}
