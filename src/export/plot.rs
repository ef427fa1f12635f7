// PNG line chart of all collected samples
//
// RX1..RX7 against NewTime (device timestamp rebased to the first sample),
// one line per channel, legend in the corner. The file is overwritten on
// every run.

use std::path::Path;

use plotters::prelude::*;

use crate::classify::Mode;
use crate::error::ExportError;
use crate::sample::{Sample, RX_CHANNELS};

const PLOT_SIZE: (u32, u32) = (1000, 600);

const CHANNEL_COLORS: [RGBColor; RX_CHANNELS] = [
    RED,
    BLUE,
    GREEN,
    MAGENTA,
    CYAN,
    BLACK,
    RGBColor(255, 140, 0),
];

pub(crate) fn render_plot(path: &Path, samples: &[Sample], mode: Mode) -> Result<(), ExportError> {
    if samples.is_empty() {
        return Ok(());
    }

    let plot_err = |details: String| ExportError::Plot {
        path: path.display().to_string(),
        details,
    };

    let base = samples[0].timestamp_ms;
    let x_max = samples
        .iter()
        .map(|s| s.timestamp_ms - base)
        .fold(0.0f64, f64::max)
        .max(1.0);

    let y_max = samples
        .iter()
        .flat_map(|s| s.rx.iter().copied())
        .fold(0.0f64, f64::max)
        .max(1.0);
    let y_min = samples
        .iter()
        .flat_map(|s| s.rx.iter().copied())
        .fold(f64::INFINITY, f64::min)
        .min(0.0);

    let path_str = path.display().to_string();
    let root = BitMapBackend::new(&path_str, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Sensor Data ({})", mode.display_name()),
            ("sans-serif", 22).into_font(),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max * 1.02, y_min..y_max * 1.05)
        .map_err(|e| plot_err(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Sensor Value")
        .draw()
        .map_err(|e| plot_err(e.to_string()))?;

    for channel in 0..RX_CHANNELS {
        let color = CHANNEL_COLORS[channel];
        chart
            .draw_series(LineSeries::new(
                samples
                    .iter()
                    .map(|s| (s.timestamp_ms - base, s.rx[channel])),
                &color,
            ))
            .map_err(|e| plot_err(e.to_string()))?
            .label(format!("RX{}", channel + 1))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], &color));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(|e| plot_err(e.to_string()))?;

    root.present().map_err(|e| plot_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_plot_writes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all_data_plot.png");

        let samples: Vec<Sample> = (0..20)
            .map(|i| {
                let mut rx = [0.0; RX_CHANNELS];
                for (c, slot) in rx.iter_mut().enumerate() {
                    *slot = (i * 10 + c as i32 * 5) as f64;
                }
                Sample::new(1000.0 + i as f64 * 50.0, 1.0, rx)
            })
            .collect();

        render_plot(&path, &samples, Mode::SoftHard).expect("render");

        let bytes = std::fs::read(&path).unwrap();
        // PNG magic number
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_render_plot_empty_is_noop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all_data_plot.png");

        render_plot(&path, &[], Mode::FreshRotten).expect("render");
        assert!(!path.exists());
    }

    #[test]
    fn test_render_plot_single_sample() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all_data_plot.png");

        let sample = Sample::new(500.0, 1.0, [5.0; RX_CHANNELS]);
        render_plot(&path, &[sample], Mode::FreshRotten).expect("render");
        assert!(path.exists());
    }
}
