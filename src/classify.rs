// Classification of touch-phase readings against a configured threshold
//
// The classifier reduces a run's touch-phase samples to a single peak (the
// maximum RX value across all samples and all 7 channels), appends it to the
// run's peak history, and labels the object:
//
// - SoftHard compares the MEAN of the peak history against the threshold,
//   smoothing across repeated touch phases.
// - FreshRotten compares the current peak alone.
//
// Both comparisons are strict (`> threshold`). Classification is invoked
// exactly once per run, at finalization.

use crate::error::ClassifyError;
use crate::sample::Sample;

/// Label produced when a run finalizes without any touch-phase samples.
pub const NO_TOUCH_DATA_LABEL: &str = "No Touch Data Collected";

/// Classification mode selected at run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    SoftHard,
    FreshRotten,
}

impl Mode {
    /// Human-readable name used in labels and plot captions.
    pub fn display_name(&self) -> &'static str {
        match self {
            Mode::SoftHard => "Soft/Hard",
            Mode::FreshRotten => "Fresh/Rotten",
        }
    }

    /// Wire name used by the HTTP API.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Mode::SoftHard => "soft_hard",
            Mode::FreshRotten => "fresh_rotten",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "soft_hard" => Some(Mode::SoftHard),
            "fresh_rotten" => Some(Mode::FreshRotten),
            _ => None,
        }
    }

    /// Default threshold applied when the start request omits one.
    pub fn default_threshold(&self) -> f64 {
        match self {
            Mode::SoftHard => 350.0,
            Mode::FreshRotten => 750.0,
        }
    }
}

/// Result of classifying one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    /// Mean of the peak history; only produced in SoftHard mode.
    pub average_peak: Option<f64>,
}

/// Classify the touch-phase samples of a run.
///
/// Empty `touch_samples` yields [NO_TOUCH_DATA_LABEL] and leaves
/// `peak_history` untouched. Otherwise the global peak is appended to
/// `peak_history` and the label is computed per mode. Internal faults never
/// escape: they are logged and reported as an error label, which counts as a
/// resolved terminal state for the run.
pub fn classify(
    mode: Mode,
    touch_samples: &[Sample],
    threshold: f64,
    peak_history: &mut Vec<f64>,
) -> Classification {
    if touch_samples.is_empty() {
        return Classification {
            label: NO_TOUCH_DATA_LABEL.to_string(),
            average_peak: None,
        };
    }

    match classify_inner(mode, touch_samples, threshold, peak_history) {
        Ok(classification) => classification,
        Err(err) => {
            log::error!("{} classification failed: {}", mode.display_name(), err);
            Classification {
                label: format!("Error in {} Classification", mode.display_name()),
                average_peak: None,
            }
        }
    }
}

fn classify_inner(
    mode: Mode,
    touch_samples: &[Sample],
    threshold: f64,
    peak_history: &mut Vec<f64>,
) -> Result<Classification, ClassifyError> {
    let peak = global_peak(touch_samples);
    if !peak.is_finite() {
        return Err(ClassifyError::NonFiniteData {
            value: peak,
            context: "touch-phase peak".to_string(),
        });
    }

    peak_history.push(peak);

    match mode {
        Mode::SoftHard => {
            let average = mean(peak_history);
            if !average.is_finite() {
                return Err(ClassifyError::NonFiniteData {
                    value: average,
                    context: "peak history mean".to_string(),
                });
            }
            let label = if average > threshold { "Hard" } else { "Soft" };
            Ok(Classification {
                label: label.to_string(),
                average_peak: Some(average),
            })
        }
        Mode::FreshRotten => {
            let label = if peak > threshold { "Fresh" } else { "Rotten" };
            Ok(Classification {
                label: label.to_string(),
                average_peak: None,
            })
        }
    }
}

/// Maximum RX reading across all samples and all channels: a single scalar,
/// not a per-channel vector.
fn global_peak(samples: &[Sample]) -> f64 {
    samples
        .iter()
        .map(Sample::max_rx)
        .fold(f64::NEG_INFINITY, f64::max)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::RX_CHANNELS;

    /// Sample whose peak RX value is `peak`.
    fn sample_with_peak(peak: f64) -> Sample {
        let mut rx = [0.0; RX_CHANNELS];
        rx[3] = peak;
        Sample::new(0.0, 1.0, rx)
    }

    #[test]
    fn test_empty_touch_data() {
        let mut history = Vec::new();
        let result = classify(Mode::SoftHard, &[], 350.0, &mut history);

        assert_eq!(result.label, NO_TOUCH_DATA_LABEL);
        assert_eq!(result.average_peak, None);
        assert!(history.is_empty());
    }

    #[test]
    fn test_soft_hard_averages_peak_history() {
        // Peak 300 from an earlier cycle already in history; this run's touch
        // phase peaks at 400. Mean is 350.0, which is NOT strictly above the
        // threshold, so the object reads as Soft.
        let mut history = vec![300.0];
        let result = classify(
            Mode::SoftHard,
            &[sample_with_peak(150.0), sample_with_peak(400.0)],
            350.0,
            &mut history,
        );

        assert_eq!(history, vec![300.0, 400.0]);
        assert_eq!(result.average_peak, Some(350.0));
        assert_eq!(result.label, "Soft");
    }

    #[test]
    fn test_soft_hard_strictly_above_threshold_is_hard() {
        let mut history = Vec::new();
        let result = classify(Mode::SoftHard, &[sample_with_peak(351.0)], 350.0, &mut history);

        assert_eq!(result.average_peak, Some(351.0));
        assert_eq!(result.label, "Hard");
    }

    #[test]
    fn test_fresh_rotten_uses_current_peak_not_average() {
        let mut history = vec![100.0];
        let result = classify(Mode::FreshRotten, &[sample_with_peak(751.0)], 750.0, &mut history);

        assert_eq!(result.label, "Fresh");
        assert_eq!(result.average_peak, None);
        assert_eq!(history, vec![100.0, 751.0]);
    }

    #[test]
    fn test_fresh_rotten_boundary_is_rotten() {
        let mut history = Vec::new();
        let result = classify(Mode::FreshRotten, &[sample_with_peak(750.0)], 750.0, &mut history);

        assert_eq!(result.label, "Rotten");
    }

    #[test]
    fn test_degenerate_all_zero_samples_classify_normally() {
        let mut history = Vec::new();
        let result = classify(
            Mode::FreshRotten,
            &[Sample::new(0.0, 0.0, [0.0; RX_CHANNELS])],
            750.0,
            &mut history,
        );

        assert_eq!(result.label, "Rotten");
        assert_eq!(history, vec![0.0]);
    }

    #[test]
    fn test_peak_is_global_max_across_samples_and_channels() {
        let mut rx_a = [10.0; RX_CHANNELS];
        rx_a[0] = 600.0;
        let mut rx_b = [20.0; RX_CHANNELS];
        rx_b[6] = 800.0;

        let samples = [Sample::new(0.0, 1.0, rx_a), Sample::new(1.0, 1.0, rx_b)];
        let mut history = Vec::new();
        let result = classify(Mode::FreshRotten, &samples, 750.0, &mut history);

        assert_eq!(history, vec![800.0]);
        assert_eq!(result.label, "Fresh");
    }

    #[test]
    fn test_non_finite_data_becomes_error_label() {
        let mut history = Vec::new();
        let result = classify(
            Mode::SoftHard,
            &[sample_with_peak(f64::INFINITY)],
            350.0,
            &mut history,
        );

        assert_eq!(result.label, "Error in Soft/Hard Classification");
        assert_eq!(result.average_peak, None);
    }

    #[test]
    fn test_mode_wire_names_round_trip() {
        assert_eq!(Mode::from_wire("soft_hard"), Some(Mode::SoftHard));
        assert_eq!(Mode::from_wire("fresh_rotten"), Some(Mode::FreshRotten));
        assert_eq!(Mode::from_wire("fruit_freshness"), None);
        assert_eq!(Mode::SoftHard.wire_name(), "soft_hard");
        assert_eq!(Mode::FreshRotten.wire_name(), "fresh_rotten");
    }
}
