use std::path::PathBuf;
use std::process::ExitCode;

use h2h_lib::{all_metrics, H2hError, H2hOutput, MetricInfo, MetricsOutput, H2H_OUTPUT_VERSION};

use crate::cli::OutputFormat;
use crate::formatting::{render_error, write_output};

/// Run the metrics command.
pub fn run_metrics(format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    let body = H2hOutput::Metrics(build_output());
    if let Err(err) = write_output(&body, format, output.clone()) {
        return render_error(H2hError::Config(err.to_string()), format, output);
    }
    ExitCode::SUCCESS
}

fn build_output() -> MetricsOutput {
    MetricsOutput {
        version: H2H_OUTPUT_VERSION.to_string(),
        metrics: all_metrics().iter().map(MetricInfo::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use h2h_lib::{MetricKey, Polarity};

    #[test]
    fn lists_every_metric_in_registry_order() {
        let out = build_output();
        let keys: Vec<MetricKey> = out.metrics.iter().map(|m| m.key).collect();
        assert_eq!(keys, MetricKey::ALL.to_vec());

        let dnfs = out.metrics.iter().find(|m| m.key == MetricKey::Dnfs).unwrap();
        assert_eq!(dnfs.polarity, Polarity::LowerIsBetter);
    }
}
