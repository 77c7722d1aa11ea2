use anyhow::{Context, Result};
use log::info;
use segregation_common::{MetricsSnapshot, OutputConfig, OutputFormat};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes the metric time series in the configured encoding.
/// Returns the path of the file written.
pub fn save_snapshots(snapshots: &[MetricsSnapshot], output: &OutputConfig) -> Result<PathBuf> {
    let filename = PathBuf::from(format!("{}_metrics.{}", output.base_filename, output.format.extension()));
    write_snapshots(snapshots, output.format, &filename)?;
    Ok(filename)
}

pub fn write_snapshots(snapshots: &[MetricsSnapshot], format: OutputFormat, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut writer, snapshots)
                .context("Failed to serialize snapshots to JSON")?;
        }
        OutputFormat::Bincode => {
            bincode::serialize_into(&mut writer, snapshots)
                .context("Failed to serialize snapshots to bincode")?;
        }
        OutputFormat::MessagePack => {
            rmp_serde::encode::write(&mut writer, snapshots)
                .context("Failed to serialize snapshots to MessagePack")?;
        }
    }
    writer.flush()?;

    info!("{} snapshots saved to {} ({:?} format)", snapshots.len(), path.display(), format);
    Ok(())
}

/// Writes `step,agents,segregation,unhappiness` rows. Undefined ratios are
/// left as empty fields.
pub fn write_metrics_csv(snapshots: &[MetricsSnapshot], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file '{}'", path.display()))?;

    writer.write_record(["step", "agents", "segregation", "unhappiness"])?;
    for snapshot in snapshots {
        writer.write_record(&[
            snapshot.step.to_string(),
            snapshot.agent_count.to_string(),
            format_ratio(snapshot.segregation),
            format_ratio(snapshot.unhappiness),
        ])?;
    }
    writer.flush()?;

    info!("Metric series saved to {}", path.display());
    Ok(())
}

fn format_ratio(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}
