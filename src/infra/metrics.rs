// ============================================================
// Layer 6 — File Telemetry Sink
// ============================================================
// Monitoring records for a training run, all under one folder:
//
//   runs/
//     metrics.csv          ← step,name,value (appended per scalar)
//     samples/             ← PNG triple per snapshot row
//       iter_10000_0_content.png
//       iter_10000_0_style.png
//       iter_10000_0_result.png
//     results_table.csv    ← iter,content,style,result (written once on flush)
//
// Example metrics.csv:
//   step,name,value
//   1,loss,41.523110
//   2,loss,40.982004
//
// Both files go through the csv writer, so a run folder whose
// path contains a comma or a quote still reads back field for field.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use crate::domain::error::StyleError;
use crate::domain::traits::{SampleRow, TelemetrySink};
use crate::infra::image_io::save_sample;

/// Rejects any step that is not greater than the previous one
/// recorded under the same name.
#[derive(Debug, Default)]
pub struct StepGuard {
    last: HashMap<String, usize>,
}

impl StepGuard {
    pub fn check(&mut self, name: &str, step: usize) -> Result<(), StyleError> {
        if let Some(&previous) = self.last.get(name) {
            if step <= previous {
                return Err(StyleError::NonIncreasingStep {
                    name: name.to_string(),
                    step,
                    previous,
                });
            }
        }
        self.last.insert(name.to_string(), step);
        Ok(())
    }
}

/// One results-table row once its images are on disk
#[derive(Debug, Clone)]
struct TableRow {
    iteration: usize,
    content:   PathBuf,
    style:     PathBuf,
    result:    PathBuf,
}

pub struct FileTelemetry {
    dir:         PathBuf,
    csv_path:    PathBuf,
    steps:       StepGuard,
    table:       Vec<TableRow>,
    row_counter: HashMap<usize, usize>,
    flushed:     bool,
}

impl FileTelemetry {
    /// Create the run folder and write the metrics CSV header
    /// if the file is new.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(dir.join("samples"))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut w = csv::Writer::from_path(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            w.write_record(["step", "name", "value"])?;
            w.flush()?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self {
            dir,
            csv_path,
            steps: StepGuard::default(),
            table: Vec::new(),
            row_counter: HashMap::new(),
            flushed: false,
        })
    }

    pub fn csv_path(&self) -> &PathBuf { &self.csv_path }

    pub fn table_path(&self) -> PathBuf { self.dir.join("results_table.csv") }
}

fn field(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl TelemetrySink for FileTelemetry {
    fn log_scalar(&mut self, name: &str, value: f64, step: usize) -> Result<()> {
        self.steps.check(name, step)?;
        let file = OpenOptions::new().append(true).open(&self.csv_path)?;
        let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        w.write_record([step.to_string(), name.to_string(), format!("{value:.6}")])?;
        w.flush()?;
        Ok(())
    }

    fn log_sample(&mut self, row: SampleRow) -> Result<()> {
        let index = self.row_counter.entry(row.iteration).or_insert(0);
        let stem  = format!("iter_{}_{}", row.iteration, index);
        *index += 1;

        let samples = self.dir.join("samples");
        let content = samples.join(format!("{stem}_content.png"));
        let style   = samples.join(format!("{stem}_style.png"));
        let result  = samples.join(format!("{stem}_result.png"));
        save_sample(&row.content, &content)?;
        save_sample(&row.style, &style)?;
        save_sample(&row.result, &result)?;

        self.table.push(TableRow { iteration: row.iteration, content, style, result });
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.flushed {
            tracing::warn!("Telemetry already flushed; ignoring repeated flush");
            return Ok(());
        }
        let mut w = csv::Writer::from_path(self.table_path())?;
        w.write_record(["iter", "content", "style", "result"])?;
        for r in &self.table {
            w.write_record([
                r.iteration.to_string(),
                field(&r.content),
                field(&r.style),
                field(&r.result),
            ])?;
        }
        w.flush()?;
        self.flushed = true;
        tracing::info!("Results table with {} rows written to '{}'", self.table.len(), self.table_path().display());
        Ok(())
    }
}
