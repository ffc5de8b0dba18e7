//! The batch driver.
//!
//! Provisions the model, then walks the manifest row by row: load the selected
//! channels, run the model, rank the classes, log the result and, in CSV mode,
//! append a row to the result table. The first failing row stops the batch and
//! no table is written.

use super::manifest::{ManifestReader, ManifestRow};
use super::results::{ResultTable, TableSchema};
use crate::core::{RunConfig, SubCellResult};
use crate::models::provision::provision;
use crate::models::{ArtifactFetcher, CellModel, ModelConfig, ModelPaths, OrtCellModel};
use crate::processors::{ClassRanker, ClassRanking};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Counters for a finished batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    /// Number of image sets processed.
    pub processed: usize,
    /// Total time spent loading images and running the model.
    pub elapsed: Duration,
    /// The result table, if one was written.
    pub result_csv: Option<PathBuf>,
}

impl BatchStats {
    /// Average time per processed image set, in milliseconds.
    pub fn average_ms(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.elapsed.as_secs_f64() * 1000.0 / self.processed as f64
        }
    }
}

/// Formats the per-row log line.
pub fn result_line(name: &str, ranking: &ClassRanking) -> String {
    format!(
        "- Saved results for {}, locations predicted [{}]",
        name,
        ranking.joined_names()
    )
}

/// Runs a loaded model over the rows of a manifest.
pub struct BatchRunner<'a, M> {
    config: &'a RunConfig,
    model: M,
    ranker: ClassRanker,
    table: Option<ResultTable>,
    stats: BatchStats,
}

impl<'a, M: CellModel> BatchRunner<'a, M> {
    pub fn new(config: &'a RunConfig, model: M, ranker: ClassRanker) -> Self {
        let table = config
            .create_csv
            .then(|| ResultTable::new(TableSchema::default()));
        Self {
            config,
            model,
            ranker,
            table,
            stats: BatchStats::default(),
        }
    }

    /// Processes one image set.
    pub fn process_row(&mut self, row: &ManifestRow) -> SubCellResult<ClassRanking> {
        let started = Instant::now();
        row.ensure_out_dir()?;
        let channels = row.load_channels(&self.config.model_channels)?;
        let prediction = self.model.run(&channels, &row.output_stem())?;
        let ranking = self.ranker.rank(&prediction.probabilities)?;

        info!("{}", result_line(&row.out_name, &ranking));
        if let Some(table) = self.table.as_mut() {
            table.push(&row.out_name, &ranking, &prediction)?;
        }

        let elapsed = started.elapsed();
        debug!(line = row.line, ?elapsed, "row processed");
        self.stats.processed += 1;
        self.stats.elapsed += elapsed;
        Ok(ranking)
    }

    /// Processes every row, then writes the result table in CSV mode.
    pub fn run<R: BufRead>(mut self, manifest: ManifestReader<R>) -> SubCellResult<BatchStats> {
        for row in manifest {
            self.process_row(&row?)?;
        }
        if let Some(table) = &self.table {
            table.write_csv(&self.config.result_csv)?;
            info!(
                "- Wrote {} rows to {}",
                table.len(),
                self.config.result_csv.display()
            );
            self.stats.result_csv = Some(self.config.result_csv.clone());
        }
        debug!(
            processed = self.stats.processed,
            average_ms = self.stats.average_ms(),
            "batch finished"
        );
        Ok(self.stats)
    }
}

/// Runs the whole batch for `config`.
///
/// `load` builds the model from the provisioned directory and its parsed
/// configuration.
pub fn run_batch_with<M, F>(
    config: &RunConfig,
    fetcher: &dyn ArtifactFetcher,
    load: F,
) -> SubCellResult<BatchStats>
where
    M: CellModel,
    F: FnOnce(&ModelConfig, &ModelPaths) -> SubCellResult<M>,
{
    let (paths, outcome) = provision(config, fetcher)?;
    debug!(?outcome, dir = %paths.dir.display(), "model provisioned");

    let model_config = ModelConfig::from_file(&paths.model_config)?;
    let ranker = model_config.class_ranker()?;
    let model = load(&model_config, &paths)?;

    let Some(manifest) = ManifestReader::open(&config.path_list)? else {
        warn!(
            "- {} not found, no image sets to process.",
            config.path_list.display()
        );
        return Ok(BatchStats::default());
    };

    BatchRunner::new(config, model, ranker).run(manifest)
}

/// Runs the whole batch with the ONNX Runtime model.
pub fn run_batch(config: &RunConfig, fetcher: &dyn ArtifactFetcher) -> SubCellResult<BatchStats> {
    run_batch_with(config, fetcher, |model_config, paths| {
        OrtCellModel::load(model_config, &paths.encoder, &paths.classifier)
    })
}

/// Logs the outcome of a batch. A failure becomes a single `- <message>` error
/// line carrying the whole source chain.
pub fn report_outcome(outcome: SubCellResult<BatchStats>) -> Option<BatchStats> {
    match outcome {
        Ok(stats) => Some(stats),
        Err(e) => {
            error!("- {}", e.chain_message());
            None
        }
    }
}
