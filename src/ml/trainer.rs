// ============================================================
// Layer 5 — Training Orchestrator
// ============================================================
// A fixed number of Adam iterations over two endless streams:
//
//   INIT ──▶ RUNNING ──(every K)──▶ SNAPSHOTTING ──▶ RUNNING ── … ──▶ DONE
//
// One RUNNING iteration, strictly in this order:
//   1. draw one content batch and one style batch
//   2. loss = model.forward(Ic, Is, Training)
//   3. log "loss" at step i+1
//   4. backward, Adam step
//
// SNAPSHOTTING (after iteration i+1 when (i+1) % K == 0):
//   1. save weights as checkpoint i+1
//   2. re-run the SAME Ic, Is in Evaluating mode on the inner
//      (gradient-free) backend and log every (content, style,
//      result) triple
//   3. learning rate ← schedule(i)
//
// DONE: telemetry is flushed once.
//
// The mode handed to forward() is derived from the state, and
// the state is back to RUNNING before the next iteration starts.

use anyhow::Result;
use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::{unbatch, ImageBatch, ImageBatcher};
use crate::domain::error::StyleError;
use crate::domain::mode::ExecutionMode;
use crate::domain::schedule::InverseDecay;
use crate::domain::traits::{ImageStream, LrSchedule, SampleRow, TelemetrySink};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::loss::StageLosses;
use crate::ml::model::{LossOutput, StyleNet, StyleNetConfig};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Loss families in the order StageLosses::values() reports them
const FAMILIES: [&str; 4] = ["content", "remd", "moment", "color"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Init,
    Running,
    Snapshotting,
    Done,
}

impl TrainerState {
    /// Mode every forward call in this state runs with
    pub fn mode(self) -> ExecutionMode {
        match self {
            TrainerState::Snapshotting => ExecutionMode::Evaluating,
            _ => ExecutionMode::Training,
        }
    }
}

/// True when iteration `iteration` (1-based) ends with a snapshot
pub fn is_snapshot_iteration(iteration: usize, interval: usize) -> bool {
    interval > 0 && iteration > 0 && iteration % interval == 0
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub iterations:        usize,
    pub batch_size:        usize,
    pub log_interval:      usize,
    pub progress_interval: usize,
}

impl From<&TrainConfig> for LoopSettings {
    fn from(cfg: &TrainConfig) -> Self {
        Self {
            iterations:        cfg.iterations,
            batch_size:        cfg.batch_size,
            log_interval:      cfg.log_interval,
            progress_interval: cfg.progress_interval,
        }
    }
}

/// The two endless input streams
pub struct Streams {
    pub content: Box<dyn ImageStream>,
    pub style:   Box<dyn ImageStream>,
}

#[derive(Debug, Clone, Copy)]
pub struct StepReport {
    /// 1-based number of the iteration just finished
    pub iteration: usize,
    pub loss:      f64,
    pub snapshot:  bool,
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub iterations:    usize,
    pub snapshots:     Vec<usize>,
    pub final_loss:    f64,
}

pub struct Orchestrator<'a, B, O, L, S>
where
    B: AutodiffBackend,
    O: Optimizer<StyleNet<B>, B>,
    L: LrSchedule,
    S: TelemetrySink,
{
    model:     StyleNet<B>,
    optim:     O,
    schedule:  L,
    lr:        f64,
    streams:   Streams,
    batcher:   ImageBatcher,
    device:    B::Device,
    ckpt:      &'a CheckpointManager,
    sink:      &'a mut S,
    settings:  LoopSettings,
    state:     TrainerState,
    iteration: usize,
    snapshots: Vec<usize>,
    last_loss: f64,
}

impl<'a, B, O, L, S> Orchestrator<'a, B, O, L, S>
where
    B: AutodiffBackend,
    O: Optimizer<StyleNet<B>, B>,
    L: LrSchedule,
    S: TelemetrySink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model:    StyleNet<B>,
        optim:    O,
        schedule: L,
        streams:  Streams,
        device:   B::Device,
        ckpt:     &'a CheckpointManager,
        sink:     &'a mut S,
        settings: LoopSettings,
    ) -> Result<Self> {
        if settings.batch_size == 0 {
            return Err(StyleError::InvalidBatchSize(0).into());
        }
        if settings.log_interval == 0 {
            return Err(StyleError::InvalidInterval { name: "log interval" }.into());
        }

        let lr = schedule.learning_rate(0);
        let mut this = Self {
            model,
            optim,
            schedule,
            lr,
            streams,
            batcher: ImageBatcher::new(),
            device,
            ckpt,
            sink,
            settings,
            state: TrainerState::Init,
            iteration: 0,
            snapshots: Vec::new(),
            last_loss: f64::NAN,
        };
        this.state = TrainerState::Running;
        Ok(this)
    }

    #[cfg(test)]
    pub fn state(&self) -> TrainerState { self.state }

    #[cfg(test)]
    pub fn iteration(&self) -> usize { self.iteration }

    #[cfg(test)]
    pub fn learning_rate(&self) -> f64 { self.lr }

    /// One full iteration, plus the snapshot when it falls due.
    pub fn step(&mut self) -> Result<StepReport> {
        debug_assert_eq!(self.state, TrainerState::Running);

        // 1. data; a loading error ends the run
        let content = self.streams.content.next_batch(self.settings.batch_size)?;
        let style   = self.streams.style.next_batch(self.settings.batch_size)?;
        let ic: ImageBatch<B> = self.batcher.batch(content, &self.device);
        let is: ImageBatch<B> = self.batcher.batch(style, &self.device);
        let (ic, is) = (ic?, is?);

        // 2. forward
        let LossOutput { total, stages } = self
            .model
            .forward(ic.clone(), is.clone(), self.state.mode())?
            .into_loss()?;
        let loss = total.sum();
        let value: f64 = loss.clone().into_scalar().elem::<f64>();
        if !value.is_finite() {
            return Err(StyleError::NonFiniteLoss { iteration: self.iteration, value }.into());
        }

        // 3. record
        let number = self.iteration + 1;
        self.sink.log_scalar("loss", value, number)?;
        self.log_stage_losses(&stages, number)?;

        // 4. backward + Adam
        let grads  = loss.backward();
        let grads  = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.lr, self.model.clone(), grads);

        if self.settings.progress_interval > 0 && number % self.settings.progress_interval == 0 {
            println!("{:>7}/{} | loss={:.4} | lr={:.3e}", number, self.settings.iterations, value, self.lr);
        }

        let snapshot = is_snapshot_iteration(number, self.settings.log_interval);
        if snapshot {
            self.snapshot(ic, is, number, value)?;
        }

        self.iteration = number;
        Ok(StepReport { iteration: number, loss: value, snapshot })
    }

    /// `loss_s{stage}_{family}` for every measured family, unweighted
    fn log_stage_losses(&mut self, stages: &[StageLosses<B>], number: usize) -> Result<()> {
        for (s, stage) in stages.iter().enumerate() {
            let values = stage.values();
            let measured = if stage.color.is_some() { FAMILIES.len() } else { FAMILIES.len() - 1 };
            for (family, value) in FAMILIES.iter().zip(values).take(measured) {
                self.sink.log_scalar(&format!("loss_s{}_{}", s + 1, family), value, number)?;
            }
        }
        Ok(())
    }

    fn snapshot(&mut self, ic: Tensor<B, 4>, is: Tensor<B, 4>, number: usize, loss: f64) -> Result<()> {
        self.state = TrainerState::Snapshotting;
        println!("saving...");
        tracing::info!("iteration: {} loss: {}", number, loss);
        let saved = self
            .ckpt
            .save_model(&self.model, number)
            .and_then(|_| self.log_eval_samples(ic, is, number));
        self.state = TrainerState::Running;
        saved?;

        // zero-based index of the triggering iteration
        self.lr = self.schedule.learning_rate(number - 1);
        self.sink.log_scalar("lr", self.lr, number)?;
        self.snapshots.push(number);
        Ok(())
    }

    fn log_eval_samples(&mut self, ic: Tensor<B, 4>, is: Tensor<B, 4>, number: usize) -> Result<()> {
        let model  = self.model.valid();
        let result = model
            .forward(ic.clone().inner(), is.clone().inner(), self.state.mode())?
            .into_stylized()?;

        let contents = unbatch(ic.inner())?;
        let styles   = unbatch(is.inner())?;
        let results  = unbatch(result)?;
        for ((content, style), result) in contents.into_iter().zip(styles).zip(results) {
            self.sink.log_sample(SampleRow { iteration: number, content, style, result })?;
        }
        Ok(())
    }

    /// Iterate until the configured total, then flush telemetry once.
    pub fn run(mut self) -> Result<TrainSummary> {
        while self.iteration < self.settings.iterations {
            let report = self.step()?;
            self.last_loss = report.loss;
            tracing::debug!(
                "iteration {} done (loss {:.4}, snapshot: {})",
                report.iteration, report.loss, report.snapshot
            );
        }
        self.state = TrainerState::Done;
        self.sink.flush()?;

        tracing::info!("Training complete after {} iterations", self.iteration);
        Ok(TrainSummary {
            iterations:    self.iteration,
            snapshots:     self.snapshots,
            final_loss:    self.last_loss,
        })
    }
}

/// Production entry point: WGPU device, Adam, inverse-decay schedule.
pub fn run_training<S: TelemetrySink>(
    cfg:       &TrainConfig,
    model_cfg: &StyleNetConfig,
    streams:   Streams,
    ckpt:      &CheckpointManager,
    sink:      &mut S,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_on::<MyBackend, S>(cfg, model_cfg, streams, ckpt, sink, device)
}

pub fn train_on<B: AutodiffBackend, S: TelemetrySink>(
    cfg:       &TrainConfig,
    model_cfg: &StyleNetConfig,
    streams:   Streams,
    ckpt:      &CheckpointManager,
    sink:      &mut S,
    device:    B::Device,
) -> Result<TrainSummary> {
    let mut model: StyleNet<B> = model_cfg.init(&device);
    if cfg.pretrained {
        model = ckpt.load_model(model, &device)?;
        tracing::info!("Starting from pretrained weights; iteration counter reset to 0");
    }
    tracing::info!("Model ready: {} parameters", model.num_params());

    let optim    = AdamConfig::new().init::<B, StyleNet<B>>();
    let schedule = InverseDecay::new(cfg.lr, cfg.lr_decay);
    let orchestrator = Orchestrator::new(
        model, optim, schedule, streams, device, ckpt, sink, LoopSettings::from(cfg),
    )?;
    orchestrator.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use std::sync::{Arc, Mutex};

    use crate::domain::image_sample::ImageSample;
    use crate::domain::schedule::ConstantRate;
    use crate::domain::weights::LossWeights;

    type TAB = Autodiff<NdArray<f32>>;

    const SIZE: usize = 16;

    type Drawn = Arc<Mutex<Vec<Vec<ImageSample>>>>;

    /// Deterministic gradient images; `fail_at` makes the n-th call error out.
    /// Every returned batch is kept in `drawn`.
    struct SyntheticStream {
        calls:   usize,
        fail_at: Option<usize>,
        offset:  f32,
        drawn:   Drawn,
    }

    impl SyntheticStream {
        fn boxed(offset: f32) -> Box<dyn ImageStream> {
            Self::recording(offset).0
        }

        fn recording(offset: f32) -> (Box<dyn ImageStream>, Drawn) {
            let drawn = Drawn::default();
            let stream = Self { calls: 0, fail_at: None, offset, drawn: drawn.clone() };
            (Box::new(stream), drawn)
        }
    }

    impl ImageStream for SyntheticStream {
        fn next_batch(&mut self, batch_size: usize) -> Result<Vec<ImageSample>> {
            self.calls += 1;
            if Some(self.calls) == self.fail_at {
                anyhow::bail!("disk went away");
            }
            let batch = (0..batch_size)
                .map(|b| {
                    let px = (0..3 * SIZE * SIZE)
                        .map(|i| ((i + b * 7 + self.calls) % 97) as f32 / 97.0 * 0.5 + self.offset)
                        .collect();
                    Ok(ImageSample::new(px, SIZE, SIZE)?)
                })
                .collect::<Result<Vec<_>>>()?;
            self.drawn.lock().unwrap().push(batch.clone());
            Ok(batch)
        }
    }

    #[derive(Default, Clone)]
    struct Recorded {
        scalars: Vec<(String, f64, usize)>,
        samples: Vec<usize>,
        rows:    Vec<SampleRow>,
        flushes: usize,
    }

    #[derive(Default, Clone)]
    struct RecordingSink(Arc<Mutex<Recorded>>);

    impl TelemetrySink for RecordingSink {
        fn log_scalar(&mut self, name: &str, value: f64, step: usize) -> Result<()> {
            self.0.lock().unwrap().scalars.push((name.to_string(), value, step));
            Ok(())
        }
        fn log_sample(&mut self, row: SampleRow) -> Result<()> {
            assert_eq!(row.result.shape(), [3, SIZE, SIZE]);
            let mut r = self.0.lock().unwrap();
            r.samples.push(row.iteration);
            r.rows.push(row);
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            self.0.lock().unwrap().flushes += 1;
            Ok(())
        }
    }

    fn settings(iterations: usize, log_interval: usize) -> LoopSettings {
        LoopSettings { iterations, batch_size: 2, log_interval, progress_interval: 0 }
    }

    fn model(weights: LossWeights) -> StyleNet<TAB> {
        StyleNetConfig::new(weights).with_base_channels(4).init(&Default::default())
    }

    fn streams() -> Streams {
        Streams { content: SyntheticStream::boxed(0.0), style: SyntheticStream::boxed(0.4) }
    }

    #[test]
    fn test_snapshot_cadence_for_full_schedule() {
        let count = (1..=160_000).filter(|&i| is_snapshot_iteration(i, 10_000)).count();
        assert_eq!(count, 16);
        assert!(is_snapshot_iteration(160_000, 10_000));
        assert!(!is_snapshot_iteration(0, 10_000));
        assert!(!is_snapshot_iteration(9_999, 10_000));
    }

    #[test]
    fn test_run_snapshots_on_interval_and_flushes_once() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut sink = RecordingSink::default();
        let record = sink.0.clone();

        let orch = Orchestrator::new(
            model(LossWeights::default()),
            AdamConfig::new().init::<TAB, StyleNet<TAB>>(),
            ConstantRate(1e-3),
            streams(),
            Default::default(),
            &ckpt,
            &mut sink,
            settings(5, 2),
        )
        .unwrap();
        let summary = orch.run().unwrap();

        assert_eq!(summary.iterations, 5);
        assert_eq!(summary.snapshots, vec![2, 4]);
        assert_eq!(ckpt.latest_iteration().unwrap(), 4);
        assert!(dir.path().join("model_iter_2.mpk").exists());

        let r = record.lock().unwrap();
        let loss_steps: Vec<usize> = r.scalars.iter().filter(|s| s.0 == "loss").map(|s| s.2).collect();
        assert_eq!(loss_steps, vec![1, 2, 3, 4, 5]);
        // two batch items per snapshot
        assert_eq!(r.samples, vec![2, 2, 4, 4]);
        assert_eq!(r.flushes, 1);
    }

    #[test]
    fn test_snapshot_rows_reuse_the_trained_batch() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut sink = RecordingSink::default();
        let record = sink.0.clone();

        let (content, content_drawn) = SyntheticStream::recording(0.0);
        let (style, style_drawn)     = SyntheticStream::recording(0.4);
        let orch = Orchestrator::new(
            model(LossWeights::default()),
            AdamConfig::new().init::<TAB, StyleNet<TAB>>(),
            ConstantRate(1e-3),
            Streams { content, style },
            Default::default(),
            &ckpt,
            &mut sink,
            settings(4, 2),
        )
        .unwrap();
        orch.run().unwrap();

        let r = record.lock().unwrap();
        let content_drawn = content_drawn.lock().unwrap();
        let style_drawn   = style_drawn.lock().unwrap();
        assert_eq!(content_drawn.len(), 4);
        assert_eq!(r.rows.len(), 4);
        for (k, row) in r.rows.iter().enumerate() {
            // iteration n trained on the n-th draw of each stream
            let batch = row.iteration - 1;
            let item  = k % 2;
            assert_eq!(row.content, content_drawn[batch][item]);
            assert_eq!(row.style, style_drawn[batch][item]);
        }
        // the samples of iteration 2 differ from those of iteration 4
        assert_ne!(r.rows[0].content, r.rows[2].content);
    }

    #[test]
    fn test_per_stage_losses_are_logged_each_iteration() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut sink = RecordingSink::default();
        let record = sink.0.clone();

        let mut weights = LossWeights::default();
        weights.color_enabled = false;
        let mut orch = Orchestrator::new(
            model(weights),
            AdamConfig::new().init::<TAB, StyleNet<TAB>>(),
            ConstantRate(1e-3),
            streams(),
            Default::default(),
            &ckpt,
            &mut sink,
            settings(2, 100),
        )
        .unwrap();
        orch.step().unwrap();

        let r = record.lock().unwrap();
        let names: Vec<&str> = r.scalars.iter().filter(|s| s.2 == 1).map(|s| s.0.as_str()).collect();
        for stage in 1..=3 {
            for family in ["content", "remd", "moment"] {
                let name = format!("loss_s{stage}_{family}");
                assert!(names.contains(&name.as_str()), "missing {name}");
            }
            assert!(!names.contains(&format!("loss_s{stage}_color").as_str()));
        }
        assert!(r.scalars.iter().all(|s| s.1.is_finite()));
    }

    #[test]
    fn test_mode_is_training_again_after_snapshot() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut sink = RecordingSink::default();

        let mut orch = Orchestrator::new(
            model(LossWeights::default()),
            AdamConfig::new().init::<TAB, StyleNet<TAB>>(),
            ConstantRate(1e-3),
            streams(),
            Default::default(),
            &ckpt,
            &mut sink,
            settings(3, 1),
        )
        .unwrap();

        assert_eq!(orch.state(), TrainerState::Running);
        for _ in 0..3 {
            let report = orch.step().unwrap();
            assert!(report.snapshot);
            assert_eq!(orch.state(), TrainerState::Running);
            assert_eq!(orch.state().mode(), ExecutionMode::Training);
        }
    }

    #[test]
    fn test_learning_rate_follows_schedule_at_snapshots() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut sink = RecordingSink::default();
        let schedule = InverseDecay::new(1e-3, 0.5);

        let mut orch = Orchestrator::new(
            model(LossWeights::default()),
            AdamConfig::new().init::<TAB, StyleNet<TAB>>(),
            schedule,
            streams(),
            Default::default(),
            &ckpt,
            &mut sink,
            settings(4, 2),
        )
        .unwrap();

        assert_eq!(orch.learning_rate(), 1e-3);
        orch.step().unwrap();
        assert_eq!(orch.learning_rate(), 1e-3);
        orch.step().unwrap();
        // snapshot after iteration 2 → schedule(1)
        assert_eq!(orch.learning_rate(), schedule.learning_rate(1));
    }

    #[test]
    fn test_loading_error_halts_the_run() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut sink = RecordingSink::default();
        let record = sink.0.clone();

        let streams = Streams {
            content: SyntheticStream::boxed(0.0),
            style:   Box::new(SyntheticStream {
                calls:   0,
                fail_at: Some(3),
                offset:  0.4,
                drawn:   Drawn::default(),
            }),
        };
        let orch = Orchestrator::new(
            model(LossWeights::default()),
            AdamConfig::new().init::<TAB, StyleNet<TAB>>(),
            ConstantRate(1e-3),
            streams,
            Default::default(),
            &ckpt,
            &mut sink,
            settings(10, 100),
        )
        .unwrap();

        let err = orch.run().unwrap_err();
        assert!(err.to_string().contains("disk went away"));
        let r = record.lock().unwrap();
        let losses = r.scalars.iter().filter(|s| s.0 == "loss").count();
        assert_eq!(losses, 2);
        assert_eq!(r.flushes, 0);
    }

    #[test]
    fn test_non_finite_loss_halts_the_run() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut sink = RecordingSink::default();

        let mut weights = LossWeights::default();
        weights.stages[0].content = f64::INFINITY;
        let mut orch = Orchestrator::new(
            model(weights),
            AdamConfig::new().init::<TAB, StyleNet<TAB>>(),
            ConstantRate(1e-3),
            streams(),
            Default::default(),
            &ckpt,
            &mut sink,
            settings(3, 100),
        )
        .unwrap();

        let err = orch.step().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StyleError>(),
            Some(StyleError::NonFiniteLoss { iteration: 0, .. })
        ));
        assert_eq!(orch.iteration(), 0);
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let mut sink = RecordingSink::default();
        let mut s = settings(1, 1);
        s.batch_size = 0;

        let result = Orchestrator::new(
            model(LossWeights::default()),
            AdamConfig::new().init::<TAB, StyleNet<TAB>>(),
            ConstantRate(1e-3),
            streams(),
            Default::default(),
            &ckpt,
            &mut sink,
            s,
        );
        assert!(result.is_err());
    }
}
