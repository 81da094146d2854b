// ============================================================
// Layer 5 — Staged Loss Families
// ============================================================
// Four loss families, each measured on frozen loss-encoder
// features (or raw pixels for color):
//
//   content  — MSE between mean/variance-normalised features of
//              the output and of the content image
//   moment   — |Δmean| + |Δstd| of output vs style features
//   remd     — relaxed earth mover's distance between output and
//              style feature clouds (cosine cost)
//   color    — relaxed EMD on downsampled pixels (euclidean cost)
//
// weighted_total() folds the per-stage values with LossWeights:
//
//   Σ_s  w_c[s]·content_s + w_r[s]·remd_s + w_m[s]·moment_s
//        (+ w_col[s]·color_s when color is on)

use burn::{nn::pool::AdaptiveAvgPool2dConfig, prelude::*};

use crate::domain::weights::{LossWeights, NUM_STAGES};

const EPS: f64 = 1e-5;

/// Largest spatial grid the remd cost matrix is built on
pub const REMD_GRID: usize = 16;

// ─── StageLosses ──────────────────────────────────────────────────────────────
/// Unweighted loss values of one stage. Each tensor has shape [1].
#[derive(Debug, Clone)]
pub struct StageLosses<B: Backend> {
    pub content: Tensor<B, 1>,
    pub remd:    Tensor<B, 1>,
    pub moment:  Tensor<B, 1>,
    /// None when the color family is switched off
    pub color:   Option<Tensor<B, 1>>,
}

impl<B: Backend> StageLosses<B> {
    /// Weighted sum for stage `stage` (0-based).
    pub fn weighted(&self, weights: &LossWeights, stage: usize) -> Tensor<B, 1> {
        let w = &weights.stages[stage];
        let mut total = self.content.clone().mul_scalar(w.content)
            + self.remd.clone().mul_scalar(w.remd)
            + self.moment.clone().mul_scalar(w.moment);
        if let Some(color) = &self.color {
            total = total + color.clone().mul_scalar(weights.color(stage));
        }
        total
    }

    /// Plain values [content, remd, moment, color] for logging
    pub fn values(&self) -> [f64; 4] {
        let read = |t: &Tensor<B, 1>| t.clone().into_scalar().elem::<f64>();
        [
            read(&self.content),
            read(&self.remd),
            read(&self.moment),
            self.color.as_ref().map_or(0.0, read),
        ]
    }
}

/// Sum of every stage's weighted loss.
pub fn weighted_total<B: Backend>(
    weights: &LossWeights,
    stages:  &[StageLosses<B>; NUM_STAGES],
) -> Tensor<B, 1> {
    stages
        .iter()
        .enumerate()
        .skip(1)
        .fold(stages[0].weighted(weights, 0), |acc, (s, l)| acc + l.weighted(weights, s))
}

// ─── Feature statistics ───────────────────────────────────────────────────────
/// Per-channel mean and std, each [N, C, 1, 1]
pub fn mean_std<B: Backend>(x: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>) {
    let [n, c, h, w] = x.dims();
    let flat = x.reshape([n, c, h * w]);
    let mean = flat.clone().mean_dim(2);
    let var  = (flat - mean.clone()).powf_scalar(2.0).mean_dim(2);
    let std  = var.add_scalar(EPS).sqrt();
    (mean.reshape([n, c, 1, 1]), std.reshape([n, c, 1, 1]))
}

/// Zero mean, unit variance per channel
pub fn mean_variance_norm<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let (mean, std) = mean_std(x.clone());
    (x - mean) / std
}

/// Re-colour `content` features with the statistics of `style`
pub fn adain<B: Backend>(content: Tensor<B, 4>, style: Tensor<B, 4>) -> Tensor<B, 4> {
    let (s_mean, s_std) = mean_std(style);
    mean_variance_norm(content) * s_std + s_mean
}

// ─── Loss families ────────────────────────────────────────────────────────────
pub fn content_loss<B: Backend>(output: Tensor<B, 4>, content: Tensor<B, 4>) -> Tensor<B, 1> {
    (mean_variance_norm(output) - mean_variance_norm(content))
        .powf_scalar(2.0)
        .mean()
}

pub fn moment_loss<B: Backend>(output: Tensor<B, 4>, style: Tensor<B, 4>) -> Tensor<B, 1> {
    let (o_mean, o_std) = mean_std(output);
    let (s_mean, s_std) = mean_std(style);
    (o_mean - s_mean).abs().mean() + (o_std - s_std).abs().mean()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cost {
    Cosine,
    Euclidean,
}

/// Relaxed EMD: the larger of the two mean nearest-neighbour costs.
pub fn remd_loss<B: Backend>(output: Tensor<B, 4>, style: Tensor<B, 4>, cost: Cost) -> Tensor<B, 1> {
    let x = point_cloud(output);
    let y = point_cloud(style);
    let d = match cost {
        Cost::Cosine    => cosine_cost(x, y),
        Cost::Euclidean => euclidean_cost(x, y),
    };
    let row = d.clone().min_dim(2).mean();
    let col = d.min_dim(1).mean();
    // max(a, b) = (a + b + |a - b|) / 2
    (row.clone() + col.clone() + (row - col).abs()).div_scalar(2.0)
}

/// [N, C, H, W] → [N, P, C] with P ≤ REMD_GRID²
fn point_cloud<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 3> {
    let [n, c, h, w] = x.dims();
    let grid = [h.min(REMD_GRID), w.min(REMD_GRID)];
    let pooled = if grid == [h, w] {
        x
    } else {
        AdaptiveAvgPool2dConfig::new(grid).init().forward(x)
    };
    pooled.reshape([n, c, grid[0] * grid[1]]).swap_dims(1, 2)
}

/// 1 - cos(x_i, y_j), shape [N, P, Q]
fn cosine_cost<B: Backend>(x: Tensor<B, 3>, y: Tensor<B, 3>) -> Tensor<B, 3> {
    let xn = x.clone() / x.powf_scalar(2.0).sum_dim(2).add_scalar(EPS).sqrt();
    let yn = y.clone() / y.powf_scalar(2.0).sum_dim(2).add_scalar(EPS).sqrt();
    xn.matmul(yn.swap_dims(1, 2)).neg().add_scalar(1.0)
}

/// ‖x_i - y_j‖₂, shape [N, P, Q]
fn euclidean_cost<B: Backend>(x: Tensor<B, 3>, y: Tensor<B, 3>) -> Tensor<B, 3> {
    let x2 = x.clone().powf_scalar(2.0).sum_dim(2);                    // [N, P, 1]
    let y2 = y.clone().powf_scalar(2.0).sum_dim(2).swap_dims(1, 2);    // [N, 1, Q]
    let xy = x.matmul(y.swap_dims(1, 2));                               // [N, P, Q]
    (x2 + y2 - xy.mul_scalar(2.0)).clamp_min(EPS).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    use crate::domain::weights::StageWeights;

    type TB = NdArray<f32>;

    fn scalar(v: f32) -> Tensor<TB, 1> {
        Tensor::from_floats([v], &Default::default())
    }

    fn stage(c: f32, r: f32, m: f32, col: f32) -> StageLosses<TB> {
        StageLosses {
            content: scalar(c),
            remd:    scalar(r),
            moment:  scalar(m),
            color:   Some(scalar(col)),
        }
    }

    fn read(t: Tensor<TB, 1>) -> f32 {
        t.into_scalar()
    }

    #[test]
    fn test_total_is_exact_weighted_sum() {
        let weights = LossWeights {
            stages: [
                StageWeights::new(1.0, 2.0, 3.0, 4.0),
                StageWeights::new(0.5, 0.0, 1.0, 2.0),
                StageWeights::new(2.0, 1.0, 0.0, 1.0),
            ],
            color_enabled: true,
        };
        let stages = [
            stage(1.0, 1.0, 1.0, 1.0),
            stage(2.0, 3.0, 4.0, 5.0),
            stage(1.0, 2.0, 3.0, 4.0),
        ];
        // 10 + (1 + 0 + 4 + 10) + (2 + 2 + 0 + 4)
        assert_eq!(read(weighted_total(&weights, &stages)), 33.0);
    }

    #[test]
    fn test_color_off_equals_zero_color_weights() {
        let mut off = LossWeights::default();
        off.color_enabled = false;
        let zero = LossWeights::default().with_zero_color();

        let stages = [
            stage(0.3, 1.7, 0.9, 2.2),
            stage(0.1, 0.4, 1.1, 3.3),
            stage(0.7, 0.2, 0.5, 4.4),
        ];
        assert_eq!(
            read(weighted_total(&off, &stages)),
            read(weighted_total(&zero, &stages)),
        );
    }

    #[test]
    fn test_color_off_ignores_missing_color() {
        let mut off = LossWeights::default();
        off.color_enabled = false;
        let mut s = stage(1.0, 1.0, 1.0, 0.0);
        s.color = None;
        let total = read(s.weighted(&off, 0));
        assert_eq!(total, 12.0 + 2.0 + 2.0);
    }

    #[test]
    fn test_identical_inputs_have_near_zero_content_and_moment() {
        let x = Tensor::<TB, 4>::random([2, 4, 8, 8], Distribution::Uniform(0.0, 1.0), &Default::default());
        assert!(read(content_loss(x.clone(), x.clone())) < 1e-6);
        assert!(read(moment_loss(x.clone(), x)) < 1e-6);
    }

    #[test]
    fn test_remd_of_identical_clouds_is_small() {
        let x = Tensor::<TB, 4>::random([1, 3, 4, 4], Distribution::Uniform(0.1, 1.0), &Default::default());
        assert!(read(remd_loss(x.clone(), x.clone(), Cost::Cosine)) < 1e-3);
        assert!(read(remd_loss(x.clone(), x, Cost::Euclidean)) < 1e-2);
    }

    #[test]
    fn test_remd_grows_with_distance() {
        let d = Default::default();
        let a = Tensor::<TB, 4>::zeros([1, 3, 4, 4], &d).add_scalar(0.2);
        let b = Tensor::<TB, 4>::zeros([1, 3, 4, 4], &d).add_scalar(0.9);
        assert!(read(remd_loss(a, b, Cost::Euclidean)) > 1.0);
    }

    #[test]
    fn test_adain_transfers_statistics() {
        let d = Default::default();
        let c = Tensor::<TB, 4>::random([1, 2, 8, 8], Distribution::Normal(0.0, 1.0), &d);
        let s = Tensor::<TB, 4>::random([1, 2, 8, 8], Distribution::Normal(3.0, 0.5), &d);
        let (m_out, _) = mean_std(adain(c, s.clone()));
        let (m_sty, _) = mean_std(s);
        let diff: f32 = (m_out - m_sty).abs().max().into_scalar();
        assert!(diff < 1e-3);
    }
}
