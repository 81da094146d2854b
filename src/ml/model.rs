// ============================================================
// Layer 5 — Three-Stage Style Network
// ============================================================
// Coarse-to-fine stylization:
//
//   stage 1:  Ic↓4, Is↓4  ──encode──align₁──decode──▶ Ics₁
//   stage 2:  Ics₁↑2, Is↓2 ─encode──align₂──decode──▶ Ics₂
//   stage 3:  Ics₂↑2, Is   ─encode──align₃──decode──▶ Ics₃
//
// The stylization encoder, the three align blocks and the
// decoder are trained. A separate loss encoder with frozen
// parameters measures content / remd / moment losses on every
// stage output; color is measured on the pixels themselves.
//
// Image side length must be a multiple of SIZE_MULTIPLE.

use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AvgPool2d, AvgPool2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

use crate::domain::error::StyleError;
use crate::domain::mode::ExecutionMode;
use crate::domain::weights::{LossWeights, NUM_STAGES};
use crate::ml::loss::{
    adain, content_loss, moment_loss, remd_loss, weighted_total, Cost, StageLosses,
};

/// Stage downsampling (×4) times encoder downsampling (×4)
pub const SIZE_MULTIPLE: usize = 16;

/// Number of feature levels the encoders expose
const LEVELS: usize = 3;

#[derive(Config, Debug)]
pub struct StyleNetConfig {
    pub weights: LossWeights,
    /// Channel width of the first encoder level; deeper levels use 2× and 4×
    #[config(default = 16)]
    pub base_channels: usize,
}

impl StyleNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> StyleNet<B> {
        let c = self.base_channels;
        let aligns = (0..NUM_STAGES)
            .map(|_| AlignBlock {
                mix: Conv2dConfig::new([8 * c, 4 * c], [1, 1]).init(device),
            })
            .collect();

        StyleNet {
            encoder:  self.build_encoder(device),
            aligns,
            decoder:  self.build_decoder(device),
            loss_net: self.build_encoder(device).no_grad(),
            pool:     halve(),
            weights:  Ignored(self.weights.clone()),
        }
    }

    fn build_encoder<B: Backend>(&self, device: &B::Device) -> FeatureEncoder<B> {
        let c = self.base_channels;
        FeatureEncoder {
            conv1a: conv3x3(3, c, device),
            conv1b: conv3x3(c, c, device),
            conv2:  conv3x3(c, 2 * c, device),
            conv3:  conv3x3(2 * c, 4 * c, device),
            pool:   halve(),
        }
    }

    fn build_decoder<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let c = self.base_channels;
        Decoder {
            conv3: conv3x3(4 * c, 2 * c, device),
            conv2: conv3x3(2 * c, c, device),
            conv1: conv3x3(c, c, device),
            out:   conv3x3(c, 3, device),
        }
    }
}

fn conv3x3<B: Backend>(input: usize, output: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([input, output], [3, 3])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

fn halve() -> AvgPool2d {
    AvgPool2dConfig::new([2, 2]).with_strides([2, 2]).init()
}

/// Nearest-neighbour ×2 upsampling
fn upsample2x<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let [n, c, h, w] = x.dims();
    x.reshape([n, c, h, 1, w, 1])
        .repeat_dim(3, 2)
        .repeat_dim(5, 2)
        .reshape([n, c, 2 * h, 2 * w])
}

// ─── FeatureEncoder ───────────────────────────────────────────────────────────
/// Three feature levels: [C, H], [2C, H/2], [4C, H/4]
#[derive(Module, Debug)]
pub struct FeatureEncoder<B: Backend> {
    pub conv1a: Conv2d<B>,
    pub conv1b: Conv2d<B>,
    pub conv2:  Conv2d<B>,
    pub conv3:  Conv2d<B>,
    pub pool:   AvgPool2d,
}

impl<B: Backend> FeatureEncoder<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> [Tensor<B, 4>; LEVELS] {
        let f1 = relu(self.conv1b.forward(relu(self.conv1a.forward(x))));
        let f2 = relu(self.conv2.forward(self.pool.forward(f1.clone())));
        let f3 = relu(self.conv3.forward(self.pool.forward(f2.clone())));
        [f1, f2, f3]
    }

    pub fn deepest(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, f3] = self.forward(x);
        f3
    }
}

// ─── AlignBlock ───────────────────────────────────────────────────────────────
/// AdaIN statistics transfer plus a learned 1×1 correction
#[derive(Module, Debug)]
pub struct AlignBlock<B: Backend> {
    pub mix: Conv2d<B>,
}

impl<B: Backend> AlignBlock<B> {
    pub fn forward(&self, content: Tensor<B, 4>, style: Tensor<B, 4>) -> Tensor<B, 4> {
        let aligned = adain(content.clone(), style);
        let joined  = Tensor::cat(vec![aligned.clone(), content], 1);
        aligned + self.mix.forward(joined)
    }
}

// ─── Decoder ──────────────────────────────────────────────────────────────────
/// [4C, H/4] → RGB [3, H] in [0, 1]
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub conv3: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub conv1: Conv2d<B>,
    pub out:   Conv2d<B>,
}

impl<B: Backend> Decoder<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = upsample2x(relu(self.conv3.forward(x)));
        let x = upsample2x(relu(self.conv2.forward(x)));
        let x = relu(self.conv1.forward(x));
        sigmoid(self.out.forward(x))
    }
}

// ─── StyleNet ─────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct StyleNet<B: Backend> {
    pub encoder:  FeatureEncoder<B>,
    pub aligns:   Vec<AlignBlock<B>>,
    pub decoder:  Decoder<B>,
    pub loss_net: FeatureEncoder<B>,
    pub pool:     AvgPool2d,
    pub weights:  Ignored<LossWeights>,
}

/// Training-mode result: the aggregate plus its per-stage parts
pub struct LossOutput<B: Backend> {
    /// Shape [1]
    pub total:  Tensor<B, 1>,
    pub stages: [StageLosses<B>; NUM_STAGES],
}

pub enum StyleOutput<B: Backend> {
    Loss(LossOutput<B>),
    Stylized(Tensor<B, 4>),
}

impl<B: Backend> StyleOutput<B> {
    pub fn into_loss(self) -> Result<LossOutput<B>, StyleError> {
        match self {
            StyleOutput::Loss(l) => Ok(l),
            StyleOutput::Stylized(_) => Err(StyleError::ModeMismatch {
                requested: ExecutionMode::Training,
            }),
        }
    }

    pub fn into_stylized(self) -> Result<Tensor<B, 4>, StyleError> {
        match self {
            StyleOutput::Stylized(t) => Ok(t),
            StyleOutput::Loss(_) => Err(StyleError::ModeMismatch {
                requested: ExecutionMode::Evaluating,
            }),
        }
    }
}

/// One stage's inputs at that stage's resolution and its output
struct StagePass<B: Backend> {
    content: Tensor<B, 4>,
    style:   Tensor<B, 4>,
    output:  Tensor<B, 4>,
}

impl<B: Backend> StyleNet<B> {
    pub fn weights(&self) -> &LossWeights {
        &self.weights.0
    }

    /// Re-freeze the loss encoder, e.g. after loading a record.
    pub fn freeze_loss_net(mut self) -> Self {
        self.loss_net = self.loss_net.no_grad();
        self
    }

    /// content, style: [N, 3, H, W] with equal N.
    ///
    /// Training   → weighted loss over all three stages
    /// Evaluating → stage-3 stylized batch, shape of `content`, detached
    pub fn forward(
        &self,
        content: Tensor<B, 4>,
        style:   Tensor<B, 4>,
        mode:    ExecutionMode,
    ) -> Result<StyleOutput<B>, StyleError> {
        let [nc, _, _, _] = content.dims();
        let [ns, _, _, _] = style.dims();
        if nc != ns {
            return Err(StyleError::BatchMismatch { content: nc, style: ns });
        }

        let passes = self.run_stages(content, style);
        match mode {
            ExecutionMode::Evaluating => {
                let [_, _, last] = passes;
                Ok(StyleOutput::Stylized(last.output.detach()))
            }
            ExecutionMode::Training => {
                let stages = passes.map(|p| self.stage_losses(p));
                let total  = weighted_total(self.weights(), &stages);
                Ok(StyleOutput::Loss(LossOutput { total, stages }))
            }
        }
    }

    fn run_stages(&self, content: Tensor<B, 4>, style: Tensor<B, 4>) -> [StagePass<B>; NUM_STAGES] {
        let content_half = self.pool.forward(content.clone());
        let content_qtr  = self.pool.forward(content_half.clone());
        let style_half   = self.pool.forward(style.clone());
        let style_qtr    = self.pool.forward(style_half.clone());

        let out1 = self.stylize_stage(0, content_qtr.clone(), style_qtr.clone());
        let out2 = self.stylize_stage(1, upsample2x(out1.clone()), style_half.clone());
        let out3 = self.stylize_stage(2, upsample2x(out2.clone()), style.clone());

        [
            StagePass { content: content_qtr,  style: style_qtr,  output: out1 },
            StagePass { content: content_half, style: style_half, output: out2 },
            StagePass { content,               style,             output: out3 },
        ]
    }

    fn stylize_stage(&self, stage: usize, input: Tensor<B, 4>, style: Tensor<B, 4>) -> Tensor<B, 4> {
        let fc = self.encoder.deepest(input);
        let fs = self.encoder.deepest(style);
        self.decoder.forward(self.aligns[stage].forward(fc, fs))
    }

    fn stage_losses(&self, pass: StagePass<B>) -> StageLosses<B> {
        let [o1, o2, o3] = self.loss_net.forward(pass.output.clone());
        let [_, c2, c3]  = self.loss_net.forward(pass.content);
        let [s1, s2, s3] = self.loss_net.forward(pass.style.clone());

        let content = content_loss(o2.clone(), c2) + content_loss(o3.clone(), c3);
        let moment  = moment_loss(o1, s1) + moment_loss(o2.clone(), s2.clone()) + moment_loss(o3.clone(), s3.clone());
        let remd    = remd_loss(o2, s2, Cost::Cosine) + remd_loss(o3, s3, Cost::Cosine);
        let color   = self
            .weights()
            .color_enabled
            .then(|| remd_loss(pass.output, pass.style, Cost::Euclidean));

        StageLosses { content, remd, moment, color }
    }
}
