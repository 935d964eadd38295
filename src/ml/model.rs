// ============================================================
// Layer 5 — ResNet v1 Architecture (Burn)
// ============================================================
// Residual convolutional classifier, built from Burn's nn
// building blocks:
//
//   stem     conv 7×7/2 + BN + ReLU + maxpool 3×3/2   (H > 32)
//            conv 3×3/1 + BN + ReLU                   (H ≤ 32)
//   stage 1  units[0] residual units, 64  filters
//   stage 2  units[1] residual units, 128 filters, stride 2
//   stage 3  units[2] residual units, 256 filters, stride 2
//   stage 4  units[3] residual units, 512 filters, stride 2
//   head     global average pool → linear(num_classes)
//
// Depths 18/34 use basic units (two 3×3 convs); 50/101/152
// use bottleneck units (1×1, 3×3, 1×1 with 4× expansion).
// A 1×1 projection on the shortcut matches shapes whenever a
// unit changes stride or width.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{self, ClassifierError};

/// Channel-first input shape of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub channels: usize,
    pub height:   usize,
    pub width:    usize,
}

impl InputShape {
    pub fn rgb(height: usize, width: usize) -> Self {
        Self { channels: 3, height, width }
    }
}

/// Units per stage and whether the units are bottlenecks.
fn stage_layout(depth: usize) -> Option<([usize; 4], bool)> {
    match depth {
        18  => Some(([2, 2, 2, 2], false)),
        34  => Some(([3, 4, 6, 3], false)),
        50  => Some(([3, 4, 6, 3], true)),
        101 => Some(([3, 4, 23, 3], true)),
        152 => Some(([3, 8, 36, 3], true)),
        _   => None,
    }
}

pub fn is_supported_depth(depth: usize) -> bool {
    stage_layout(depth).is_some()
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ResNetConfig {
    pub depth:        usize,
    pub num_classes:  usize,
    pub image_height: usize,
    pub image_width:  usize,
    #[config(default = 3)]
    pub in_channels:  usize,
    /// Weight of each new batch in the BatchNorm running statistics.
    #[config(default = 0.1)]
    pub bn_momentum:  f64,
}

impl ResNetConfig {
    pub fn from_shape(input_shape: InputShape, depth: usize, num_classes: usize) -> Self {
        Self::new(depth, num_classes, input_shape.height, input_shape.width)
            .with_in_channels(input_shape.channels)
    }

    pub fn input_shape(&self) -> InputShape {
        InputShape { channels: self.in_channels, height: self.image_height, width: self.image_width }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> error::Result<ResNet<B>> {
        let (units, bottleneck) = stage_layout(self.depth)
            .ok_or(ClassifierError::UnsupportedDepth { depth: self.depth })?;
        if self.num_classes == 0 {
            return Err(ClassifierError::invalid_config("num_classes must be at least 1"));
        }
        if self.in_channels == 0 || self.image_height == 0 || self.image_width == 0 {
            return Err(ClassifierError::invalid_config("input shape must be non-zero"));
        }
        if !(self.bn_momentum > 0.0 && self.bn_momentum <= 1.0) {
            return Err(ClassifierError::invalid_config("batch-norm momentum must be in (0, 1]"));
        }
        let momentum = self.bn_momentum;

        let expansion = if bottleneck { 4 } else { 1 };
        let widths    = [64, 128, 256, 512];

        // ── Stem ──────────────────────────────────────────────────────────────
        let small_input = self.image_height <= 32;
        let stem_conv = if small_input {
            conv(self.in_channels, 64, 3, 1, 1, device)
        } else {
            conv(self.in_channels, 64, 7, 2, 3, device)
        };
        let stem_bn   = batch_norm(64, momentum, device);
        let stem_pool = (!small_input).then(|| {
            MaxPool2dConfig::new([3, 3])
                .with_strides([2, 2])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init()
        });

        // ── Residual stages ───────────────────────────────────────────────────
        let mut in_ch  = 64;
        let mut blocks = Vec::with_capacity(units.iter().sum());
        for (stage, (&count, &width)) in units.iter().zip(&widths).enumerate() {
            for i in 0..count {
                let stride = if i == 0 && stage > 0 { 2 } else { 1 };
                let out_ch = width * expansion;
                blocks.push(ResidualUnit::new(in_ch, width, out_ch, stride, bottleneck, momentum, device));
                in_ch = out_ch;
            }
        }

        Ok(ResNet {
            stem_conv,
            stem_bn,
            stem_pool,
            blocks,
            avg_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: LinearConfig::new(in_ch, self.num_classes).init(device),
            num_classes: self.num_classes,
        })
    }
}

/// Build a freshly initialised ResNet of the given depth.
pub fn build<B: Backend>(
    input_shape: InputShape,
    depth:       usize,
    num_classes: usize,
    device:      &B::Device,
) -> error::Result<ResNet<B>> {
    ResNetConfig::from_shape(input_shape, depth, num_classes).init(device)
}

fn conv<B: Backend>(
    in_ch:   usize,
    out_ch:  usize,
    kernel:  usize,
    stride:  usize,
    padding: usize,
    device:  &B::Device,
) -> Conv2d<B> {
    Conv2dConfig::new([in_ch, out_ch], [kernel, kernel])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_bias(false)
        .init(device)
}

fn batch_norm<B: Backend>(channels: usize, momentum: f64, device: &B::Device) -> BatchNorm<B, 2> {
    BatchNormConfig::new(channels).with_momentum(momentum).init(device)
}

#[derive(Module, Debug)]
pub struct Shortcut<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn:   BatchNorm<B, 2>,
}

/// Basic unit when `conv3` is `None`, bottleneck unit otherwise.
#[derive(Module, Debug)]
pub struct ResidualUnit<B: Backend> {
    pub conv1:    Conv2d<B>,
    pub bn1:      BatchNorm<B, 2>,
    pub conv2:    Conv2d<B>,
    pub bn2:      BatchNorm<B, 2>,
    pub conv3:    Option<Conv2d<B>>,
    pub bn3:      Option<BatchNorm<B, 2>>,
    pub shortcut: Option<Shortcut<B>>,
}

impl<B: Backend> ResidualUnit<B> {
    fn new(
        in_ch:      usize,
        width:      usize,
        out_ch:     usize,
        stride:     usize,
        bottleneck: bool,
        momentum:   f64,
        device:     &B::Device,
    ) -> Self {
        let shortcut = (stride != 1 || in_ch != out_ch).then(|| Shortcut {
            conv: conv(in_ch, out_ch, 1, stride, 0, device),
            bn:   batch_norm(out_ch, momentum, device),
        });

        if bottleneck {
            Self {
                conv1: conv(in_ch, width, 1, 1, 0, device),
                bn1:   batch_norm(width, momentum, device),
                conv2: conv(width, width, 3, stride, 1, device),
                bn2:   batch_norm(width, momentum, device),
                conv3: Some(conv(width, out_ch, 1, 1, 0, device)),
                bn3:   Some(batch_norm(out_ch, momentum, device)),
                shortcut,
            }
        } else {
            Self {
                conv1: conv(in_ch, out_ch, 3, stride, 1, device),
                bn1:   batch_norm(out_ch, momentum, device),
                conv2: conv(out_ch, out_ch, 3, 1, 1, device),
                bn2:   batch_norm(out_ch, momentum, device),
                conv3: None,
                bn3:   None,
                shortcut,
            }
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.shortcut {
            Some(s) => s.bn.forward(s.conv.forward(x.clone())),
            None    => x.clone(),
        };

        let out = relu(self.bn1.forward(self.conv1.forward(x)));
        let out = self.bn2.forward(self.conv2.forward(out));
        let out = match (&self.conv3, &self.bn3) {
            (Some(conv3), Some(bn3)) => bn3.forward(conv3.forward(relu(out))),
            _ => out,
        };

        relu(out + identity)
    }
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub stem_conv:   Conv2d<B>,
    pub stem_bn:     BatchNorm<B, 2>,
    pub stem_pool:   Option<MaxPool2d>,
    pub blocks:      Vec<ResidualUnit<B>>,
    pub avg_pool:    AdaptiveAvgPool2d,
    pub fc:          Linear<B>,
    pub num_classes: usize,
}

impl<B: Backend> ResNet<B> {
    /// images: [batch, channels, height, width] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = relu(self.stem_bn.forward(self.stem_conv.forward(images)));
        if let Some(pool) = &self.stem_pool {
            x = pool.forward(x);
        }

        for block in &self.blocks {
            x = block.forward(x);
        }

        let x = self.avg_pool.forward(x); // [batch, features, 1, 1]
        let x = x.flatten::<2>(1, 3);     // [batch, features]
        self.fc.forward(x)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn test_unsupported_depth() {
        let err = build::<B>(InputShape::rgb(224, 224), 7, 3, &Default::default()).unwrap_err();
        assert!(matches!(err, ClassifierError::UnsupportedDepth { depth: 7 }));
    }

    #[test]
    fn test_zero_classes_rejected() {
        let err = build::<B>(InputShape::rgb(32, 32), 18, 0, &Default::default()).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidConfig { .. }));
    }

    #[test]
    fn test_supported_depths() {
        for depth in [18, 34, 50, 101, 152] {
            assert!(is_supported_depth(depth));
        }
        assert!(!is_supported_depth(20));
    }

    #[test]
    fn test_resnet18_small_input_output_shape() {
        let device = Default::default();
        let model  = build::<B>(InputShape::rgb(16, 16), 18, 5, &device).unwrap();
        let out    = model.forward(Tensor::zeros([2, 3, 16, 16], &device));
        assert_eq!(out.dims(), [2, 5]);
        assert_eq!(model.num_classes(), 5);
    }

    #[test]
    fn test_resnet50_uses_bottlenecks() {
        let device = Default::default();
        let model  = build::<B>(InputShape::rgb(64, 64), 50, 2, &device).unwrap();
        assert_eq!(model.blocks.len(), 16);
        assert!(model.blocks.iter().all(|b| b.conv3.is_some()));
        let out = model.forward(Tensor::zeros([1, 3, 64, 64], &device));
        assert_eq!(out.dims(), [1, 2]);
    }

    #[test]
    fn test_same_config_same_parameter_count() {
        let device = Default::default();
        let a = build::<B>(InputShape::rgb(32, 32), 18, 4, &device).unwrap();
        let b = build::<B>(InputShape::rgb(32, 32), 18, 4, &device).unwrap();
        assert_eq!(a.num_params(), b.num_params());
    }

    #[test]
    fn test_config_serialises_with_defaults() {
        let cfg  = ResNetConfig::from_shape(InputShape::rgb(32, 48), 34, 7);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ResNetConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.input_shape(), InputShape::rgb(32, 48));
        assert_eq!((back.depth, back.num_classes), (34, 7));
        assert_eq!(back.bn_momentum, 0.1);
    }

    #[test]
    fn test_bn_momentum_out_of_range() {
        let cfg = ResNetConfig::from_shape(InputShape::rgb(8, 8), 18, 2).with_bn_momentum(0.0);
        assert!(matches!(cfg.init::<B>(&Default::default()), Err(ClassifierError::InvalidConfig { .. })));
    }
}
