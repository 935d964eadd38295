// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// The single transform shared by training and inference:
//
//   DynamicImage ─► RGB8 ─► bilinear resize to (W, H)
//                ─► channel-first (3, H, W) ─► f32 / 255.0
//
// Aspect ratio is not preserved. Training and inference both
// call transform(); there is no second copy of this pipeline.

use burn::prelude::*;
use image::{imageops::FilterType, DynamicImage};

pub const CHANNELS: usize = 3;
pub const DEFAULT_WIDTH: u32 = 224;
pub const DEFAULT_HEIGHT: u32 = 224;

/// A normalised `(3, H, W)` image. Only [`Preprocessor::transform`] builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTensor {
    data:   Vec<f32>,
    height: usize,
    width:  usize,
}

impl PreparedTensor {
    /// `[channels, height, width]`
    pub fn shape(&self) -> [usize; 3] {
        [CHANNELS, self.height, self.width]
    }

    /// Channel-major values: all R, then all G, then all B.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Single-sample batch tensor of shape `[1, 3, H, W]`.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        let data = TensorData::new(self.data.clone(), [1, CHANNELS, self.height, self.width]);
        Tensor::from_data(data, device)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    width:  u32,
    height: u32,
}

impl Preprocessor {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn transform(&self, image: &DynamicImage) -> PreparedTensor {
        let rgb = image.to_rgb8();
        let rgb = if rgb.dimensions() == (self.width, self.height) {
            rgb
        } else {
            image::imageops::resize(&rgb, self.width, self.height, FilterType::Triangle)
        };

        let (w, h) = (self.width as usize, self.height as usize);
        let plane  = w * h;
        let mut data = vec![0.0f32; CHANNELS * plane];

        // HWC (interleaved) → CHW (planar)
        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..CHANNELS {
                data[c * plane + i] = pixel.0[c] as f32 / 255.0;
            }
        }

        PreparedTensor { data, height: h, width: w }
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, RgbaImage, Rgba};

    /// Deterministic pseudo-random pixels so every channel varies.
    fn noisy(w: u32, h: u32) -> DynamicImage {
        let img = RgbImage::from_fn(w, h, |x, y| {
            let v = x.wrapping_mul(31) ^ y.wrapping_mul(17);
            Rgb([(v % 256) as u8, (v * 3 % 256) as u8, (v * 7 % 256) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_output_shape_and_range() {
        for (w, h) in [(640, 480), (100, 300), (224, 224), (1, 1)] {
            let t = Preprocessor::default().transform(&noisy(w, h));
            assert_eq!(t.shape(), [3, 224, 224]);
            assert_eq!(t.as_slice().len(), 3 * 224 * 224);
            assert!(t.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_transform_is_deterministic() {
        let img = noisy(317, 211);
        let p   = Preprocessor::default();
        let a   = p.transform(&img);
        let b   = p.transform(&img.clone());
        let bits = |t: &PreparedTensor| t.as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_channel_first_layout() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([255, 0, 51])));
        let t   = Preprocessor::new(2, 2).transform(&img);
        assert_eq!(t.as_slice(), &[1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.2, 0.2, 0.2, 0.2]);
    }

    #[test]
    fn test_alpha_and_gray_become_rgb() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([0, 255, 0, 10])));
        assert_eq!(Preprocessor::new(3, 3).transform(&rgba).shape(), [3, 3, 3]);

        let gray = DynamicImage::new_luma8(5, 5);
        assert_eq!(Preprocessor::new(4, 2).transform(&gray).shape(), [3, 2, 4]);
    }

    #[test]
    fn test_to_tensor_adds_batch_axis() {
        type B = burn::backend::NdArray;
        let t = Preprocessor::new(8, 6).transform(&noisy(10, 10));
        let tensor = t.to_tensor::<B>(&Default::default());
        assert_eq!(tensor.dims(), [1, 3, 6, 8]);
    }
}
