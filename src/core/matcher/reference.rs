use crate::core::error::{InputError, ScoreError};
use image::RgbImage;
use log::info;
use std::path::{Path, PathBuf};

/// 参考图（RGB），加载一次，整个扫描期间只读
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    means: [f64; 3],
    centered_sq_sum: f64,
}

impl ReferenceImage {
    /// Decodes the image at `path` and shrinks it by `reduction` in each dimension.
    pub fn load<P: AsRef<Path>>(path: P, reduction: u32) -> Result<Self, InputError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(InputError::FileNotFound(path.to_path_buf()));
        }

        let decoded = image::open(path).map_err(|source| InputError::Reference {
            path: path.to_path_buf(),
            source,
        })?;
        let rgb = decoded.to_rgb8();
        let (src_w, src_h) = rgb.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err(InputError::EmptyReference(PathBuf::from(path)));
        }

        let reduction = reduction.max(1);
        let rgb = if reduction > 1 {
            let w = (src_w / reduction).max(1);
            let h = (src_h / reduction).max(1);
            image::imageops::resize(&rgb, w, h, image::imageops::FilterType::Triangle)
        } else {
            rgb
        };

        info!(
            "🖼️ Reference {:?}: {}x{} (reduced 1/{} to {}x{})",
            path,
            src_w,
            src_h,
            reduction,
            rgb.width(),
            rgb.height()
        );

        Self::from_image(rgb).map_err(|_| InputError::EmptyReference(PathBuf::from(path)))
    }

    pub fn from_image(image: RgbImage) -> Result<Self, ScoreError> {
        let (width, height) = image.dimensions();
        Self::from_raw(width, height, image.into_raw())
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ScoreError> {
        if width == 0 || height == 0 || data.is_empty() {
            return Err(ScoreError::EmptyReference);
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(ScoreError::EmptyReference);
        }

        let means = channel_means(&data);
        let centered_sq_sum = data
            .chunks_exact(3)
            .map(|px| {
                (0..3)
                    .map(|c| {
                        let d = px[c] as f64 - means[c];
                        d * d
                    })
                    .sum::<f64>()
            })
            .sum();

        Ok(Self {
            width,
            height,
            data,
            means,
            centered_sq_sum,
        })
    }

    pub fn means(&self) -> [f64; 3] {
        self.means
    }

    /// Sum of squared deviations from the channel means.
    pub fn centered_sq_sum(&self) -> f64 {
        self.centered_sq_sum
    }
}

pub(crate) fn channel_means(data: &[u8]) -> [f64; 3] {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for px in data.chunks_exact(3) {
        sums[0] += px[0] as u64;
        sums[1] += px[1] as u64;
        sums[2] += px[2] as u64;
        count += 1;
    }
    if count == 0 {
        return [0.0; 3];
    }
    [
        sums[0] as f64 / count as f64,
        sums[1] as f64 / count as f64,
        sums[2] as f64 / count as f64,
    ]
}
