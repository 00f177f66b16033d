use crate::core::error::ScoreError;
use image::{ImageOutputFormat, RgbImage};
use std::io::Cursor;

/// 帧数据结构
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB 格式
    pub index: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, index: u64) -> Self {
        Self {
            width,
            height,
            data,
            index,
        }
    }

    pub fn from_image(image: RgbImage, index: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw(), index)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn expected_len(&self) -> usize {
        self.pixel_count() * 3
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Checks the frame is non-empty and its buffer matches its dimensions.
    pub fn validate(&self) -> Result<(), ScoreError> {
        if self.is_empty() || self.data.is_empty() {
            return Err(ScoreError::EmptyFrame(self.index));
        }
        if self.data.len() != self.expected_len() {
            return Err(ScoreError::MalformedBuffer {
                index: self.index,
                expected: self.expected_len(),
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    pub fn to_image(&self) -> Result<RgbImage, ScoreError> {
        self.validate()?;
        RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            ScoreError::MalformedBuffer {
                index: self.index,
                expected: self.expected_len(),
                actual: self.data.len(),
            },
        )
    }

    pub fn resize_to(&self, target_width: u32, target_height: u32) -> Result<Frame, ScoreError> {
        if self.width == target_width && self.height == target_height {
            self.validate()?;
            return Ok(self.clone());
        }

        let img = self.to_image()?;
        let resized = image::imageops::resize(
            &img,
            target_width,
            target_height,
            image::imageops::FilterType::Triangle,
        );

        Ok(Frame {
            width: target_width,
            height: target_height,
            data: resized.into_raw(),
            index: self.index,
        })
    }

    /// 编码为 PNG，用于快照导出
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let img = RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(
            || {
                image::ImageError::Parameter(image::error::ParameterError::from_kind(
                    image::error::ParameterErrorKind::DimensionMismatch,
                ))
            },
        )?;

        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageOutputFormat::Png)?;
        Ok(buffer.into_inner())
    }
}
