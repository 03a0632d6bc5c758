// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/frame.rs - 图像帧定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{DynamicImage, RgbImage};
use thiserror::Error;

/// 像素格式，仅 `Rgb888` 可以送入模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
  Rgb888,
  Rgba8888,
  Gray8,
}

impl PixelFormat {
  pub fn channels(self) -> usize {
    match self {
      PixelFormat::Rgb888 => 3,
      PixelFormat::Rgba8888 => 4,
      PixelFormat::Gray8 => 1,
    }
  }
}

impl std::fmt::Display for PixelFormat {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      PixelFormat::Rgb888 => "RGB888",
      PixelFormat::Rgba8888 => "RGBA8888",
      PixelFormat::Gray8 => "GRAY8",
    };
    f.write_str(name)
  }
}

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 按 NHWC 排列的模型输入字节
pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

/// 打包存储（行优先、通道交错）的图像缓冲区
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
  width: u32,
  height: u32,
  format: PixelFormat,
  data: Box<[u8]>,
}

impl ImageFrame {
  pub fn new(
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
  ) -> Result<Self, FrameError> {
    let expected = width as usize * height as usize * format.channels();
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      format,
      data: data.into_boxed_slice(),
    })
  }

  pub fn zeroed(width: u32, height: u32, format: PixelFormat) -> Self {
    let size = width as usize * height as usize * format.channels();
    Self {
      width,
      height,
      format,
      data: vec![0u8; size].into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn format(&self) -> PixelFormat {
    self.format
  }

  /// 缓冲区字节数
  pub fn size(&self) -> usize {
    self.data.len()
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  /// 转为 `RgbImage`，非 RGB888 帧返回 `None`
  pub fn to_rgb_image(&self) -> Option<RgbImage> {
    if self.format != PixelFormat::Rgb888 {
      return None;
    }
    RgbImage::from_raw(self.width, self.height, self.data.to_vec())
  }
}

impl AsNhwcFrame for ImageFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

impl From<RgbImage> for ImageFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    Self {
      width,
      height,
      format: PixelFormat::Rgb888,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl From<DynamicImage> for ImageFrame {
  // 8 位 RGB / RGBA / 灰度保留原始格式，其余格式统一转为 RGB888
  fn from(image: DynamicImage) -> Self {
    let (width, height) = (image.width(), image.height());
    let (format, data) = match image {
      DynamicImage::ImageRgb8(buf) => (PixelFormat::Rgb888, buf.into_raw()),
      DynamicImage::ImageRgba8(buf) => (PixelFormat::Rgba8888, buf.into_raw()),
      DynamicImage::ImageLuma8(buf) => (PixelFormat::Gray8, buf.into_raw()),
      other => (PixelFormat::Rgb888, other.to_rgb8().into_raw()),
    };

    Self {
      width,
      height,
      format,
      data: data.into_boxed_slice(),
    }
  }
}
