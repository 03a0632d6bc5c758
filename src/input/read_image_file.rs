// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/input/read_image_file.rs - 图像文件读取
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

use std::path::Path;

use image::ImageReader;
use thiserror::Error;
use tracing::debug;

use crate::frame::ImageFrame;

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageLoadError(image::ImageError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

/// 读取并解码一张图像，格式由文件内容判断而非扩展名
pub fn read_image(path: impl AsRef<Path>) -> Result<ImageFrame, ImageFileInputError> {
  let path = path.as_ref();
  let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
  let frame = ImageFrame::from(image);
  debug!(
    "读取图像 {}: {}x{} {}",
    path.display(),
    frame.width(),
    frame.height(),
    frame.format()
  );
  Ok(frame)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::PixelFormat;
  use image::{Rgb, RgbImage};

  #[test]
  fn reads_png_as_rgb888() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.png");
    RgbImage::from_pixel(5, 3, Rgb([1, 2, 3])).save(&path).unwrap();

    let frame = read_image(&path).unwrap();
    assert_eq!((frame.width(), frame.height()), (5, 3));
    assert_eq!(frame.format(), PixelFormat::Rgb888);
    assert_eq!(&frame.as_bytes()[..3], &[1, 2, 3]);
  }

  #[test]
  fn garbage_bytes_fail_to_decode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"definitely not a jpeg").unwrap();
    assert!(read_image(&path).is_err());
  }

  #[test]
  fn missing_file_is_io_error() {
    let err = read_image("/nonexistent/image.png").unwrap_err();
    assert!(matches!(err, ImageFileInputError::IoError(_)));
  }
}
