// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/preprocess.rs - 模型输入预处理
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

use std::str::FromStr;

use image::{Rgb, RgbImage, imageops};
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::{ImageFrame, PixelFormat},
  model::ModelGeometry,
};

const DEFAULT_LETTERBOX_COLOR: [u8; 3] = [114, 114, 114];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AdaptError {
  #[error("不支持的像素格式: {0}, 仅支持 RGB888")]
  UnsupportedFormat(PixelFormat),
  #[error("图像缓冲区损坏: {width}x{height}, {size} 字节")]
  CorruptBuffer { width: u32, height: u32, size: usize },
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("无法解析缩放方式 '{0}', 可选: stretch, letterbox, letterbox:R,G,B")]
pub struct ParseResizeModeError(String);

/// 缩放到模型输入尺寸的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
  /// 直接拉伸到目标尺寸
  #[default]
  Stretch,
  /// 保持宽高比缩放，居中放置，其余部分用纯色填充
  Letterbox { color: [u8; 3] },
}

impl FromStr for ResizeMode {
  type Err = ParseResizeModeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let err = || ParseResizeModeError(s.to_string());
    match s {
      "stretch" => Ok(ResizeMode::Stretch),
      "letterbox" => Ok(ResizeMode::Letterbox {
        color: DEFAULT_LETTERBOX_COLOR,
      }),
      _ => {
        let rgb = s.strip_prefix("letterbox:").ok_or_else(err)?;
        let parts = rgb
          .split(',')
          .map(|p| p.trim().parse::<u8>())
          .collect::<Result<Vec<_>, _>>()
          .map_err(|_| err())?;
        let color: [u8; 3] = parts.try_into().map_err(|_| err())?;
        Ok(ResizeMode::Letterbox { color })
      }
    }
  }
}

/// 把源图像转换为模型输入要求的尺寸与格式，返回新分配的缓冲区
pub fn adapt(
  src: &ImageFrame,
  geometry: &ModelGeometry,
  mode: ResizeMode,
) -> Result<ImageFrame, AdaptError> {
  if src.format() != PixelFormat::Rgb888 {
    return Err(AdaptError::UnsupportedFormat(src.format()));
  }

  let (dst_w, dst_h) = (geometry.width, geometry.height);
  if src.width() == dst_w && src.height() == dst_h {
    debug!("输入尺寸已匹配 {}x{}, 直接复制", dst_w, dst_h);
    return Ok(src.clone());
  }

  let image = src.to_rgb_image().ok_or(AdaptError::CorruptBuffer {
    width: src.width(),
    height: src.height(),
    size: src.size(),
  })?;

  let adapted = match mode {
    ResizeMode::Stretch => {
      imageops::resize(&image, dst_w, dst_h, imageops::FilterType::Triangle)
    }
    ResizeMode::Letterbox { color } => letterbox(&image, dst_w, dst_h, color),
  };
  debug!(
    "预处理 {}x{} -> {}x{} ({:?})",
    src.width(),
    src.height(),
    dst_w,
    dst_h,
    mode
  );

  Ok(ImageFrame::from(adapted))
}

fn letterbox(image: &RgbImage, dst_w: u32, dst_h: u32, color: [u8; 3]) -> RgbImage {
  let scale = f64::min(
    dst_w as f64 / image.width() as f64,
    dst_h as f64 / image.height() as f64,
  );
  let new_w = ((image.width() as f64 * scale).round() as u32).clamp(1, dst_w);
  let new_h = ((image.height() as f64 * scale).round() as u32).clamp(1, dst_h);

  let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);
  let mut canvas = RgbImage::from_pixel(dst_w, dst_h, Rgb(color));
  let x = (dst_w - new_w) / 2;
  let y = (dst_h - new_h) / 2;
  imageops::overlay(&mut canvas, &resized, x as i64, y as i64);
  canvas
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::TensorLayout;

  fn geometry(width: u32, height: u32) -> ModelGeometry {
    ModelGeometry {
      height,
      width,
      channels: 3,
      layout: TensorLayout::Nhwc,
    }
  }

  fn gradient(width: u32, height: u32) -> ImageFrame {
    ImageFrame::from(RgbImage::from_fn(width, height, |x, y| {
      Rgb([x as u8, y as u8, (x + y) as u8])
    }))
  }

  #[test]
  fn matching_geometry_is_an_identical_copy() {
    let src = gradient(8, 6);
    let out = adapt(&src, &geometry(8, 6), ResizeMode::Stretch).unwrap();
    assert_eq!(out, src);
    assert_ne!(out.as_bytes().as_ptr(), src.as_bytes().as_ptr());
  }

  #[test]
  fn stretch_produces_target_geometry() {
    let src = gradient(40, 20);
    let out = adapt(&src, &geometry(16, 16), ResizeMode::Stretch).unwrap();
    assert_eq!((out.width(), out.height()), (16, 16));
    assert_eq!(out.format(), PixelFormat::Rgb888);
    assert_eq!(out.size(), 16 * 16 * 3);
  }

  #[test]
  fn letterbox_pads_with_fill_color() {
    let src = ImageFrame::from(RgbImage::from_pixel(40, 20, Rgb([200, 10, 10])));
    let mode = ResizeMode::Letterbox { color: [1, 2, 3] };
    let out = adapt(&src, &geometry(16, 16), mode).unwrap();
    let image = out.to_rgb_image().unwrap();
    // 40x20 缩放为 16x8，上下各留 4 行
    assert_eq!(image.get_pixel(0, 0), &Rgb([1, 2, 3]));
    assert_eq!(image.get_pixel(8, 15), &Rgb([1, 2, 3]));
    let inside = image.get_pixel(8, 8);
    assert!(inside[0] > 150 && inside[2] < 50);
  }

  #[test]
  fn non_rgb_input_is_rejected() {
    let src = ImageFrame::zeroed(4, 4, PixelFormat::Rgba8888);
    assert_eq!(
      adapt(&src, &geometry(4, 4), ResizeMode::Stretch),
      Err(AdaptError::UnsupportedFormat(PixelFormat::Rgba8888))
    );
  }

  #[test]
  fn resize_mode_parses_from_cli_text() {
    assert_eq!("stretch".parse::<ResizeMode>(), Ok(ResizeMode::Stretch));
    assert_eq!(
      "letterbox".parse::<ResizeMode>(),
      Ok(ResizeMode::Letterbox {
        color: DEFAULT_LETTERBOX_COLOR
      })
    );
    assert_eq!(
      "letterbox:0,0,255".parse::<ResizeMode>(),
      Ok(ResizeMode::Letterbox { color: [0, 0, 255] })
    );
    assert!("letterbox:1,2".parse::<ResizeMode>().is_err());
    assert!("crop".parse::<ResizeMode>().is_err());
  }
}
