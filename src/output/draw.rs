// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/output/draw.rs - 分类结果可视化
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

use ab_glyph::{FontRef, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;

use crate::frame::ImageFrame;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 24.0;
const LABEL_ORIGIN: (i32, i32) = (25, 25);
const LABEL_COLOR: [u8; 3] = [255, 0, 0]; // 红色

static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

pub struct Draw {
  font: FontRef<'static>,
  font_size: f32,
  origin: (i32, i32),
  label_color: [u8; 3],
}

impl Draw {
  pub fn new() -> Result<Self, InvalidFont> {
    let font = FontRef::try_from_slice(FONT_DATA)?;
    Ok(Self {
      font,
      font_size: LABEL_FONT_SIZE,
      origin: LABEL_ORIGIN,
      label_color: LABEL_COLOR,
    })
  }

  /// 在图像左上角绘制一行标签文本
  pub fn draw_label(&self, image: &mut RgbImage, text: &str) {
    draw_text_mut(
      image,
      Rgb(self.label_color),
      self.origin.0,
      self.origin.1,
      PxScale::from(self.font_size),
      &self.font,
      text,
    );
  }

  /// 复制源图像并绘制标签，源图像不是 RGB888 时返回 None
  pub fn annotate(&self, frame: &ImageFrame, text: &str) -> Option<RgbImage> {
    let mut image = frame.to_rgb_image()?;
    self.draw_label(&mut image, text);
    Some(image)
  }
}
