// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/model/geometry.rs - 模型输入几何
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

use thiserror::Error;
use tracing::info;

use crate::model::{TensorAttr, TensorLayout};

const RGB_CHANNELS: u32 = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GeometryError {
  #[error("输入张量维度数应为 4, 实际为 {0}")]
  Rank(usize),
  #[error("输入张量存在零长度维度: {0:?}")]
  EmptyDimension(Vec<u32>),
  #[error("仅支持 3 通道输入, 模型要求 {0} 通道")]
  Channels(u32),
}

/// 从第一个输入张量推导出的模型输入尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelGeometry {
  pub height: u32,
  pub width: u32,
  pub channels: u32,
  pub layout: TensorLayout,
}

impl ModelGeometry {
  /// NCHW 时通道在第 1 维，(C, H, W) = dims[1..4]；其余情况按 NHWC 取 (H, W, C)
  pub fn from_input_attr(attr: &TensorAttr) -> Result<Self, GeometryError> {
    if attr.dims.len() != 4 {
      return Err(GeometryError::Rank(attr.dims.len()));
    }
    if attr.dims.iter().any(|&d| d == 0) {
      return Err(GeometryError::EmptyDimension(attr.dims.clone()));
    }

    let geometry = if attr.layout == TensorLayout::Nchw {
      info!("模型输入为 NCHW 格式");
      ModelGeometry {
        channels: attr.dims[1],
        height: attr.dims[2],
        width: attr.dims[3],
        layout: TensorLayout::Nchw,
      }
    } else {
      info!("模型输入为 NHWC 格式");
      ModelGeometry {
        height: attr.dims[1],
        width: attr.dims[2],
        channels: attr.dims[3],
        layout: attr.layout,
      }
    };

    if geometry.channels != RGB_CHANNELS {
      return Err(GeometryError::Channels(geometry.channels));
    }

    info!(
      "模型输入 height={}, width={}, channel={}",
      geometry.height, geometry.width, geometry.channels
    );
    Ok(geometry)
  }

  /// 输入缓冲区应有的字节数
  pub fn input_size(&self) -> usize {
    self.height as usize * self.width as usize * self.channels as usize
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{Quantization, TensorType};

  fn input_attr(dims: Vec<u32>, layout: TensorLayout) -> TensorAttr {
    let n_elems = dims.iter().product();
    TensorAttr {
      index: 0,
      name: "input".to_string(),
      dims,
      n_elems,
      size: n_elems,
      layout,
      dtype: TensorType::UInt8,
      quant: Quantization::IDENTITY,
    }
  }

  #[test]
  fn channel_first_reads_chw() {
    let attr = input_attr(vec![1, 3, 224, 224], TensorLayout::Nchw);
    let geometry = ModelGeometry::from_input_attr(&attr).unwrap();
    assert_eq!(geometry.channels, 3);
    assert_eq!(geometry.height, 224);
    assert_eq!(geometry.width, 224);
    assert_eq!(geometry.layout, TensorLayout::Nchw);
  }

  #[test]
  fn channel_last_reads_hwc() {
    let attr = input_attr(vec![1, 224, 224, 3], TensorLayout::Nhwc);
    let geometry = ModelGeometry::from_input_attr(&attr).unwrap();
    assert_eq!(geometry.height, 224);
    assert_eq!(geometry.width, 224);
    assert_eq!(geometry.channels, 3);
    assert_eq!(geometry.input_size(), 224 * 224 * 3);
  }

  #[test]
  fn non_square_layouts_do_not_swap_axes() {
    let nchw = input_attr(vec![1, 3, 120, 160], TensorLayout::Nchw);
    let nhwc = input_attr(vec![1, 120, 160, 3], TensorLayout::Nhwc);
    let a = ModelGeometry::from_input_attr(&nchw).unwrap();
    let b = ModelGeometry::from_input_attr(&nhwc).unwrap();
    assert_eq!((a.height, a.width), (120, 160));
    assert_eq!((b.height, b.width), (120, 160));
  }

  #[test]
  fn reading_nchw_dims_as_nhwc_is_rejected() {
    // [1,3,224,224] 按 NHWC 解释会得到 224 通道
    let attr = input_attr(vec![1, 3, 224, 224], TensorLayout::Nhwc);
    assert_eq!(
      ModelGeometry::from_input_attr(&attr),
      Err(GeometryError::Channels(224))
    );
  }

  #[test]
  fn wrong_rank_is_rejected() {
    let attr = input_attr(vec![1, 224, 224], TensorLayout::Nhwc);
    assert_eq!(
      ModelGeometry::from_input_attr(&attr),
      Err(GeometryError::Rank(3))
    );
  }
}
