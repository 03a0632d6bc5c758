// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/model/session.rs - 模型会话
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
use tracing::{debug, info};

use crate::{
  frame::AsNhwcFrame,
  model::{Accelerator, ModelGeometry, TensorAttr, TensorLayout, geometry::GeometryError},
};

#[derive(Error, Debug)]
pub enum SessionError {
  #[error("加速器错误: {0}")]
  Accelerator(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("模型没有输入张量")]
  NoInputs,
  #[error("模型没有输出张量")]
  NoOutputs,
  #[error("模型输入几何无效: {0}")]
  Geometry(#[from] GeometryError),
  #[error("输入数据长度不匹配: 期望 {expected}, 实际 {actual}")]
  InputSize { expected: usize, actual: usize },
  #[error("第 {index} 个输出长度为 {actual}, 属性记录为 {expected}")]
  OutputSize {
    index: u32,
    expected: usize,
    actual: usize,
  },
}

impl SessionError {
  fn accelerator<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    SessionError::Accelerator(Box::new(e))
  }
}

/// 一次前向推理取回的输出张量，离开作用域即释放
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
  index: u32,
  data: Box<[f32]>,
}

impl OutputTensor {
  pub fn index(&self) -> u32 {
    self.index
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn as_mut_slice(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

/// 已加载的模型：加速器句柄、缓存的张量属性与输入几何
pub struct ModelSession<A> {
  accelerator: A,
  input_attrs: Box<[TensorAttr]>,
  output_attrs: Box<[TensorAttr]>,
  geometry: ModelGeometry,
}

impl<A: Accelerator> ModelSession<A> {
  pub fn open(accelerator: A) -> Result<Self, SessionError> {
    let (input_attrs, output_attrs) = accelerator
      .query_io()
      .map_err(SessionError::accelerator)?;

    info!(
      "模型输入数量: {}, 输出数量: {}",
      input_attrs.len(),
      output_attrs.len()
    );
    debug!("输入张量:");
    for attr in &input_attrs {
      debug!("  {}", attr);
    }
    debug!("输出张量:");
    for attr in &output_attrs {
      debug!("  {}", attr);
    }

    let first_input = input_attrs.first().ok_or(SessionError::NoInputs)?;
    if output_attrs.is_empty() {
      return Err(SessionError::NoOutputs);
    }
    let geometry = ModelGeometry::from_input_attr(first_input)?;

    Ok(Self {
      accelerator,
      input_attrs: input_attrs.into_boxed_slice(),
      output_attrs: output_attrs.into_boxed_slice(),
      geometry,
    })
  }

  pub fn accelerator(&self) -> &A {
    &self.accelerator
  }

  pub fn input_attrs(&self) -> &[TensorAttr] {
    &self.input_attrs
  }

  pub fn output_attrs(&self) -> &[TensorAttr] {
    &self.output_attrs
  }

  pub fn geometry(&self) -> &ModelGeometry {
    &self.geometry
  }

  /// 第一个输出张量的元素数，即分类类别数
  pub fn num_classes(&self) -> usize {
    self.output_attrs[0].n_elems as usize
  }

  /// 以 NHWC uint8 送入一帧并取回第一个输出
  pub fn forward<F: AsNhwcFrame>(&self, input: &F) -> Result<OutputTensor, SessionError> {
    let data = input.as_nhwc();
    let expected = self.geometry.input_size();
    if data.len() != expected {
      return Err(SessionError::InputSize {
        expected,
        actual: data.len(),
      });
    }

    debug!("设置模型输入");
    self
      .accelerator
      .set_input(0, data, TensorLayout::Nhwc)
      .map_err(SessionError::accelerator)?;

    debug!("执行模型推理");
    self.accelerator.run().map_err(SessionError::accelerator)?;

    debug!("获取模型输出");
    let output = self
      .accelerator
      .output_f32(0)
      .map_err(SessionError::accelerator)?;

    let expected = self.num_classes();
    if output.len() != expected {
      return Err(SessionError::OutputSize {
        index: 0,
        expected,
        actual: output.len(),
      });
    }

    Ok(OutputTensor {
      index: 0,
      data: output.into_boxed_slice(),
    })
  }
}


#[cfg(test)]
mod tests {
  use super::testing::ScriptedAccelerator;
  use super::*;
  use crate::frame::{ImageFrame, PixelFormat};

  #[test]
  fn open_caches_geometry_and_class_count() {
    let session = ModelSession::open(ScriptedAccelerator::nhwc(4, 6, vec![0.0; 11])).unwrap();
    assert_eq!(session.geometry().height, 4);
    assert_eq!(session.geometry().width, 6);
    assert_eq!(session.num_classes(), 11);
    assert_eq!(session.input_attrs().len(), 1);
  }

  #[test]
  fn forward_checks_input_size() {
    let session = ModelSession::open(ScriptedAccelerator::nhwc(4, 4, vec![0.0; 3])).unwrap();
    let frame = ImageFrame::zeroed(2, 2, PixelFormat::Rgb888);
    assert!(matches!(
      session.forward(&frame),
      Err(SessionError::InputSize {
        expected: 48,
        actual: 12
      })
    ));
  }

  #[test]
  fn forward_returns_first_output() {
    let session =
      ModelSession::open(ScriptedAccelerator::nhwc(2, 2, vec![1.0, 2.0, 3.0])).unwrap();
    let frame = ImageFrame::zeroed(2, 2, PixelFormat::Rgb888);
    let output = session.forward(&frame).unwrap();
    assert_eq!(output.index(), 0);
    assert_eq!(output.as_slice(), &[1.0, 2.0, 3.0]);
  }

  #[test]
  fn run_failure_is_reported() {
    let mut accelerator = ScriptedAccelerator::nhwc(2, 2, vec![0.0; 2]);
    accelerator.fail_run = true;
    let session = ModelSession::open(accelerator).unwrap();
    let frame = ImageFrame::zeroed(2, 2, PixelFormat::Rgb888);
    assert!(matches!(
      session.forward(&frame),
      Err(SessionError::Accelerator(_))
    ));
  }
}
