// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/model.rs - 模型与加速器接口
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

use std::fmt;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 张量数据排布
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
  Nchw,
  Nhwc,
  Undefined,
}

/// 张量数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorType {
  UInt8,
  Int8,
  Float16,
  Float32,
  Int32,
}

/// 非对称仿射量化参数，`real = (q - zero_point) * scale`
///
/// 输出以 f32 取回时由加速器完成反量化，这里只用于记录与日志。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantization {
  pub zero_point: i32,
  pub scale: f32,
}

impl Quantization {
  pub const IDENTITY: Quantization = Quantization {
    zero_point: 0,
    scale: 1.0,
  };
}

/// 单个输入/输出张量的属性，在会话打开时查询一次
#[derive(Debug, Clone, PartialEq)]
pub struct TensorAttr {
  pub index: u32,
  pub name: String,
  pub dims: Vec<u32>,
  pub n_elems: u32,
  pub size: u32,
  pub layout: TensorLayout,
  pub dtype: TensorType,
  pub quant: Quantization,
}

impl fmt::Display for TensorAttr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "index={}, name={}, n_dims={}, dims={:?}, n_elems={}, size={}, fmt={:?}, type={:?}, zp={}, scale={:.6}",
      self.index,
      self.name,
      self.dims.len(),
      self.dims,
      self.n_elems,
      self.size,
      self.layout,
      self.dtype,
      self.quant.zero_point,
      self.quant.scale
    )
  }
}

/// 加速器协作方：模型加载由具体实现的构造器完成，释放由 `Drop` 完成
pub trait Accelerator {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 返回 (输入属性, 输出属性)
  fn query_io(&self) -> Result<(Vec<TensorAttr>, Vec<TensorAttr>), Self::Error>;

  fn set_input(&self, index: u32, data: &[u8], layout: TensorLayout) -> Result<(), Self::Error>;

  fn run(&self) -> Result<(), Self::Error>;

  /// 取出第 `index` 个输出并反量化为 f32
  fn output_f32(&self, index: u32) -> Result<Vec<f32>, Self::Error>;
}

mod classifier;
mod geometry;
#[cfg(feature = "npu")]
mod rknpu_backend;
mod session;

pub use self::classifier::{Classifier, ClassifyError};
pub use self::geometry::{GeometryError, ModelGeometry};
#[cfg(feature = "npu")]
pub use self::rknpu_backend::{RknpuAccelerator, RknpuAcceleratorBuilder, RknpuBackendError};
pub use self::session::{ModelSession, OutputTensor, SessionError};
#[cfg(test)]
pub(crate) use self::session::testing;
