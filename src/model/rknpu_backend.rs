// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/model/rknpu_backend.rs - RKNPU 加速器后端
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

use std::path::{Path, PathBuf};

use rknpu::{Context, InitFlags, TensorFormat};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::path_from_url,
  model::{Accelerator, Quantization, TensorAttr, TensorLayout, TensorType},
};

const DEFAULT_INPUT_SHAPE: [u32; 4] = [1, 224, 224, 3];

#[derive(Error, Debug)]
pub enum RknpuBackendError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(rknpu::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输入形状参数无效: {0}")]
  InvalidShape(String),
  #[error("获取第 {0} 个输出失败: {1}")]
  OutputError(u32, String),
  #[error("不支持的输入序号: {0}")]
  UnsupportedInputIndex(u32),
}

impl From<std::io::Error> for RknpuBackendError {
  fn from(err: std::io::Error) -> Self {
    RknpuBackendError::ModelLoadError(err)
  }
}

impl From<rknpu::Error> for RknpuBackendError {
  fn from(err: rknpu::Error) -> Self {
    RknpuBackendError::RknnError(err)
  }
}

impl RknpuBackendError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    RknpuBackendError::ModelInvalid(msg.to_string(), e)
  }
}

/// 由 `rknn:///path/model.rknn?shape=1,224,224,3&format=nhwc` 构造
///
/// 绑定库只提供输入输出数量，输入形状由 URL 给出，
/// 输出元素数在加载后用一次全零输入试跑得到。
pub struct RknpuAcceleratorBuilder {
  model_path: PathBuf,
  input_shape: Vec<u32>,
  input_layout: TensorLayout,
}

impl FromUrlWithScheme for RknpuAcceleratorBuilder {
  const SCHEME: &'static str = "rknn";
}

impl FromUrl for RknpuAcceleratorBuilder {
  type Error = RknpuBackendError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let model_path = path_from_url(url, Self::SCHEME)
      .map_err(|e| RknpuBackendError::ModelPathError(e.to_string()))?;

    let mut builder = RknpuAcceleratorBuilder::with_model_path(model_path);
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "shape" => builder.input_shape = parse_shape(&v)?,
        "format" => builder.input_layout = parse_layout(&v)?,
        _ => debug!("忽略未知的模型参数: {}={}", k, v),
      }
    }
    Ok(builder)
  }
}

fn parse_shape(raw: &str) -> Result<Vec<u32>, RknpuBackendError> {
  let dims = raw
    .split(',')
    .map(|d| d.trim().parse::<u32>())
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| RknpuBackendError::InvalidShape(format!("{}: {}", raw, e)))?;
  if dims.is_empty() || dims.len() > 4 {
    return Err(RknpuBackendError::InvalidShape(format!(
      "{}: 维度数必须在 1 到 4 之间",
      raw
    )));
  }
  Ok(dims)
}

fn parse_layout(raw: &str) -> Result<TensorLayout, RknpuBackendError> {
  match raw.to_ascii_lowercase().as_str() {
    "nhwc" => Ok(TensorLayout::Nhwc),
    "nchw" => Ok(TensorLayout::Nchw),
    other => Err(RknpuBackendError::InvalidShape(format!(
      "未知的数据排布 '{}'",
      other
    ))),
  }
}

/// 只接受单输入、至少一个输出的模型
fn check_io_counts(num_inputs: u32, num_outputs: u32) -> Result<(), String> {
  if num_inputs != 1 {
    return Err(format!("仅支持单输入模型, 实际输入数量为 {}", num_inputs));
  }
  if num_outputs == 0 {
    return Err("模型没有输出".to_string());
  }
  Ok(())
}

fn uint8_input_attr(dims: Vec<u32>, layout: TensorLayout) -> TensorAttr {
  let n_elems: u32 = dims.iter().product();
  TensorAttr {
    index: 0,
    name: "input0".to_string(),
    dims,
    n_elems,
    size: n_elems,
    layout,
    dtype: TensorType::UInt8,
    quant: Quantization::IDENTITY,
  }
}

fn log_sdk_version(context: &Context) {
  match context.sdk_version() {
    Ok(version) => {
      let api = version.api_version().map(|v| v.to_string()).unwrap_or_default();
      let driver = version.driver_version().map(|v| v.to_string()).unwrap_or_default();
      debug!("RKNN API 版本: {}, 驱动版本: {}", api, driver);
    }
    Err(e) => warn!("查询 SDK 版本失败: {}", e),
  }
}

impl RknpuAcceleratorBuilder {
  pub fn with_model_path(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      input_shape: DEFAULT_INPUT_SHAPE.to_vec(),
      input_layout: TensorLayout::Nhwc,
    }
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  /// 读取模型、创建上下文，并试跑一次确定输出大小
  pub fn build(self) -> Result<RknpuAccelerator, RknpuBackendError> {
    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    let context = Context::new(&model_data, InitFlags::default())?;
    info!(
      "RKNN 上下文已创建, 模型大小 {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );
    log_sdk_version(&context);

    let num_inputs = context
      .num_inputs()
      .map_err(|e| RknpuBackendError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| RknpuBackendError::invalid("无法获取输出数量", e))?;
    debug!("模型输入/输出数量: {}/{}", num_inputs, num_outputs);
    check_io_counts(num_inputs, num_outputs).map_err(|msg| {
      error!("{}", msg);
      RknpuBackendError::invalid(&msg, rknpu::Error::InvalidModel)
    })?;

    let input_attr = uint8_input_attr(self.input_shape, self.input_layout);
    let mut accelerator = RknpuAccelerator {
      context,
      input_attr,
      output_attrs: Vec::new(),
    };
    accelerator.output_attrs = accelerator.probe_outputs(num_outputs)?;
    Ok(accelerator)
  }
}

pub struct RknpuAccelerator {
  context: Context,
  input_attr: TensorAttr,
  output_attrs: Vec<TensorAttr>,
}

impl RknpuAccelerator {
  /// 全零输入试跑一次，记录每个输出的元素数
  fn probe_outputs(&self, num_outputs: u32) -> Result<Vec<TensorAttr>, RknpuBackendError> {
    debug!("试运行以获取输出张量大小");
    let zeros = vec![0u8; self.input_attr.size as usize];
    self.set_input(0, &zeros, self.input_attr.layout)?;
    self.context.run()?;
    let output = self.context.get_outputs()?;

    (0..num_outputs)
      .map(|index| {
        let n_elems = output
          .get_f32(index as usize)
          .map_err(|e| RknpuBackendError::OutputError(index, e.to_string()))?
          .len() as u32;
        Ok(TensorAttr {
          index,
          name: format!("output{}", index),
          dims: vec![1, n_elems],
          n_elems,
          size: n_elems * 4,
          layout: TensorLayout::Undefined,
          dtype: TensorType::Float32,
          quant: Quantization::IDENTITY,
        })
      })
      .collect()
  }
}

impl Accelerator for RknpuAccelerator {
  type Error = RknpuBackendError;

  fn query_io(&self) -> Result<(Vec<TensorAttr>, Vec<TensorAttr>), Self::Error> {
    Ok((vec![self.input_attr.clone()], self.output_attrs.clone()))
  }

  fn set_input(&self, index: u32, data: &[u8], layout: TensorLayout) -> Result<(), Self::Error> {
    if index != 0 {
      return Err(RknpuBackendError::UnsupportedInputIndex(index));
    }
    let format = match layout {
      TensorLayout::Nchw => TensorFormat::NCHW,
      TensorLayout::Nhwc | TensorLayout::Undefined => TensorFormat::NHWC,
    };
    self
      .context
      .set_input(0, data, format, rknpu::TensorType::UInt8)?;
    Ok(())
  }

  fn run(&self) -> Result<(), Self::Error> {
    self.context.run()?;
    Ok(())
  }

  fn output_f32(&self, index: u32) -> Result<Vec<f32>, Self::Error> {
    let output = self.context.get_outputs()?;
    let data = output
      .get_f32(index as usize)
      .map_err(|e| RknpuBackendError::OutputError(index, e.to_string()))?;
    Ok(data.to_vec())
  }
}
