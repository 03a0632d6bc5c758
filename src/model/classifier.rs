// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/model/classifier.rs - 图像分类模型
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
use tracing::debug;

use crate::{
  frame::ImageFrame,
  model::{Accelerator, Model, ModelSession, OutputTensor, SessionError},
  postprocess::{ClassificationResult, classify},
  preprocess::{AdaptError, ResizeMode, adapt},
};

#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("top-k 为 {k}, 但模型只有 {classes} 个类别")]
  TopKOutOfRange { k: usize, classes: usize },
  #[error("预处理失败: {0}")]
  Preprocess(#[from] AdaptError),
  #[error("推理失败: {0}")]
  Inference(#[from] SessionError),
}

/// 单输出分类模型：预处理、推理、softmax + top-k
pub struct Classifier<A> {
  session: ModelSession<A>,
  top_k: usize,
  resize: ResizeMode,
}

impl<A: Accelerator> Classifier<A> {
  pub fn new(session: ModelSession<A>, top_k: usize, resize: ResizeMode) -> Result<Self, ClassifyError> {
    let classes = session.num_classes();
    if top_k == 0 || top_k > classes {
      return Err(ClassifyError::TopKOutOfRange { k: top_k, classes });
    }
    Ok(Self {
      session,
      top_k,
      resize,
    })
  }

  pub fn session(&self) -> &ModelSession<A> {
    &self.session
  }

  pub fn top_k(&self) -> usize {
    self.top_k
  }

  pub fn num_classes(&self) -> usize {
    self.session.num_classes()
  }

  pub fn preprocess(&self, frame: &ImageFrame) -> Result<ImageFrame, AdaptError> {
    adapt(frame, self.session.geometry(), self.resize)
  }

  pub fn forward(&self, input: &ImageFrame) -> Result<OutputTensor, SessionError> {
    self.session.forward(input)
  }

  pub fn postprocess(&self, mut output: OutputTensor) -> ClassificationResult {
    debug!("后处理第 {} 个输出", output.index());
    classify(output.as_mut_slice(), self.top_k)
  }
}

impl<A: Accelerator> Model for Classifier<A> {
  type Input = ImageFrame;
  type Output = ClassificationResult;
  type Error = ClassifyError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let adapted = self.preprocess(input)?;
    let output = self.forward(&adapted)?;
    Ok(self.postprocess(output))
  }
}
