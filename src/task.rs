// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/task.rs - 批量分类任务
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
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  frame::ImageFrame,
  input::{ImageEntry, ImageFileInputError},
  model::{Accelerator, Classifier, SessionError},
  output::Render,
  postprocess::ClassificationResult,
  preprocess::AdaptError,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  fn run_task(self, input: I, model: &M, output: &O) -> Self::Output;
}

/// 单张图像在流水线中到达的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
  Loaded,
  Preprocessed,
  Inferred,
  PostProcessed,
  Annotated,
  Written,
  Failed,
}

impl fmt::Display for ImageState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ImageState::Loaded => "加载",
      ImageState::Preprocessed => "预处理",
      ImageState::Inferred => "推理",
      ImageState::PostProcessed => "后处理",
      ImageState::Annotated => "标注",
      ImageState::Written => "写出",
      ImageState::Failed => "失败",
    };
    f.write_str(name)
  }
}

/// 单张图像的可跳过错误
#[derive(Error, Debug)]
pub enum StageError {
  #[error("图像解码失败: {0}")]
  Decode(#[from] ImageFileInputError),
  #[error("预处理失败: {0}")]
  Preprocess(#[from] AdaptError),
  #[error("推理失败: {0}")]
  Inference(#[from] SessionError),
  #[error("标注失败: {0}")]
  Annotate(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("写出失败: {0}")]
  Write(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StageError {
  /// 失败时正在尝试进入的阶段
  pub fn stage(&self) -> ImageState {
    match self {
      StageError::Decode(_) => ImageState::Loaded,
      StageError::Preprocess(_) => ImageState::Preprocessed,
      StageError::Inference(_) => ImageState::Inferred,
      StageError::Annotate(_) => ImageState::Annotated,
      StageError::Write(_) => ImageState::Written,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
  pub name: String,
  pub stage: ImageState,
  pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
  pub written: usize,
  pub skipped: Vec<SkippedImage>,
  pub cancelled: bool,
  pub elapsed: Duration,
}

impl BatchSummary {
  pub fn processed(&self) -> usize {
    self.written + self.skipped.len()
  }
}

/// 单张图像的处理流程，任何一步失败都会丢弃该图像的全部缓冲区
pub struct ImageJob<'a, A, O> {
  entry: &'a ImageEntry,
  classifier: &'a Classifier<A>,
  output: &'a O,
  state: Option<ImageState>,
}

impl<'a, A, O, RE> ImageJob<'a, A, O>
where
  A: Accelerator,
  O: Render<ImageFrame, ClassificationResult, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  pub fn new(entry: &'a ImageEntry, classifier: &'a Classifier<A>, output: &'a O) -> Self {
    Self {
      entry,
      classifier,
      output,
      state: None,
    }
  }

  /// 尚未成功加载时为 `None`
  pub fn state(&self) -> Option<ImageState> {
    self.state
  }

  fn advance(&mut self, state: ImageState) {
    debug!("{}: 进入{}阶段", self.entry.name(), state);
    self.state = Some(state);
  }

  pub fn run(&mut self) -> Result<PathBuf, StageError> {
    let result = self.run_stages();
    if result.is_err() {
      self.state = Some(ImageState::Failed);
    }
    result
  }

  fn run_stages(&mut self) -> Result<PathBuf, StageError> {
    let frame = self.entry.load()?;
    self.advance(ImageState::Loaded);

    let now = Instant::now();
    let adapted = self.classifier.preprocess(&frame)?;
    self.advance(ImageState::Preprocessed);

    let output = self.classifier.forward(&adapted)?;
    drop(adapted);
    self.advance(ImageState::Inferred);

    let result = self.classifier.postprocess(output);
    self.advance(ImageState::PostProcessed);
    let infer_elapsed = now.elapsed();

    let now = Instant::now();
    let annotated = self
      .output
      .annotate(&frame, &result)
      .map_err(|e| StageError::Annotate(Box::new(e)))?;
    self.advance(ImageState::Annotated);

    let path = self
      .output
      .write(&self.entry.stem(), annotated, &result)
      .map_err(|e| StageError::Write(Box::new(e)))?;
    self.advance(ImageState::Written);

    let top1 = result.top1();
    info!(
      "{}: 类别 {} 分数 {:.6}, 推理耗时: {:.2?}, 渲染耗时: {:.2?}",
      self.entry.name(),
      top1.class_id,
      top1.score,
      infer_elapsed,
      now.elapsed()
    );
    Ok(path)
  }
}

/// 按目录枚举顺序逐张处理，单张失败只记录并跳过
#[derive(Default, Debug)]
pub struct BatchTask {
  cancel: Option<Receiver<()>>,
}

impl BatchTask {
  pub fn with_cancel(mut self, cancel: Option<Receiver<()>>) -> Self {
    self.cancel = cancel;
    self
  }

  fn cancelled(&self) -> bool {
    self.cancel.as_ref().is_some_and(|rx| rx.try_recv().is_ok())
  }
}

impl<I, A, O, RE> Task<I, Classifier<A>, O> for BatchTask
where
  I: Iterator<Item = ImageEntry>,
  A: Accelerator,
  O: Render<ImageFrame, ClassificationResult, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Output = BatchSummary;

  fn run_task(self, input: I, model: &Classifier<A>, output: &O) -> Self::Output {
    info!("开始批量分类任务...");
    let start = Instant::now();
    let mut summary = BatchSummary::default();

    for entry in input {
      if self.cancelled() {
        warn!("中断信号接收，退出任务循环");
        summary.cancelled = true;
        break;
      }

      let mut job = ImageJob::new(&entry, model, output);
      match job.run() {
        Ok(path) => {
          debug!("{} 已写出到 {}", entry.name(), path.display());
          summary.written += 1;
        }
        Err(e) => {
          warn!("跳过图像 {}: 在{}阶段失败: {}", entry.name(), e.stage(), e);
          summary.skipped.push(SkippedImage {
            name: entry.name(),
            stage: e.stage(),
            reason: e.to_string(),
          });
        }
      }
    }

    summary.elapsed = start.elapsed();
    info!(
      "任务结束: 写出 {} 张, 跳过 {} 张, 耗时: {:.2?}{}",
      summary.written,
      summary.skipped.len(),
      summary.elapsed,
      if summary.cancelled { " (已中断)" } else { "" }
    );
    summary
  }
}
