// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/pipeline.rs - 批量分类流水线
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
use std::sync::mpsc::Receiver;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  config::PipelineConfig,
  input::ImageDirectoryInput,
  label::LabelTable,
  model::{Accelerator, Classifier, ClassifyError, ModelSession, SessionError},
  output::{AnnotatedImageOutput, OutputDirectory},
  task::{BatchSummary, BatchTask, Task},
};

/// 初始化阶段的致命错误，进程以非零状态退出
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("{resource}初始化失败 ({}): {reason}", .path.display())]
  FatalInit {
    resource: &'static str,
    path: PathBuf,
    reason: String,
  },
  #[error("配置不匹配: {0}")]
  ConfigurationMismatch(String),
}

impl PipelineError {
  fn fatal(resource: &'static str, path: &Path, reason: impl ToString) -> Self {
    let err = PipelineError::FatalInit {
      resource,
      path: path.to_path_buf(),
      reason: reason.to_string(),
    };
    error!("{}", err);
    err
  }

  fn mismatch(reason: impl ToString) -> Self {
    let err = PipelineError::ConfigurationMismatch(reason.to_string());
    error!("{}", err);
    err
  }
}

/// 已完成初始化的流水线：标签、模型会话、输入目录与输出目录
pub struct Pipeline<A> {
  classifier: Classifier<A>,
  input: ImageDirectoryInput,
  output: AnnotatedImageOutput,
}

impl<A: Accelerator> Pipeline<A> {
  /// 依次加载标签、模型、输入目录与输出目录，任一失败即终止
  ///
  /// `loader` 接收模型路径并返回已加载的加速器。
  pub fn open<F>(config: &PipelineConfig, loader: F) -> Result<Self, PipelineError>
  where
    F: FnOnce(&Path) -> Result<A, A::Error>,
  {
    config.validate().map_err(PipelineError::mismatch)?;

    let labels = LabelTable::load(&config.labels_path)
      .map_err(|e| PipelineError::fatal("标签", &config.labels_path, e))?;

    let accelerator =
      loader(&config.model_path).map_err(|e| PipelineError::fatal("模型", &config.model_path, e))?;
    let session = ModelSession::open(accelerator).map_err(|e| match e {
      SessionError::Geometry(_) => PipelineError::mismatch(e),
      e => PipelineError::fatal("模型", &config.model_path, e),
    })?;

    let classes = session.num_classes();
    if labels.len() < classes {
      return Err(PipelineError::mismatch(format!(
        "标签数量 {} 少于模型类别数 {}",
        labels.len(),
        classes
      )));
    }
    if labels.len() > classes {
      warn!("标签数量 {} 多于模型类别数 {}, 多余标签不会被使用", labels.len(), classes);
    }

    let classifier = Classifier::new(session, config.top_k, config.resize).map_err(|e| match e {
      ClassifyError::TopKOutOfRange { .. } => PipelineError::mismatch(e),
      e => PipelineError::fatal("模型", &config.model_path, e),
    })?;

    let input = ImageDirectoryInput::open(&config.input_dir)
      .map_err(|e| PipelineError::fatal("输入目录", &config.input_dir, e))?;

    let output = OutputDirectory::new(&config.output_dir, config.record)
      .open(labels)
      .map_err(|e| PipelineError::fatal("输出目录", &config.output_dir, e))?;

    info!(
      "流水线初始化完成: {} 个类别, top-k = {}, 缩放方式 {:?}",
      classes, config.top_k, config.resize
    );
    Ok(Self {
      classifier,
      input,
      output,
    })
  }

  pub fn classifier(&self) -> &Classifier<A> {
    &self.classifier
  }

  /// 处理输入目录中的全部图像；`cancel` 收到消息后在下一张图像前停止
  pub fn run(self, cancel: Option<Receiver<()>>) -> BatchSummary {
    BatchTask::default()
      .with_cancel(cancel)
      .run_task(self.input, &self.classifier, &self.output)
  }
}
