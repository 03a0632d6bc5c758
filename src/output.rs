// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/output.rs - 输出定义
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

use std::path::PathBuf;

use thiserror::Error;

use crate::{label::LabelTable, postprocess::ScoredClass};

/// 把一张图像的结果落地：先标注，再写出
pub trait Render<Frame, Output> {
  type Annotated;
  type Error;

  fn annotate(&self, frame: &Frame, result: &Output) -> Result<Self::Annotated, Self::Error>;

  /// 以 `stem` 为文件名写出，返回写出的图像路径
  fn write(
    &self,
    stem: &str,
    annotated: Self::Annotated,
    result: &Output,
  ) -> Result<PathBuf, Self::Error>;

  fn render_result(&self, stem: &str, frame: &Frame, result: &Output) -> Result<PathBuf, Self::Error> {
    let annotated = self.annotate(frame, result)?;
    self.write(stem, annotated, result)
  }
}

pub mod draw;
mod record;
mod save_image_file;

pub use self::record::{RecordError, write_record};
pub use self::save_image_file::{AnnotatedImageOutput, OutputDirectory, SaveImageFileError};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnnotateError {
  #[error("类别序号 {class_id} 超出标签表范围 (共 {labels} 个标签)")]
  LabelOutOfRange { class_id: usize, labels: usize },
}

/// 生成叠加在图像上的文本 `"<标签>:<六位小数分数>"`
pub fn compose_label(top1: &ScoredClass, labels: &LabelTable) -> Result<String, AnnotateError> {
  let label = labels
    .get(top1.class_id)
    .ok_or(AnnotateError::LabelOutOfRange {
      class_id: top1.class_id,
      labels: labels.len(),
    })?;
  Ok(format!("{}:{:.6}", label, top1.score))
}
