// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::path_from_url,
  frame::{ImageFrame, PixelFormat},
  label::LabelTable,
  output::{
    AnnotateError, Render, compose_label,
    draw::Draw,
    record::{RecordError, write_record},
  },
  postprocess::ClassificationResult,
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无法加载嵌入的字体文件: {0}")]
  FontError(ab_glyph::InvalidFont),
  #[error("无法标注 {0} 格式的图像")]
  UnsupportedFormat(PixelFormat),
  #[error("标注错误: {0}")]
  Annotate(#[from] AnnotateError),
  #[error("记录错误: {0}")]
  Record(#[from] RecordError),
}

impl From<std::io::Error> for SaveImageFileError {
  fn from(err: std::io::Error) -> Self {
    SaveImageFileError::IoError(err)
  }
}

impl From<image::ImageError> for SaveImageFileError {
  fn from(err: image::ImageError) -> Self {
    SaveImageFileError::ImageError(err)
  }
}

/// 输出目录位置，`folder:///path?record` 表示同时写入 JSON 记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirectory {
  directory: PathBuf,
  record: bool,
}

impl FromUrlWithScheme for OutputDirectory {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for OutputDirectory {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    let directory = path_from_url(uri, Self::SCHEME)
      .map_err(|e| SaveImageFileError::SchemeMismatch(e.to_string()))?;
    let record = uri.query_pairs().any(|(k, _)| k == "record");
    Ok(OutputDirectory { directory, record })
  }
}

impl OutputDirectory {
  pub fn new(directory: impl Into<PathBuf>, record: bool) -> Self {
    Self {
      directory: directory.into(),
      record,
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn records(&self) -> bool {
    self.record
  }

  /// 创建目录（已存在则复用）并加载字体
  pub fn open(self, labels: LabelTable) -> Result<AnnotatedImageOutput, SaveImageFileError> {
    std::fs::create_dir_all(&self.directory)?;
    info!("输出目录: {}", self.directory.display());
    let draw = Draw::new().map_err(SaveImageFileError::FontError)?;
    Ok(AnnotatedImageOutput {
      directory: self.directory,
      record: self.record,
      labels,
      draw,
    })
  }
}

/// 把最佳类别标注在源图像上，保存为 `<stem>.jpg`
pub struct AnnotatedImageOutput {
  directory: PathBuf,
  record: bool,
  labels: LabelTable,
  draw: Draw,
}

impl AnnotatedImageOutput {
  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }
}

impl Render<ImageFrame, ClassificationResult> for AnnotatedImageOutput {
  type Annotated = RgbImage;
  type Error = SaveImageFileError;

  fn annotate(
    &self,
    frame: &ImageFrame,
    result: &ClassificationResult,
  ) -> Result<Self::Annotated, Self::Error> {
    let text = compose_label(result.top1(), &self.labels)?;
    debug!("标注文本: {}", text);
    self
      .draw
      .annotate(frame, &text)
      .ok_or(SaveImageFileError::UnsupportedFormat(frame.format()))
  }

  fn write(
    &self,
    stem: &str,
    annotated: Self::Annotated,
    result: &ClassificationResult,
  ) -> Result<PathBuf, Self::Error> {
    let path = self.directory.join(format!("{}.jpg", stem));
    annotated.save(&path)?;
    debug!("保存图像到文件: {}", path.display());

    if self.record {
      write_record(&self.directory, stem, result, &self.labels)?;
    }
    Ok(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::postprocess::classify;

  fn result_for(logits: &[f32]) -> ClassificationResult {
    let mut scores = logits.to_vec();
    classify(&mut scores, 1)
  }

  #[test]
  fn output_directory_from_url() {
    let url = Url::parse("folder:///tmp/out%20put?record").unwrap();
    let output = OutputDirectory::from_url(&url).unwrap();
    assert_eq!(output.directory(), Path::new("/tmp/out put"));
    assert!(output.records());

    let url = Url::parse("folder:///tmp/out").unwrap();
    assert!(!OutputDirectory::from_url(&url).unwrap().records());
  }

  #[test]
  fn writes_jpg_named_after_stem() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("nested/out");
    let output = OutputDirectory::new(&target, false)
      .open(LabelTable::parse("cat\ndog\n"))
      .unwrap();
    assert!(target.is_dir());

    let frame = ImageFrame::zeroed(64, 48, PixelFormat::Rgb888);
    let path = output
      .render_result("img.01", &frame, &result_for(&[0.0, 1.0]))
      .unwrap();
    assert_eq!(path, target.join("img.01.jpg"));

    let saved = image::open(&path).unwrap();
    assert_eq!((saved.width(), saved.height()), (64, 48));
    assert!(!target.join("img.01.json").exists());
  }

  #[test]
  fn record_flag_writes_json_alongside() {
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDirectory::new(dir.path(), true)
      .open(LabelTable::parse("cat\ndog\n"))
      .unwrap();
    let frame = ImageFrame::zeroed(32, 32, PixelFormat::Rgb888);
    output
      .render_result("a", &frame, &result_for(&[2.0, 1.0]))
      .unwrap();
    assert!(dir.path().join("a.jpg").is_file());
    assert!(dir.path().join("a.json").is_file());
  }

  #[test]
  fn class_beyond_labels_fails_annotation() {
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDirectory::new(dir.path(), false)
      .open(LabelTable::parse("cat\n"))
      .unwrap();
    let frame = ImageFrame::zeroed(32, 32, PixelFormat::Rgb888);
    assert!(matches!(
      output.annotate(&frame, &result_for(&[0.0, 5.0])),
      Err(SaveImageFileError::Annotate(_))
    ));
  }
}
