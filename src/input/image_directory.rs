// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/input/image_directory.rs - 图像目录输入
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

use std::fs::ReadDir;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  config::path_from_url,
  frame::ImageFrame,
  input::read_image_file::{ImageFileInputError, read_image},
};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// 目录中的一张待处理图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
  path: PathBuf,
}

impl ImageEntry {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// 用于日志的图像标识
  pub fn name(&self) -> String {
    self
      .path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.path.display().to_string())
  }

  /// 去掉目录与最后一个扩展名后的文件名
  pub fn stem(&self) -> String {
    self
      .path
      .file_stem()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default()
  }

  pub fn load(&self) -> Result<ImageFrame, ImageFileInputError> {
    read_image(&self.path)
  }
}

fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// 按目录枚举顺序产出图像文件，不保证字典序
pub struct ImageDirectoryInput {
  directory: PathBuf,
  entries: ReadDir,
}

impl FromUrlWithScheme for ImageDirectoryInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ImageDirectoryInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let path = path_from_url(url, Self::SCHEME).map_err(|e| {
      error!("输入目录 URI 无效: {}", e);
      ImageFileInputError::SchemeMismatch(e.to_string())
    })?;
    Self::open(path)
  }
}

impl ImageDirectoryInput {
  pub fn open(directory: impl Into<PathBuf>) -> Result<Self, ImageFileInputError> {
    let directory = directory.into();
    let entries = std::fs::read_dir(&directory)?;
    debug!("打开输入目录: {}", directory.display());
    Ok(Self { directory, entries })
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }
}

impl Iterator for ImageDirectoryInput {
  type Item = ImageEntry;

  fn next(&mut self) -> Option<Self::Item> {
    for entry in self.entries.by_ref() {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          warn!("读取目录项失败 {}: {}", self.directory.display(), e);
          continue;
        }
      };
      let path = entry.path();
      if !path.is_file() || !is_image_file(&path) {
        debug!("跳过非图像文件: {}", path.display());
        continue;
      }
      return Some(ImageEntry::new(path));
    }
    None
  }
}
