// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/config.rs - 批量分类配置
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

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::preprocess::ResizeMode;

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch { expected: String, found: String },
  #[error("路径解码失败: {0}")]
  PathDecode(String),
  #[error("无法解析位置 '{0}': {1}")]
  InvalidLocation(String, String),
  #[error("top-k 必须至少为 1")]
  ZeroTopK,
}

/// 一次批量分类运行所需的全部配置
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  pub model_path: PathBuf,
  pub labels_path: PathBuf,
  pub input_dir: PathBuf,
  pub output_dir: PathBuf,
  pub top_k: usize,
  pub resize: ResizeMode,
  /// 是否在输出图像旁写入 JSON 结果记录
  pub record: bool,
}

impl PipelineConfig {
  pub fn new(
    model_path: impl Into<PathBuf>,
    labels_path: impl Into<PathBuf>,
    input_dir: impl Into<PathBuf>,
    output_dir: impl Into<PathBuf>,
  ) -> Self {
    Self {
      model_path: model_path.into(),
      labels_path: labels_path.into(),
      input_dir: input_dir.into(),
      output_dir: output_dir.into(),
      top_k: DEFAULT_TOP_K,
      resize: ResizeMode::default(),
      record: false,
    }
  }

  pub fn top_k(mut self, top_k: usize) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn resize(mut self, resize: ResizeMode) -> Self {
    self.resize = resize;
    self
  }

  pub fn record(mut self, record: bool) -> Self {
    self.record = record;
    self
  }

  /// 仅检查与模型无关的部分；类别数相关的检查在会话打开后进行
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.top_k == 0 {
      return Err(ConfigError::ZeroTopK);
    }
    Ok(())
  }
}

/// 从 `scheme:///path` 形式的 URL 中取出解码后的文件系统路径
pub fn path_from_url(url: &Url, scheme: &str) -> Result<PathBuf, ConfigError> {
  if url.scheme() != scheme {
    return Err(ConfigError::SchemeMismatch {
      expected: scheme.to_string(),
      found: url.scheme().to_string(),
    });
  }
  let decoded =
    urlencoding::decode(url.path()).map_err(|e| ConfigError::PathDecode(e.to_string()))?;
  Ok(PathBuf::from(decoded.into_owned()))
}

/// 命令行位置参数既可以是 URL，也可以是普通路径
///
/// 普通路径会被转为绝对路径并编码为 `scheme:///...`。
pub fn parse_location(raw: &str, scheme: &str) -> Result<Url, ConfigError> {
  if let Ok(url) = Url::parse(raw) {
    if url.scheme() != scheme {
      return Err(ConfigError::SchemeMismatch {
        expected: scheme.to_string(),
        found: url.scheme().to_string(),
      });
    }
    return Ok(url);
  }

  let path = Path::new(raw);
  let absolute = if path.is_absolute() {
    path.to_path_buf()
  } else {
    std::env::current_dir()
      .map_err(|e| ConfigError::InvalidLocation(raw.to_string(), e.to_string()))?
      .join(path)
  };

  let mut segments: Vec<String> = Vec::new();
  for component in absolute.components() {
    match component {
      Component::Normal(part) => segments.push(urlencoding::encode(&part.to_string_lossy()).into_owned()),
      Component::ParentDir => {
        segments.pop();
      }
      Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
    }
  }
  let encoded = segments.join("/");

  Url::parse(&format!("{}:///{}", scheme, encoded))
    .map_err(|e| ConfigError::InvalidLocation(raw.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn path_from_url_decodes_percent_escapes() {
    let url = Url::parse("folder:///data/my%20images").unwrap();
    let path = path_from_url(&url, "folder").unwrap();
    assert_eq!(path, PathBuf::from("/data/my images"));
  }

  #[test]
  fn path_from_url_rejects_other_schemes() {
    let url = Url::parse("rknn:///model.rknn").unwrap();
    assert!(matches!(
      path_from_url(&url, "folder"),
      Err(ConfigError::SchemeMismatch { .. })
    ));
  }

  #[test]
  fn plain_path_becomes_folder_url() {
    let url = parse_location("/tmp/out dir", "folder").unwrap();
    assert_eq!(url.scheme(), "folder");
    assert_eq!(
      path_from_url(&url, "folder").unwrap(),
      PathBuf::from("/tmp/out dir")
    );
  }

  #[test]
  fn parent_and_current_dirs_are_resolved() {
    let url = parse_location("/data/run/../images/./cats", "folder").unwrap();
    assert_eq!(
      path_from_url(&url, "folder").unwrap(),
      PathBuf::from("/data/images/cats")
    );
  }

  #[test]
  fn relative_parent_dir_resolves_against_cwd() {
    let cwd = std::env::current_dir().unwrap();
    let url = parse_location("../images", "folder").unwrap();
    let expected = cwd.parent().unwrap_or(&cwd).join("images");
    assert_eq!(path_from_url(&url, "folder").unwrap(), expected);
  }

  #[test]
  fn zero_top_k_is_rejected() {
    let config = PipelineConfig::new("m.rknn", "l.txt", "in", "out").top_k(0);
    assert!(matches!(config.validate(), Err(ConfigError::ZeroTopK)));
  }
}
