// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/label.rs - 类别标签表
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

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标签文件 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("标签文件为空: {0}")]
  Empty(PathBuf),
}

/// 与模型输出序号一一对应的类别名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  names: Box<[String]>,
}

impl LabelTable {
  /// 每行一个类别名；行尾空白会被去掉，末尾的空行被忽略
  pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
      path: path.to_path_buf(),
      source,
    })?;

    let table = Self::parse(&text);
    if table.is_empty() {
      return Err(LabelError::Empty(path.to_path_buf()));
    }
    debug!("标签数量: {}", table.len());
    Ok(table)
  }

  pub fn parse(text: &str) -> Self {
    let mut names: Vec<String> = text.lines().map(|l| l.trim_end().to_string()).collect();
    while names.last().is_some_and(|n| n.is_empty()) {
      names.pop();
    }
    Self {
      names: names.into_boxed_slice(),
    }
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}
