// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/output/record.rs - 分类结果记录
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

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::{label::LabelTable, postprocess::ClassificationResult};

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

fn record_value(stem: &str, result: &ClassificationResult, labels: &LabelTable) -> Value {
  let top_k: Vec<Value> = result
    .iter()
    .enumerate()
    .map(|(rank, item)| {
      json!({
        "rank": rank + 1,
        "class_id": item.class_id,
        "label": labels.get(item.class_id),
        "score": item.score,
      })
    })
    .collect();

  json!({
    "image": stem,
    "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    "top_k": top_k,
  })
}

/// 在 `directory` 下写入 `<stem>.json`
pub fn write_record(
  directory: &Path,
  stem: &str,
  result: &ClassificationResult,
  labels: &LabelTable,
) -> Result<PathBuf, RecordError> {
  let path = directory.join(format!("{}.json", stem));
  let text = serde_json::to_string_pretty(&record_value(stem, result, labels))?;
  std::fs::write(&path, text)?;
  debug!("写入结果记录: {}", path.display());
  Ok(path)
}
