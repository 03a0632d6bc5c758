// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/bin/classify_oneshot.rs - 单张图像分类
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

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use shanan_classify::{
  FromUrl, FromUrlWithScheme,
  config::{DEFAULT_TOP_K, parse_location},
  input::ImageEntry,
  label::LabelTable,
  model::{Classifier, Model, ModelSession, RknpuAcceleratorBuilder},
  output::{OutputDirectory, Render},
  preprocess::ResizeMode,
};

/// 单张图像分类参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// RKNN 模型位置，路径或 rknn:///model.rknn?shape=1,224,224,3&format=nhwc
  #[arg(long, value_name = "MODEL")]
  pub model: String,
  /// 标签文件，每行一个类别名
  #[arg(long, value_name = "LABELS")]
  pub labels: PathBuf,
  /// 输入图像文件
  #[arg(long, value_name = "IMAGE")]
  pub image: PathBuf,
  /// 可选输出目录，给出时保存标注图像
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<String>,
  /// 打印的候选数量
  #[arg(long, default_value_t = DEFAULT_TOP_K, value_name = "K")]
  pub top_k: usize,
  /// 缩放方式: stretch, letterbox, letterbox:R,G,B
  #[arg(long, default_value = "stretch", value_name = "MODE")]
  pub resize: ResizeMode,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  let labels = LabelTable::load(&args.labels)?;
  let model_url = parse_location(&args.model, RknpuAcceleratorBuilder::SCHEME)?;
  let accelerator = RknpuAcceleratorBuilder::from_url(&model_url)?.build()?;
  let session = ModelSession::open(accelerator)?;
  let model = Classifier::new(session, args.top_k, args.resize)?;

  let entry = ImageEntry::new(&args.image);
  let frame = entry
    .load()
    .with_context(|| format!("无法读取图像 {}", args.image.display()))?;

  info!("开始推理...");
  let now = std::time::Instant::now();
  let result = model.infer(&frame)?;
  info!("推理完成，耗时: {:.2?}", now.elapsed());

  for (rank, item) in result.iter().enumerate() {
    println!(
      "{:>2}: [{:>4}] {:<16} {:.6}",
      rank + 1,
      item.class_id,
      labels.get(item.class_id).unwrap_or("<未知>"),
      item.score
    );
  }

  if let Some(output) = &args.output {
    let url = parse_location(output, OutputDirectory::SCHEME)?;
    let output = OutputDirectory::from_url(&url)?.open(labels)?;
    let path = output.render_result(&entry.stem(), &frame, &result)?;
    info!("保存图像到文件: {}", path.display());
  }

  Ok(())
}
