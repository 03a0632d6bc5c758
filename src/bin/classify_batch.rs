// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/bin/classify_batch.rs - 批量图像分类
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
use std::process::ExitCode;
use std::sync::mpsc;
use std::{thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use shanan_classify::{
  FromUrl, FromUrlWithScheme,
  config::{DEFAULT_TOP_K, PipelineConfig, parse_location, path_from_url},
  input::ImageDirectoryInput,
  model::RknpuAcceleratorBuilder,
  output::OutputDirectory,
  pipeline::Pipeline,
  preprocess::ResizeMode,
  task::BatchSummary,
};

const FATAL_EXIT_CODE: u8 = 255;

/// 批量图像分类参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// RKNN 模型位置，路径或 rknn:///model.rknn?shape=1,224,224,3&format=nhwc
  #[arg(long, value_name = "MODEL")]
  pub model: String,
  /// 标签文件，每行一个类别名
  #[arg(long, value_name = "LABELS")]
  pub labels: PathBuf,
  /// 输入图像目录，路径或 folder:///dir
  #[arg(long, value_name = "SOURCE")]
  pub input: String,
  /// 输出目录，路径或 folder:///dir[?record]
  #[arg(long, value_name = "OUTPUT")]
  pub output: String,
  /// 每张图像保留的候选数量
  #[arg(long, default_value_t = DEFAULT_TOP_K, value_name = "K")]
  pub top_k: usize,
  /// 缩放方式: stretch, letterbox, letterbox:R,G,B
  #[arg(long, default_value = "stretch", value_name = "MODE")]
  pub resize: ResizeMode,
  /// 在输出图像旁写入 JSON 结果记录
  #[arg(long)]
  pub record: bool,
}

fn run(args: Args) -> Result<BatchSummary> {
  let model_url = parse_location(&args.model, RknpuAcceleratorBuilder::SCHEME)
    .with_context(|| format!("模型位置无效: {}", args.model))?;
  let builder = RknpuAcceleratorBuilder::from_url(&model_url)?;

  let input_url = parse_location(&args.input, ImageDirectoryInput::SCHEME)
    .with_context(|| format!("输入位置无效: {}", args.input))?;
  let input_dir = path_from_url(&input_url, ImageDirectoryInput::SCHEME)?;

  let output_url = parse_location(&args.output, OutputDirectory::SCHEME)
    .with_context(|| format!("输出位置无效: {}", args.output))?;
  let output = OutputDirectory::from_url(&output_url)?;

  info!("模型位置: {}", model_url);
  info!("输入来源: {}", input_url);
  info!("输出路径: {}", output_url);

  let config = PipelineConfig::new(builder.model_path(), args.labels, input_dir, output.directory())
    .top_k(args.top_k)
    .resize(args.resize)
    .record(args.record || output.records());

  let pipeline = Pipeline::open(&config, |_| builder.build())?;

  let (tx, rx) = mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，处理完当前图像后退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(i32::from(FATAL_EXIT_CODE));
    });
  })
  .context("无法设置 Ctrl-C 处理函数")?;

  Ok(pipeline.run(Some(rx)))
}

fn main() -> ExitCode {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  match run(args) {
    Ok(summary) => {
      info!(
        "共处理 {} 张图像, 成功 {} 张, 跳过 {} 张",
        summary.processed(),
        summary.written,
        summary.skipped.len()
      );
      ExitCode::SUCCESS
    }
    Err(e) => {
      error!("{:#}", e);
      ExitCode::from(FATAL_EXIT_CODE)
    }
  }
}
