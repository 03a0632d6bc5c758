// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// tests/batch.rs - 批量分类集成测试
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

use std::path::Path;
use std::sync::mpsc;

use image::{Rgb, RgbImage};
use thiserror::Error;

use shanan_classify::{
  config::PipelineConfig,
  model::{Accelerator, Quantization, TensorAttr, TensorLayout, TensorType},
  pipeline::{Pipeline, PipelineError},
  preprocess::ResizeMode,
  task::ImageState,
};

#[derive(Error, Debug)]
#[error("测试加速器故障")]
struct Fault;

/// 输入 4x4 NHWC，输出固定 logits
struct FixedLogits {
  logits: Vec<f32>,
}

impl Accelerator for FixedLogits {
  type Error = Fault;

  fn query_io(&self) -> Result<(Vec<TensorAttr>, Vec<TensorAttr>), Self::Error> {
    let input = TensorAttr {
      index: 0,
      name: "images".to_string(),
      dims: vec![1, 4, 4, 3],
      n_elems: 48,
      size: 48,
      layout: TensorLayout::Nhwc,
      dtype: TensorType::UInt8,
      quant: Quantization::IDENTITY,
    };
    let n = self.logits.len() as u32;
    let output = TensorAttr {
      index: 0,
      name: "logits".to_string(),
      dims: vec![1, n],
      n_elems: n,
      size: n * 4,
      layout: TensorLayout::Undefined,
      dtype: TensorType::Float32,
      quant: Quantization::IDENTITY,
    };
    Ok((vec![input], vec![output]))
  }

  fn set_input(&self, _index: u32, data: &[u8], _layout: TensorLayout) -> Result<(), Self::Error> {
    assert_eq!(data.len(), 48);
    Ok(())
  }

  fn run(&self) -> Result<(), Self::Error> {
    Ok(())
  }

  fn output_f32(&self, _index: u32) -> Result<Vec<f32>, Self::Error> {
    Ok(self.logits.clone())
  }
}

fn animal_logits(_: &Path) -> Result<FixedLogits, Fault> {
  Ok(FixedLogits {
    logits: vec![0.1, -2.0, 6.5, 1.0, 0.0, 6.4, -1.0, 2.0, 0.3, 0.2, -0.5],
  })
}

fn animals_labels() -> &'static Path {
  Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/labels/animals.txt"))
}

fn write_png(dir: &Path, name: &str, w: u32, h: u32) {
  RgbImage::from_pixel(w, h, Rgb([200, 120, 40]))
    .save(dir.join(name))
    .unwrap();
}

#[test]
fn one_corrupt_image_is_skipped_and_the_rest_written() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("in");
  let output = dir.path().join("out");
  std::fs::create_dir(&input).unwrap();
  write_png(&input, "cat.png", 32, 24);
  write_png(&input, "dog.png", 16, 16);
  write_png(&input, "horse.PNG", 40, 10);
  std::fs::write(input.join("broken.jpg"), b"\xff\xd8 truncated").unwrap();
  std::fs::write(input.join("README.txt"), b"not an image").unwrap();

  let config = PipelineConfig::new("model.rknn", animals_labels(), &input, &output)
    .top_k(3)
    .record(true);
  let pipeline = Pipeline::open(&config, animal_logits).unwrap();
  let summary = pipeline.run(None);

  assert_eq!(summary.written, 3);
  assert_eq!(summary.skipped.len(), 1);
  assert_eq!(summary.skipped[0].name, "broken.jpg");
  assert_eq!(summary.skipped[0].stage, ImageState::Loaded);
  assert!(!summary.cancelled);

  for stem in ["cat", "dog", "horse"] {
    let annotated = image::open(output.join(format!("{}.jpg", stem))).unwrap();
    assert!(annotated.width() > 0);
    let record: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(output.join(format!("{}.json", stem))).unwrap())
        .unwrap();
    assert_eq!(record["top_k"][0]["class_id"], 2);
    assert_eq!(record["top_k"][0]["label"], "cat");
    assert_eq!(record["top_k"][1]["label"], "dog");
    assert_eq!(record["top_k"].as_array().unwrap().len(), 3);
  }
  assert!(!output.join("broken.jpg").exists());
}

#[test]
fn annotated_image_keeps_source_size() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("in");
  let output = dir.path().join("out");
  std::fs::create_dir(&input).unwrap();
  write_png(&input, "wide.png", 120, 45);

  let config = PipelineConfig::new("model.rknn", animals_labels(), &input, &output)
    .top_k(1)
    .resize(ResizeMode::Letterbox {
      color: [114, 114, 114],
    });
  let summary = Pipeline::open(&config, animal_logits).unwrap().run(None);

  assert_eq!(summary.written, 1);
  let annotated = image::open(output.join("wide.jpg")).unwrap();
  assert_eq!((annotated.width(), annotated.height()), (120, 45));
  assert!(!output.join("wide.json").exists());
}

#[test]
fn labels_shorter_than_class_count_abort_before_processing() {
  let dir = tempfile::tempdir().unwrap();
  let labels = dir.path().join("labels.txt");
  std::fs::write(&labels, "butterfly\ncarpet\ncat\n").unwrap();
  let input = dir.path().join("in");
  std::fs::create_dir(&input).unwrap();
  write_png(&input, "cat.png", 8, 8);

  let config = PipelineConfig::new("model.rknn", &labels, &input, dir.path().join("out"));
  assert!(matches!(
    Pipeline::open(&config, animal_logits),
    Err(PipelineError::ConfigurationMismatch(_))
  ));
}

#[test]
fn missing_input_directory_is_fatal() {
  let dir = tempfile::tempdir().unwrap();
  let config = PipelineConfig::new(
    "model.rknn",
    animals_labels(),
    dir.path().join("does-not-exist"),
    dir.path().join("out"),
  );
  assert!(matches!(
    Pipeline::open(&config, animal_logits),
    Err(PipelineError::FatalInit { .. })
  ));
}

#[test]
fn cancelled_run_processes_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let input = dir.path().join("in");
  std::fs::create_dir(&input).unwrap();
  write_png(&input, "a.png", 8, 8);
  write_png(&input, "b.png", 8, 8);

  let config = PipelineConfig::new("model.rknn", animals_labels(), &input, dir.path().join("out"));
  let (tx, rx) = mpsc::channel();
  tx.send(()).unwrap();
  let summary = Pipeline::open(&config, animal_logits).unwrap().run(Some(rx));

  assert!(summary.cancelled);
  assert_eq!(summary.written, 0);
}
