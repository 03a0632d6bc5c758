// 该文件是 Shanan Classify （山南西风·分类） 项目的一部分。
// src/postprocess.rs - 分类后处理：softmax 与 top-k
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

//! 分类模型输出的后处理
//!
//! 加速器返回的是未归一化的 logits。这里先做数值稳定的 softmax，
//! 再按分数降序取前 K 个类别；分数相同时类别序号小的排在前面。
//! 这个平局规则本身没有语义，只是为了让同一输入每次得到相同的排序。

use std::cmp::Ordering;

/// 类别数不超过该值时直接全量排序
const FULL_SORT_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredClass {
  pub class_id: usize,
  pub score: f32,
}

/// 按分数降序排列的 K 个候选，第 0 个为最佳匹配
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
  items: Box<[ScoredClass]>,
}

impl ClassificationResult {
  pub fn top1(&self) -> &ScoredClass {
    &self.items[0]
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, ScoredClass> {
    self.items.iter()
  }

  pub fn as_slice(&self) -> &[ScoredClass] {
    &self.items
  }
}

/// 原地把 logits 变为概率分布
///
/// # Panics
///
/// `scores` 为空时 panic。
pub fn softmax(scores: &mut [f32]) {
  assert!(!scores.is_empty(), "softmax 输入不能为空");

  let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);

  let mut sum = 0.0f32;
  for s in scores.iter_mut() {
    *s = (*s - max).exp();
    sum += *s;
  }

  for s in scores.iter_mut() {
    *s /= sum;
  }
}

// 加 0.0 把 -0.0 归一为 +0.0，两者按相等处理
fn rank_order(a: &ScoredClass, b: &ScoredClass) -> Ordering {
  (b.score + 0.0)
    .total_cmp(&(a.score + 0.0))
    .then_with(|| a.class_id.cmp(&b.class_id))
}

/// 取分数最高的 `k` 个类别
///
/// # Panics
///
/// `k` 为 0 或大于 `scores.len()` 时 panic，调用方应在此之前完成校验。
pub fn top_k(scores: &[f32], k: usize) -> Vec<ScoredClass> {
  assert!(
    k >= 1 && k <= scores.len(),
    "top-k 越界: k={}, 类别数={}",
    k,
    scores.len()
  );

  let mut ranked: Vec<ScoredClass> = scores
    .iter()
    .enumerate()
    .map(|(class_id, &score)| ScoredClass { class_id, score })
    .collect();

  // rank_order 对不同 class_id 是全序，部分选择与全量排序结果一致
  if scores.len() > FULL_SORT_LIMIT && k < scores.len() {
    ranked.select_nth_unstable_by(k - 1, rank_order);
    ranked.truncate(k);
  }
  ranked.sort_unstable_by(rank_order);
  ranked.truncate(k);
  ranked
}

/// softmax 后取前 `k` 个
pub fn classify(scores: &mut [f32], k: usize) -> ClassificationResult {
  softmax(scores);
  ClassificationResult {
    items: top_k(scores, k).into_boxed_slice(),
  }
}
