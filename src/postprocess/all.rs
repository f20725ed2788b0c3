// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/postprocess/all.rs - 全部区域后处理
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

use tracing::{debug, warn};

use crate::{
  geometry::Bounds,
  mask::Mask,
  postprocess::{PolygonCanvas, Postprocess, RegionOutput},
  result::{DetectionResult, PostprocessInput, Regions, clean_label},
};

const LABEL_SEPARATOR: &str = ", ";

/// 合并所有区域：掩码取并集，边界取并集，标签逗号拼接并去重
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllRegionsPostprocess;

/// 标签累加器。去重按子串包含判断，`"cat"` 已存在时 `"ca"` 不会再追加。
/// 分隔符取决于区域在列表中的位置，不是已追加的个数：被跳过的首个区域之后，
/// 第二个区域的标签仍以 `", "` 开头。
#[derive(Debug, Default)]
struct LabelAccumulator {
  label: String,
  count: usize,
}

impl LabelAccumulator {
  fn push(&mut self, label: &str, position: usize) {
    if !self.label.contains(label) {
      if position > 0 {
        self.label.push_str(LABEL_SEPARATOR);
      }
      self.label.push_str(label);
    }
    self.count += 1;
  }

  fn finish(self) -> String {
    self.label
  }
}

/// 边界并集，没有任何区域参与时退化为全零边界
struct UnionBounds {
  bounds: Bounds,
  touched: bool,
}

impl UnionBounds {
  fn new(width: u32, height: u32) -> Self {
    Self {
      bounds: Bounds::inverted(width, height),
      touched: false,
    }
  }

  fn add(&mut self, bounds: &Bounds) {
    self.bounds = self.bounds.union(bounds);
    self.touched = true;
  }

  fn finish(self) -> Bounds {
    if self.touched {
      self.bounds
    } else {
      Bounds::empty()
    }
  }
}

impl AllRegionsPostprocess {
  fn apply_boxes(result: &DetectionResult, bboxes: &[Vec<f32>], labels: &[String]) -> RegionOutput {
    let (width, height) = (result.width(), result.height());
    let mut mask = Mask::zeros(height as usize, width as usize);
    let mut union = UnionBounds::new(width, height);
    let mut label = LabelAccumulator::default();

    for (position, (coords, raw_label)) in bboxes.iter().zip(labels).enumerate() {
      let Some(bounds) = Bounds::from_box(coords) else {
        warn!("跳过无效的边界框: {:?}", coords);
        continue;
      };
      label.push(clean_label(raw_label), position);
      union.add(&bounds);
      mask.fill_rect(&bounds);
    }

    debug!("合并了 {} 个边界框", label.count);
    RegionOutput::from_bounds(mask, label.finish(), union.finish(), width, height)
  }

  fn apply_polygons(
    result: &DetectionResult,
    groups: &[Vec<Vec<f32>>],
    labels: &[String],
  ) -> RegionOutput {
    let (width, height) = (result.width(), result.height());
    let mut canvas = PolygonCanvas::new(width, height);
    let mut union = UnionBounds::new(width, height);

    for polygon in groups.first().into_iter().flatten() {
      let Some(bounds) = Bounds::from_polygon(polygon) else {
        warn!("跳过无效的多边形: {:?}", polygon);
        continue;
      };
      canvas.fill_polygon(polygon);
      union.add(&bounds);
    }

    // 多边形只有分组级别的标签，按边界框的规则累加
    let mut label = LabelAccumulator::default();
    if union.touched {
      for (position, raw_label) in labels.iter().enumerate() {
        label.push(clean_label(raw_label), position);
      }
    }

    RegionOutput::from_bounds(
      canvas.into_mask(),
      label.finish(),
      union.finish(),
      width,
      height,
    )
  }
}

impl Postprocess for AllRegionsPostprocess {
  fn apply(&self, input: &PostprocessInput) -> RegionOutput {
    let result = match input {
      PostprocessInput::Message(message) => return RegionOutput::fallback(message),
      PostprocessInput::Result(result) => result,
    };

    match result.regions() {
      Regions::Boxes { bboxes, labels } => Self::apply_boxes(result, bboxes, labels),
      Regions::Polygons { groups, labels } => Self::apply_polygons(result, groups, labels),
    }
  }
}
