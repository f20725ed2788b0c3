// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/postprocess/single.rs - 单区域后处理
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

/// 取出第 `index` 个区域。越界的下标不报错，输出空几何。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleRegionPostprocess {
  index: usize,
}

impl SingleRegionPostprocess {
  pub fn new(index: usize) -> Self {
    Self { index }
  }

  pub fn index(&self) -> usize {
    self.index
  }

  fn apply_boxes(&self, result: &DetectionResult, bboxes: &[Vec<f32>], labels: &[String]) -> RegionOutput {
    let (width, height) = (result.width(), result.height());
    if self.index >= labels.len() {
      debug!("下标 {} 超出标签数量 {}", self.index, labels.len());
      return RegionOutput::empty(width, height);
    }

    let coords = &bboxes[self.index];
    let Some(bounds) = Bounds::from_box(coords) else {
      warn!("无效的边界框: {:?}", coords);
      return RegionOutput::empty(width, height);
    };

    let mut mask = Mask::zeros(height as usize, width as usize);
    mask.fill_rect(&bounds);
    let label = clean_label(&labels[self.index]).to_string();
    RegionOutput::from_bounds(mask, label, bounds, width, height)
  }

  fn apply_polygons(
    &self,
    result: &DetectionResult,
    groups: &[Vec<Vec<f32>>],
    labels: &[String],
  ) -> RegionOutput {
    let (width, height) = (result.width(), result.height());
    let group = groups.first().map(Vec::as_slice).unwrap_or_default();
    if self.index >= group.len() {
      debug!("下标 {} 超出多边形数量 {}", self.index, group.len());
      return RegionOutput::empty(width, height);
    }

    let polygon = &group[self.index];
    let Some(bounds) = Bounds::from_polygon(polygon) else {
      warn!("无效的多边形: {:?}", polygon);
      return RegionOutput::empty(width, height);
    };

    let mut canvas = PolygonCanvas::new(width, height);
    canvas.fill_polygon(polygon);
    // 同一组多边形共用一个标签
    let label = labels.first().map(|l| clean_label(l).to_string()).unwrap_or_default();
    RegionOutput::from_bounds(canvas.into_mask(), label, bounds, width, height)
  }
}

impl Postprocess for SingleRegionPostprocess {
  fn apply(&self, input: &PostprocessInput) -> RegionOutput {
    let result = match input {
      PostprocessInput::Message(message) => return RegionOutput::fallback(message),
      PostprocessInput::Result(result) => result,
    };

    match result.regions() {
      Regions::Boxes { bboxes, labels } => self.apply_boxes(result, bboxes, labels),
      Regions::Polygons { groups, labels } => self.apply_polygons(result, groups, labels),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn boxes(width: u32, height: u32, bboxes: Vec<Vec<f32>>, labels: &[&str]) -> PostprocessInput {
    let labels = labels.iter().map(|l| l.to_string()).collect();
    DetectionResult::boxes(width, height, bboxes, labels)
      .unwrap()
      .into()
  }

  #[test]
  fn selects_box_by_index() {
    let input = boxes(
      100,
      100,
      vec![vec![0.0, 0.0, 5.0, 5.0], vec![10.0, 20.0, 30.0, 40.0]],
      &["a", "</s>b"],
    );
    let out = SingleRegionPostprocess::new(1).apply(&input);
    assert_eq!(out.label, "b");
    assert_eq!((out.x, out.y, out.width, out.height), (10, 20, 21, 21));
    assert_eq!(out.mask.count_nonzero(), 20 * 20);
    assert_eq!(out.mask.shape(), [1, 100, 100]);
  }

  #[test]
  fn malformed_box_degrades_to_empty_geometry() {
    let input = boxes(10, 10, vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]], &["odd"]);
    let out = SingleRegionPostprocess::new(0).apply(&input);
    assert_eq!(out, RegionOutput::empty(10, 10));
  }

  #[test]
  fn polygon_inherits_group_label() {
    let input: PostprocessInput = DetectionResult::polygons(
      20,
      20,
      vec![vec![
        vec![0.0, 0.0, 3.0, 0.0, 3.0, 3.0],
        vec![5.0, 5.0, 15.0, 5.0, 15.0, 15.0, 5.0, 15.0],
      ]],
      vec!["</s>the dog".to_string()],
    )
    .unwrap()
    .into();
    let out = SingleRegionPostprocess::new(1).apply(&input);
    assert_eq!(out.label, "the dog");
    assert_eq!((out.x, out.y, out.width, out.height), (5, 5, 11, 11));
    assert_eq!(out.mask.get(10, 10), Some(1.0));
    assert_eq!(out.mask.get(1, 1), Some(0.0));
    assert_eq!(out.loc_string, "<loc_249><loc_249><loc_749><loc_749>");
  }

  #[test]
  fn polygon_index_out_of_range() {
    let input: PostprocessInput =
      DetectionResult::polygons(8, 8, vec![], vec![]).unwrap().into();
    let out = SingleRegionPostprocess::new(0).apply(&input);
    assert_eq!(out, RegionOutput::empty(8, 8));
  }
}
