// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/postprocess/raster.rs - 多边形光栅化
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

use image::{GrayImage, Luma};
use imageproc::{drawing::draw_polygon_mut, point::Point};

use crate::{
  geometry::{COORD_LIMIT, MIN_POLYGON_POINTS},
  mask::Mask,
};

const FOREGROUND: Luma<u8> = Luma([255]);

/// 裁剪矩形在画布四周外扩的像素数，裁剪产生的边落在画布外
const CLIP_MARGIN: f64 = 2.0;

/// 画布外扩后的一条边界
#[derive(Debug, Clone, Copy)]
enum ClipEdge {
  Left(f64),
  Right(f64),
  Top(f64),
  Bottom(f64),
}

impl ClipEdge {
  fn inside(self, (x, y): (f64, f64)) -> bool {
    match self {
      ClipEdge::Left(v) => x >= v,
      ClipEdge::Right(v) => x <= v,
      ClipEdge::Top(v) => y >= v,
      ClipEdge::Bottom(v) => y <= v,
    }
  }

  /// 只在两点分居边界两侧时调用
  fn intersect(self, (x0, y0): (f64, f64), (x1, y1): (f64, f64)) -> (f64, f64) {
    match self {
      ClipEdge::Left(v) | ClipEdge::Right(v) => (v, y0 + (v - x0) / (x1 - x0) * (y1 - y0)),
      ClipEdge::Top(v) | ClipEdge::Bottom(v) => (x0 + (v - y0) / (y1 - y0) * (x1 - x0), v),
    }
  }

  /// Sutherland-Hodgman：保留多边形在边界内侧的部分
  fn clip(self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut clipped = Vec::with_capacity(points.len() + 1);
    for (i, &current) in points.iter().enumerate() {
      let previous = points[(i + points.len() - 1) % points.len()];
      match (self.inside(previous), self.inside(current)) {
        (true, true) => clipped.push(current),
        (true, false) => clipped.push(self.intersect(previous, current)),
        (false, true) => {
          clipped.push(self.intersect(previous, current));
          clipped.push(current);
        }
        (false, false) => {}
      }
    }
    clipped
  }
}

/// 有限坐标，NaN 记为 0
fn finite(v: f32) -> f64 {
  if v.is_nan() {
    0.0
  } else {
    f64::from(v.clamp(-COORD_LIMIT, COORD_LIMIT))
  }
}

/// 把闭合多边形 `[x0, y0, x1, y1, ...]` 裁剪到 `width` x `height` 画布附近，
/// 再取整成整数顶点。完全在画布外的多边形得到空序列。
pub fn canvas_points(coords: &[f32], width: u32, height: u32) -> Vec<Point<i32>> {
  let mut points: Vec<(f64, f64)> = coords
    .chunks_exact(2)
    .map(|p| (finite(p[0]), finite(p[1])))
    .collect();

  let edges = [
    ClipEdge::Left(-CLIP_MARGIN),
    ClipEdge::Right(f64::from(width) + CLIP_MARGIN),
    ClipEdge::Top(-CLIP_MARGIN),
    ClipEdge::Bottom(f64::from(height) + CLIP_MARGIN),
  ];
  for edge in edges {
    if points.is_empty() {
      break;
    }
    points = edge.clip(&points);
  }

  points
    .into_iter()
    .map(|(x, y)| Point::new(x.round() as i32, y.round() as i32))
    .collect()
}

/// 同 [`canvas_points`]，另外去掉与首点重合的闭合点。
/// 顶点不足时返回 `None`。
pub fn polygon_points(coords: &[f32], width: u32, height: u32) -> Option<Vec<Point<i32>>> {
  if coords.len() % 2 != 0 || coords.len() / 2 < MIN_POLYGON_POINTS {
    return None;
  }

  let mut points = canvas_points(coords, width, height);

  // draw_polygon_mut 不接受首尾相同的顶点序列
  while points.len() > 1 && points.first() == points.last() {
    points.pop();
  }
  Some(points)
}

/// 黑底画布，多边形以白色描边并填充
pub struct PolygonCanvas {
  image: GrayImage,
}

impl PolygonCanvas {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      image: GrayImage::new(width, height),
    }
  }

  /// 顶点不足时不绘制并返回 `false`
  pub fn fill_polygon(&mut self, coords: &[f32]) -> bool {
    let (width, height) = self.image.dimensions();
    let Some(points) = polygon_points(coords, width, height) else {
      return false;
    };

    if let [p] = points.as_slice() {
      // 所有顶点取整后落在同一像素
      if p.x >= 0 && p.y >= 0 && (p.x as u32) < self.image.width() && (p.y as u32) < self.image.height()
      {
        self.image.put_pixel(p.x as u32, p.y as u32, FOREGROUND);
      }
    } else {
      draw_polygon_mut(&mut self.image, &points, FOREGROUND);
    }
    true
  }

  pub fn as_image(&self) -> &GrayImage {
    &self.image
  }

  pub fn into_mask(self) -> Mask {
    Mask::from(&self.image)
  }
}
