// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/output/draw.rs - 检测 / 分割结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut, draw_text_mut},
  rect::Rect,
};
use tracing::warn;

use crate::{
  frame::{FromRgbImage, ToRgbImage},
  geometry::Bounds,
  postprocess::{canvas_points, polygon_points},
  result::{DetectionResult, PostprocessInput, Regions, clean_label},
};

/// 区域配色，按区域序号循环取用
pub const PALETTE: [[u8; 3]; 19] = [
  [0, 0, 255],     // blue
  [255, 165, 0],   // orange
  [0, 128, 0],     // green
  [128, 0, 128],   // purple
  [165, 42, 42],   // brown
  [255, 192, 203], // pink
  [128, 128, 128], // gray
  [128, 128, 0],   // olive
  [0, 255, 255],   // cyan
  [255, 0, 0],     // red
  [0, 255, 0],     // lime
  [75, 0, 130],    // indigo
  [238, 130, 238], // violet
  [0, 255, 255],   // aqua
  [255, 0, 255],   // magenta
  [255, 127, 80],  // coral
  [255, 215, 0],   // gold
  [210, 180, 140], // tan
  [135, 206, 235], // skyblue
];

const BOX_THICKNESS: u32 = 2;
const QUAD_THICKNESS: u32 = 3;
const FONT_SIZE: f32 = 16.0;
/// 标签相对区域首个顶点的偏移
const LABEL_OFFSET: (i64, i64) = (8, 2);

/// 预览图绘制。颜色由区域序号决定，同样的输入总是得到同样的图。
/// 设置字体后在每个区域旁写出标签。
#[derive(Debug, Clone)]
pub struct Preview {
  palette: Vec<Rgb<u8>>,
  box_thickness: u32,
  quad_thickness: u32,
  font: Option<FontArc>,
  font_scale: PxScale,
}

impl Default for Preview {
  fn default() -> Self {
    Self {
      palette: PALETTE.iter().copied().map(Rgb).collect(),
      box_thickness: BOX_THICKNESS,
      quad_thickness: QUAD_THICKNESS,
      font: None,
      font_scale: PxScale::from(FONT_SIZE),
    }
  }
}

impl Preview {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn with_palette(mut self, palette: Vec<Rgb<u8>>) -> Self {
    if !palette.is_empty() {
      self.palette = palette;
    }
    self
  }

  pub fn color(&self, index: usize) -> Rgb<u8> {
    self.palette[index % self.palette.len()]
  }

  /// 轴对齐边框，8 坐标的四边形取外接框
  pub fn draw_boxes(&self, image: &mut RgbImage, result: &DetectionResult) {
    let Regions::Boxes { bboxes, labels } = result.regions() else {
      return;
    };

    for (i, (coords, label)) in bboxes.iter().zip(labels).enumerate() {
      let Some(bounds) = Bounds::from_box(coords) else {
        warn!("跳过无效的边界框: {:?}", coords);
        continue;
      };
      let color = self.color(i);
      self.draw_rect(image, &bounds, color);
      let text = format!("{}: {}", i, clean_label(label));
      self.draw_label(image, (bounds.x1, bounds.y1), &text, color);
    }
  }

  /// OCR 区域：按原始顶点连线
  pub fn draw_quads(&self, image: &mut RgbImage, result: &DetectionResult) {
    let Regions::Boxes { bboxes, labels } = result.regions() else {
      return;
    };

    let (width, height) = image.dimensions();
    for (i, (coords, label)) in bboxes.iter().zip(labels).enumerate() {
      if coords.len() < 4 || coords.len() % 2 != 0 {
        warn!("跳过无效的四边形: {:?}", coords);
        continue;
      }
      let points: Vec<(f32, f32)> = canvas_points(coords, width, height)
        .iter()
        .map(|p| (p.x as f32, p.y as f32))
        .collect();
      let color = self.color(i);
      self.draw_outline(image, &points, color, self.quad_thickness);
      if let Some(&(x, y)) = points.first() {
        self.draw_label(image, (x as i64, y as i64), clean_label(label), color);
      }
    }
  }

  /// 每组多边形一个颜色；`fill` 为真时填充
  pub fn draw_polygons(&self, image: &mut RgbImage, result: &DetectionResult, fill: bool) {
    let Regions::Polygons { groups, labels } = result.regions() else {
      return;
    };

    let (width, height) = image.dimensions();
    for (i, group) in groups.iter().enumerate() {
      let color = self.color(i);
      let label = labels.get(i).map(|l| clean_label(l)).unwrap_or_default();
      for polygon in group {
        let Some(points) = polygon_points(polygon, width, height) else {
          warn!("无效的多边形: {:?}", polygon);
          continue;
        };
        if fill && points.len() > 1 {
          draw_polygon_mut(image, &points, color);
        }
        let outline: Vec<(f32, f32)> = points.iter().map(|p| (p.x as f32, p.y as f32)).collect();
        self.draw_outline(image, &outline, color, 1);
        if let Some(first) = points.first() {
          self.draw_label(image, (first.x as i64, first.y as i64), label, color);
        }
      }
    }
  }

  /// 按结果形态选择绘制方式；字符串结果不绘制
  pub fn draw_result(&self, image: &mut RgbImage, input: &PostprocessInput, fill: bool) {
    let PostprocessInput::Result(result) = input else {
      return;
    };
    match result.regions() {
      Regions::Boxes { .. } => self.draw_boxes(image, result),
      Regions::Polygons { .. } => self.draw_polygons(image, result, fill),
    }
  }

  pub fn draw_on_frame<F, T>(&self, frame: &F, input: &PostprocessInput, fill: bool) -> T
  where
    F: ToRgbImage,
    T: FromRgbImage,
  {
    let mut image = frame.to_rgb_image();
    self.draw_result(&mut image, input, fill);
    T::from_rgb_image(&image)
  }

  fn draw_rect(&self, image: &mut RgbImage, bounds: &Bounds, color: Rgb<u8>) {
    // 边框在图像外一像素处截断，图像外的边不可见
    let (w, h) = (image.width() as i64, image.height() as i64);
    let bounds = Bounds::new(
      bounds.x1.clamp(-1, w),
      bounds.y1.clamp(-1, h),
      bounds.x2.clamp(-1, w),
      bounds.y2.clamp(-1, h),
    );
    for t in 0..self.box_thickness as i64 {
      let width = bounds.x2 - bounds.x1 - 2 * t;
      let height = bounds.y2 - bounds.y1 - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at((bounds.x1 + t) as i32, (bounds.y1 + t) as i32)
        .of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }
  }

  /// 没有字体或标签为空时不绘制
  fn draw_label(&self, image: &mut RgbImage, anchor: (i64, i64), text: &str, color: Rgb<u8>) {
    let Some(font) = &self.font else {
      return;
    };
    if text.is_empty() {
      return;
    }
    let (w, h) = (image.width() as i64, image.height() as i64);
    let x = (anchor.0 + LABEL_OFFSET.0).clamp(-w, w) as i32;
    let y = (anchor.1 + LABEL_OFFSET.1).clamp(-h, h) as i32;
    draw_text_mut(image, color, x, y, self.font_scale, font, text);
  }

  fn draw_outline(
    &self,
    image: &mut RgbImage,
    points: &[(f32, f32)],
    color: Rgb<u8>,
    thickness: u32,
  ) {
    if points.len() < 2 {
      return;
    }
    let closing = points.iter().zip(points.iter().cycle().skip(1));
    for (start, end) in closing {
      for t in 0..thickness {
        let offset = t as f32;
        draw_line_segment_mut(
          image,
          (start.0 + offset, start.1),
          (end.0 + offset, end.1),
          color,
        );
        draw_line_segment_mut(
          image,
          (start.0, start.1 + offset),
          (end.0, end.1 + offset),
          color,
        );
      }
    }
  }
}
