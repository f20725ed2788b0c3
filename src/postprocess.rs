// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/postprocess.rs - 区域后处理节点
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

use serde::Serialize;

use crate::{geometry::Bounds, mask::Mask, result::PostprocessInput};

/// 后处理节点：把检测 / 分割结果转换成掩码、标签与位置字符串。
///
/// 实现必须是纯函数：相同输入得到逐位相同的输出，且从不失败。
/// 上游传入字符串时输出 512x512 的空白掩码，并把字符串原样作为标签。
pub trait Postprocess {
  fn apply(&self, input: &PostprocessInput) -> RegionOutput;
}

/// 节点输出 `(mask, label, loc_string, width, height, x, y)`。
/// `width` / `height` 是区域外接框的尺寸，不是图像尺寸。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionOutput {
  #[serde(skip)]
  pub mask: Mask,
  pub label: String,
  pub loc_string: String,
  pub width: i64,
  pub height: i64,
  pub x: i64,
  pub y: i64,
}

impl RegionOutput {
  /// 上游失败时的回退输出
  pub fn fallback(message: &str) -> Self {
    Self {
      mask: Mask::fallback(),
      label: message.to_string(),
      loc_string: String::new(),
      width: 0,
      height: 0,
      x: 0,
      y: 0,
    }
  }

  pub fn from_bounds(mask: Mask, label: String, bounds: Bounds, width: u32, height: u32) -> Self {
    Self {
      mask,
      label,
      loc_string: bounds.loc_string(width, height),
      width: bounds.width(),
      height: bounds.height(),
      x: bounds.x1,
      y: bounds.y1,
    }
  }

  /// 空几何：全零掩码、空标签、全零边界
  pub fn empty(width: u32, height: u32) -> Self {
    Self::from_bounds(
      Mask::zeros(height as usize, width as usize),
      String::new(),
      Bounds::empty(),
      width,
      height,
    )
  }

  pub fn bounds(&self) -> Bounds {
    Bounds::new(
      self.x,
      self.y,
      self.x + self.width - 1,
      self.y + self.height - 1,
    )
  }
}

mod all;
mod raster;
mod single;

pub use self::all::AllRegionsPostprocess;
pub use self::raster::{PolygonCanvas, canvas_points, polygon_points};
pub use self::single::SingleRegionPostprocess;
