// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/mask.rs - 单通道掩码定义
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

use crate::geometry::Bounds;

/// 上游返回字符串时使用的回退掩码边长
pub const FALLBACK_MASK_SIZE: usize = 512;

/// 单通道浮点掩码，行优先，1.0 表示区域内部
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
  height: usize,
  width: usize,
  data: Box<[f32]>,
}

impl Mask {
  pub fn zeros(height: usize, width: usize) -> Self {
    Self {
      height,
      width,
      data: vec![0.0; height * width].into_boxed_slice(),
    }
  }

  pub fn fallback() -> Self {
    Self::zeros(FALLBACK_MASK_SIZE, FALLBACK_MASK_SIZE)
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  /// 批大小为 1 的形状 `[1, H, W]`
  pub fn shape(&self) -> [usize; 3] {
    [1, self.height, self.width]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  pub fn get(&self, x: usize, y: usize) -> Option<f32> {
    if x >= self.width || y >= self.height {
      return None;
    }
    self.data.get(y * self.width + x).copied()
  }

  pub fn count_nonzero(&self) -> usize {
    self.data.iter().filter(|v| **v != 0.0).count()
  }

  /// 填充行 `y1..y2`、列 `x1..x2`（左闭右开，裁剪到图像内）
  pub fn fill_rect(&mut self, bounds: &Bounds) {
    let clip = |v: i64, max: usize| v.clamp(0, max as i64) as usize;
    let (x1, x2) = (clip(bounds.x1, self.width), clip(bounds.x2, self.width));
    let (y1, y2) = (clip(bounds.y1, self.height), clip(bounds.y2, self.height));

    for y in y1..y2 {
      let row = y * self.width;
      self.data[row + x1..row + x2.max(x1)].fill(1.0);
    }
  }

  pub fn to_gray_image(&self) -> GrayImage {
    GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
      let v = self.data[y as usize * self.width + x as usize];
      Luma([(v.clamp(0.0, 1.0) * 255.0) as u8])
    })
  }
}

impl From<&GrayImage> for Mask {
  fn from(image: &GrayImage) -> Self {
    let (width, height) = image.dimensions();
    let data = image
      .as_raw()
      .iter()
      .map(|v| *v as f32 / 255.0)
      .collect::<Vec<_>>();

    Self {
      height: height as usize,
      width: width as usize,
      data: data.into_boxed_slice(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_rect_is_half_open() {
    let mut mask = Mask::zeros(5, 5);
    mask.fill_rect(&Bounds::new(1, 1, 3, 4));
    assert_eq!(mask.count_nonzero(), 2 * 3);
    assert_eq!(mask.get(1, 1), Some(1.0));
    assert_eq!(mask.get(2, 3), Some(1.0));
    assert_eq!(mask.get(3, 1), Some(0.0));
    assert_eq!(mask.get(1, 4), Some(0.0));
  }

  #[test]
  fn fill_rect_clips_to_image() {
    let mut mask = Mask::zeros(4, 4);
    mask.fill_rect(&Bounds::new(-3, 2, 10, 10));
    assert_eq!(mask.count_nonzero(), 8);
  }

  #[test]
  fn inverted_rect_fills_nothing() {
    let mut mask = Mask::zeros(4, 4);
    mask.fill_rect(&Bounds::new(3, 3, 1, 1));
    assert_eq!(mask.count_nonzero(), 0);
  }

  #[test]
  fn gray_image_conversion() {
    let mut image = GrayImage::new(3, 2);
    image.put_pixel(2, 1, Luma([255]));
    let mask = Mask::from(&image);
    assert_eq!(mask.shape(), [1, 2, 3]);
    assert_eq!(mask.get(2, 1), Some(1.0));
    assert_eq!(mask.count_nonzero(), 1);
    assert_eq!(mask.to_gray_image(), image);
  }
}
