// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/frame.rs - NHWC 浮点图像帧定义
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

use image::{ImageBuffer, Rgb, RgbImage};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("图像尺寸无效: {0}x{1}")]
  EmptyShape(usize, usize),
}

/// 宿主流水线使用的图像张量：批大小为 1，NHWC 排列，取值 0.0 - 1.0
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
  height: usize,
  width: usize,
  data: Box<[f32]>,
}

impl ImageFrame {
  pub fn new(height: usize, width: usize, data: Vec<f32>) -> Result<Self, FrameError> {
    if height == 0 || width == 0 {
      return Err(FrameError::EmptyShape(height, width));
    }
    let expected = RGB_CHANNELS * height * width;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      height,
      width,
      data: data.into_boxed_slice(),
    })
  }

  pub fn with_shape(height: usize, width: usize) -> Self {
    let size = RGB_CHANNELS * height * width;
    Self {
      height,
      width,
      data: vec![0.0; size].into_boxed_slice(),
    }
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// `[1, H, W, C]`
  pub fn shape(&self) -> [usize; 4] {
    [1, self.height, self.width, RGB_CHANNELS]
  }

  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }
}

impl AsMut<[f32]> for ImageFrame {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

pub trait ToRgbImage {
  fn to_rgb_image(&self) -> RgbImage;
}

pub trait FromRgbImage {
  fn from_rgb_image(image: &RgbImage) -> Self;
}

impl ToRgbImage for ImageFrame {
  fn to_rgb_image(&self) -> RgbImage {
    let width = self.width as u32;
    let height = self.height as u32;
    let data = self.as_nhwc();

    // 浮点张量 ×255 后截断到 [0, 255]
    ImageBuffer::from_fn(width, height, |x, y| {
      let idx = (y as usize * self.width + x as usize) * RGB_CHANNELS;
      let to_u8 = |v: f32| (v * 255.0).clamp(0.0, 255.0) as u8;
      Rgb([to_u8(data[idx]), to_u8(data[idx + 1]), to_u8(data[idx + 2])])
    })
  }
}

impl FromRgbImage for ImageFrame {
  fn from_rgb_image(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let mut frame = ImageFrame::with_shape(height as usize, width as usize);
    let slice = frame.as_mut();

    for (x, y, pixel) in image.enumerate_pixels() {
      let idx = (y as usize * width as usize + x as usize) * RGB_CHANNELS;
      for c in 0..RGB_CHANNELS {
        slice[idx + c] = pixel[c] as f32 / 255.0;
      }
    }
    frame
  }
}

impl FromRgbImage for RgbImage {
  fn from_rgb_image(image: &RgbImage) -> Self {
    image.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_wrong_length() {
    let err = ImageFrame::new(2, 2, vec![0.0; 5]).unwrap_err();
    assert_eq!(
      err,
      FrameError::LengthMismatch {
        expected: 12,
        actual: 5
      }
    );
  }

  #[test]
  fn converts_to_rgb_with_clipping() {
    let frame = ImageFrame::new(1, 2, vec![0.0, 0.5, 1.0, 2.0, -1.0, 1.0]).unwrap();
    let image = frame.to_rgb_image();
    assert_eq!(image.dimensions(), (2, 1));
    assert_eq!(image.get_pixel(0, 0), &Rgb([0, 127, 255]));
    assert_eq!(image.get_pixel(1, 0), &Rgb([255, 0, 255]));
  }

  #[test]
  fn rgb_image_round_trips_through_frame() {
    let image = RgbImage::from_fn(3, 2, |x, y| {
      Rgb([if x % 2 == 0 { 0 } else { 255 }, if y == 0 { 255 } else { 0 }, 255])
    });
    let frame = ImageFrame::from_rgb_image(&image);
    assert_eq!(frame.shape(), [1, 2, 3, 3]);
    assert_eq!(frame.to_rgb_image(), image);
  }
}
