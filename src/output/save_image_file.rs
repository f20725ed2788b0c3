// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/output/save_image_file.rs - 保存掩码 / 预览图像文件
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

use ab_glyph::FontArc;
use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ImageFrame,
  output::{Render, draw::Preview},
  postprocess::RegionOutput,
  result::PostprocessInput,
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("字体文件无效: {0}")]
  FontError(String),
}

/// `image:///path/to/file.png[?fill][&font=/path/to/font.ttf]`。
/// `fill` 控制多边形预览是否填充，`font` 指定后预览图上写出标签。
pub struct SaveImageFileOutput {
  path: String,
  fill: bool,
  draw: Preview,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let mut fill = false;
    let mut draw = Preview::default();
    for (k, v) in uri.query_pairs() {
      match k.as_ref() {
        "fill" => fill = v != "false",
        "font" => {
          let data = std::fs::read(v.as_ref())?;
          let font = FontArc::try_from_vec(data)
            .map_err(|e| SaveImageFileError::FontError(format!("{}: {}", v, e)))?;
          draw = draw.with_font(font);
        }
        _ => {}
      }
    }

    Ok(SaveImageFileOutput {
      path: uri.path().to_string(),
      fill,
      draw,
    })
  }
}

impl SaveImageFileOutput {
  pub fn path(&self) -> &str {
    &self.path
  }

  fn prepare_parent(&self) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    Ok(())
  }

  /// 掩码按 0 / 255 的灰度图保存
  pub fn save_mask(&self, output: &RegionOutput) -> Result<(), SaveImageFileError> {
    self.prepare_parent()?;
    output.mask.to_gray_image().save(&self.path)?;
    info!("保存掩码到文件: {}", self.path);
    Ok(())
  }

  pub fn save_image(&self, image: &RgbImage) -> Result<(), SaveImageFileError> {
    self.prepare_parent()?;
    image.save(&self.path)?;
    info!("保存图像到文件: {}", self.path);
    Ok(())
  }
}

impl Render<ImageFrame, PostprocessInput> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &ImageFrame, result: &PostprocessInput) -> Result<(), Self::Error> {
    let image: RgbImage = self.draw.draw_on_frame(frame, result, self.fill);
    self.save_image(&image)
  }
}

impl Render<ImageFrame, RegionOutput> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, _frame: &ImageFrame, result: &RegionOutput) -> Result<(), Self::Error> {
    self.save_mask(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    postprocess::{Postprocess, SingleRegionPostprocess},
    result::DetectionResult,
  };

  fn output_in(dir: &Path, name: &str) -> SaveImageFileOutput {
    let url = Url::parse(&format!("image://{}", dir.join(name).display())).unwrap();
    SaveImageFileOutput::from_url(&url).unwrap()
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("file:///tmp/mask.png").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn reads_fill_flag() {
    let url = Url::parse("image:///tmp/preview.png?fill").unwrap();
    assert!(SaveImageFileOutput::from_url(&url).unwrap().fill);
    let url = Url::parse("image:///tmp/preview.png?fill=false").unwrap();
    assert!(!SaveImageFileOutput::from_url(&url).unwrap().fill);
  }

  #[test]
  fn rejects_invalid_font() {
    let dir = tempfile::tempdir().unwrap();
    let font = dir.path().join("broken.ttf");
    std::fs::write(&font, b"not a font").unwrap();
    let url = Url::parse(&format!(
      "image://{}?font={}",
      dir.path().join("preview.png").display(),
      font.display()
    ))
    .unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::FontError(_))
    ));
  }

  #[test]
  fn saves_mask_as_grayscale() {
    let dir = tempfile::tempdir().unwrap();
    let output = output_in(dir.path(), "nested/mask.png");
    let input: PostprocessInput =
      DetectionResult::boxes(8, 6, vec![vec![1.0, 1.0, 4.0, 3.0]], vec!["a".into()])
        .unwrap()
        .into();
    let region = SingleRegionPostprocess::new(0).apply(&input);
    output
      .render_result(&ImageFrame::with_shape(6, 8), &region)
      .unwrap();

    let saved = image::open(output.path()).unwrap().to_luma8();
    assert_eq!(saved.dimensions(), (8, 6));
    assert_eq!(saved.get_pixel(2, 2).0, [255]);
    assert_eq!(saved.get_pixel(5, 5).0, [0]);
  }

  #[test]
  fn saves_preview() {
    let dir = tempfile::tempdir().unwrap();
    let output = output_in(dir.path(), "preview.png");
    let input: PostprocessInput =
      DetectionResult::boxes(20, 20, vec![vec![2.0, 2.0, 12.0, 12.0]], vec!["a".into()])
        .unwrap()
        .into();
    output
      .render_result(&ImageFrame::with_shape(20, 20), &input)
      .unwrap();

    let saved = image::open(output.path()).unwrap().to_rgb8();
    assert_eq!(saved.get_pixel(2, 6).0, [0, 0, 255]);
  }
}
