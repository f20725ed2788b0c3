// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/model.rs - 模型
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

use image::RgbImage;
use thiserror::Error;

/// 生成后端：分词、生成与解码都在后端内部完成。
///
/// 返回值是按任务标记索引的解析结果，例如 `{"<OD>": {"bboxes": [...], "labels": [...]}}`。
pub trait GenerationBackend {
  type Error: std::error::Error + Send + Sync + 'static;

  fn generate(
    &self,
    image: &RgbImage,
    prompt: &str,
    task_tag: &str,
    options: &GenerationOptions,
  ) -> Result<serde_json::Value, Self::Error>;
}

impl<B: GenerationBackend> GenerationBackend for &B {
  type Error = B::Error;

  fn generate(
    &self,
    image: &RgbImage,
    prompt: &str,
    task_tag: &str,
    options: &GenerationOptions,
  ) -> Result<serde_json::Value, Self::Error> {
    (**self).generate(image, prompt, task_tag, options)
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum OptionsError {
  #[error("num_beams 至少为 1")]
  ZeroBeams,
  #[error("max_new_tokens 至少为 1")]
  ZeroTokens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOptions {
  pub max_new_tokens: u32,
  pub num_beams: u32,
  pub do_sample: bool,
  /// 分割任务的预览图是否填充多边形
  pub fill_mask: bool,
}

impl Default for GenerationOptions {
  fn default() -> Self {
    Self {
      max_new_tokens: 1024,
      num_beams: 3,
      do_sample: false,
      fill_mask: false,
    }
  }
}

impl GenerationOptions {
  pub fn validate(&self) -> Result<(), OptionsError> {
    if self.num_beams == 0 {
      return Err(OptionsError::ZeroBeams);
    }
    if self.max_new_tokens == 0 {
      return Err(OptionsError::ZeroTokens);
    }
    Ok(())
  }
}

mod florence2;
mod loader;
pub use self::florence2::{Florence2, RunError, RunOutput};
pub use self::loader::{
  IGNORE_PATTERNS, LoadedModel, LoaderError, MODEL_SUBDIR, ModelLoader, ModelLoaderBuilder,
  ModelProvider, ModelVersion,
};
