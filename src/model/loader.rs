// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/model/loader.rs - 模型加载节点
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

use std::{
  fmt,
  path::{Path, PathBuf},
  str::FromStr,
};

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 模型目录下存放 Florence2 权重的子目录
pub const MODEL_SUBDIR: &str = "florence2";

/// 下载快照时忽略的文件
pub const IGNORE_PATTERNS: [&str; 2] = ["*.md", "*.txt"];

#[derive(Error, Debug)]
pub enum LoaderError {
  #[error("未知模型版本: {0}")]
  UnknownVersion(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("模型下载失败 ({repo_id}): {source}")]
  Download {
    repo_id: &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
  #[error("模型加载失败 ({path}): {source}")]
  Load {
    path: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModelVersion {
  #[default]
  Base,
  BaseFt,
  Large,
  LargeFt,
  Sd3Captioner,
  LargePromptGen,
  BasePromptGen,
  CogLarge,
}

impl ModelVersion {
  pub const ALL: [ModelVersion; 8] = [
    ModelVersion::Base,
    ModelVersion::BaseFt,
    ModelVersion::Large,
    ModelVersion::LargeFt,
    ModelVersion::Sd3Captioner,
    ModelVersion::LargePromptGen,
    ModelVersion::BasePromptGen,
    ModelVersion::CogLarge,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      ModelVersion::Base => "base",
      ModelVersion::BaseFt => "base-ft",
      ModelVersion::Large => "large",
      ModelVersion::LargeFt => "large-ft",
      ModelVersion::Sd3Captioner => "SD3-Captioner",
      ModelVersion::LargePromptGen => "large-promptgen",
      ModelVersion::BasePromptGen => "base-promptgen",
      ModelVersion::CogLarge => "cog-large",
    }
  }

  pub fn repo_id(&self) -> &'static str {
    match self {
      ModelVersion::Base => "microsoft/Florence-2-base",
      ModelVersion::BaseFt => "microsoft/Florence-2-base-ft",
      ModelVersion::Large => "microsoft/Florence-2-large",
      ModelVersion::LargeFt => "microsoft/Florence-2-large-ft",
      ModelVersion::Sd3Captioner => "gokaygokay/Florence-2-SD3-Captioner",
      ModelVersion::LargePromptGen => "MiaoshouAI/Florence-2-large-PromptGen-v2.0",
      ModelVersion::BasePromptGen => "MiaoshouAI/Florence-2-base-PromptGen-v2.0",
      ModelVersion::CogLarge => "thwri/CogFlorence-2.1-Large",
    }
  }
}

impl fmt::Display for ModelVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for ModelVersion {
  type Err = LoaderError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ModelVersion::ALL
      .iter()
      .find(|v| v.name() == s)
      .copied()
      .ok_or_else(|| LoaderError::UnknownVersion(s.to_string()))
  }
}

/// 模型提供方：负责下载快照与加载权重，具体实现不在本库内
pub trait ModelProvider {
  type Model;
  type Error: std::error::Error + Send + Sync + 'static;

  fn download(&self, repo_id: &str, dest: &Path, ignore_patterns: &[&str])
  -> Result<(), Self::Error>;

  fn load(&self, path: &Path) -> Result<Self::Model, Self::Error>;
}

#[derive(Debug)]
pub struct LoadedModel<M> {
  pub version: ModelVersion,
  pub path: PathBuf,
  pub model: M,
}

pub struct ModelLoaderBuilder {
  models_dir: PathBuf,
  version: ModelVersion,
}

impl FromUrlWithScheme for ModelLoaderBuilder {
  const SCHEME: &'static str = "florence2";
}

/// `florence2:///path/to/models?version=large`
impl FromUrl for ModelLoaderBuilder {
  type Error = LoaderError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LoaderError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut builder = ModelLoaderBuilder::new(url.path());
    for (k, v) in url.query_pairs() {
      if k == "version" {
        builder = builder.version(v.parse()?);
      }
    }
    Ok(builder)
  }
}

impl ModelLoaderBuilder {
  pub fn new(models_dir: impl Into<PathBuf>) -> Self {
    Self {
      models_dir: models_dir.into(),
      version: ModelVersion::default(),
    }
  }

  pub fn version(mut self, version: ModelVersion) -> Self {
    self.version = version;
    self
  }

  pub fn build<P: ModelProvider>(self, provider: P) -> ModelLoader<P> {
    ModelLoader {
      models_dir: self.models_dir,
      default_version: self.version,
      provider,
      loaded: None,
    }
  }
}

/// 加载节点：按版本准备本地快照，只在版本变化时重新加载
pub struct ModelLoader<P: ModelProvider> {
  models_dir: PathBuf,
  default_version: ModelVersion,
  provider: P,
  loaded: Option<LoadedModel<P::Model>>,
}

impl<P: ModelProvider> ModelLoader<P> {
  pub fn model_path(&self, version: ModelVersion) -> PathBuf {
    self.models_dir.join(MODEL_SUBDIR).join(version.name())
  }

  pub fn default_version(&self) -> ModelVersion {
    self.default_version
  }

  pub fn loaded(&self) -> Option<&LoadedModel<P::Model>> {
    self.loaded.as_ref()
  }

  pub fn load_default(&mut self) -> Result<&LoadedModel<P::Model>, LoaderError> {
    self.load(self.default_version)
  }

  pub fn load(&mut self, version: ModelVersion) -> Result<&LoadedModel<P::Model>, LoaderError> {
    std::fs::create_dir_all(self.models_dir.join(MODEL_SUBDIR))?;

    let path = self.model_path(version);
    if !path.exists() {
      info!("下载 Florence2 {} 模型: {}", version, version.repo_id());
      self
        .provider
        .download(version.repo_id(), &path, &IGNORE_PATTERNS)
        .map_err(|e| {
          error!("模型下载失败: {}", e);
          LoaderError::Download {
            repo_id: version.repo_id(),
            source: Box::new(e),
          }
        })?;
    }

    let loaded = match self.loaded.take() {
      Some(loaded) if loaded.version == version => {
        debug!("模型 {} 已加载，直接复用", version);
        loaded
      }
      _ => {
        info!("加载模型文件: {}", path.display());
        let model = self.provider.load(&path).map_err(|e| LoaderError::Load {
          path: path.display().to_string(),
          source: Box::new(e),
        })?;
        info!("模型加载完成");
        LoadedModel {
          version,
          path,
          model,
        }
      }
    };

    Ok(self.loaded.insert(loaded))
  }
}
