// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/input/read_result_file.rs - 结果文件输入
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

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  result::{PostprocessInput, ResultError},
};

#[derive(Error, Debug)]
pub enum ResultFileInputError {
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON error: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("Result error: {0}")]
  ResultError(#[from] ResultError),
}

/// 从 JSON 文件读取上游结果：对象为结构化结果，字符串为退化输入
#[derive(Debug, Clone)]
pub struct ResultFileInput {
  input: PostprocessInput,
}

impl FromUrlWithScheme for ResultFileInput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for ResultFileInput {
  type Error = ResultFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ResultFileInputError::SchemeMismatch(url.scheme().to_string()));
    }

    Self::from_path(url.path())
  }
}

impl ResultFileInput {
  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ResultFileInputError> {
    let path = path.as_ref();
    debug!("Reading result file: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::from_json(&text)
  }

  pub fn from_json(text: &str) -> Result<Self, ResultFileInputError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let input = PostprocessInput::from_value(value)?;
    Ok(Self { input })
  }

  pub fn input(&self) -> &PostprocessInput {
    &self.input
  }

  pub fn into_input(self) -> PostprocessInput {
    self.input
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_structured_result_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("od.json");
    std::fs::write(
      &path,
      r#"{"width": 64, "height": 48, "bboxes": [[1, 2, 3, 4]], "labels": ["car"]}"#,
    )
    .unwrap();

    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let input = ResultFileInput::from_url(&url).unwrap().into_input();
    let PostprocessInput::Result(result) = input else {
      panic!("expected structured result");
    };
    assert_eq!((result.width(), result.height()), (64, 48));
  }

  #[test]
  fn reads_bare_string() {
    let input = ResultFileInput::from_json(r#""error: no detections""#).unwrap();
    assert_eq!(input.input(), &PostprocessInput::from("error: no detections"));
  }

  #[test]
  fn surfaces_shape_errors() {
    let err = ResultFileInput::from_json(r#"{"width": 4, "height": 4}"#).unwrap_err();
    assert!(matches!(
      err,
      ResultFileInputError::ResultError(ResultError::UnrecognizedShape(_))
    ));
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("image:///tmp/result.json").unwrap();
    assert!(matches!(
      ResultFileInput::from_url(&url),
      Err(ResultFileInputError::SchemeMismatch(_))
    ));
  }
}
