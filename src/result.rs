// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/result.rs - 检测 / 分割结果定义
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

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 生成结果中标签可能残留的起始标记
pub const LABEL_MARKER: &str = "</s>";

#[derive(Error, Debug, PartialEq)]
pub enum ResultError {
  #[error("无法识别的结果结构: {0}")]
  UnrecognizedShape(String),
  #[error("图像尺寸无效: {width}x{height}")]
  InvalidSize { width: u32, height: u32 },
  #[error("标签数量 {labels} 与边界框数量 {bboxes} 不一致")]
  LabelCountMismatch { bboxes: usize, labels: usize },
}

/// 区域集合，按上游字段区分两种形态
#[derive(Debug, Clone, PartialEq)]
pub enum Regions {
  /// `bboxes[i]` 为 4 个或 8 个坐标，`labels[i]` 与之一一对应
  Boxes {
    bboxes: Vec<Vec<f32>>,
    labels: Vec<String>,
  },
  /// 多边形分组，每组一个标签；只使用第一组
  Polygons {
    groups: Vec<Vec<Vec<f32>>>,
    labels: Vec<String>,
  },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDetectionResult", into = "RawDetectionResult")]
pub struct DetectionResult {
  width: u32,
  height: u32,
  regions: Regions,
}

impl DetectionResult {
  pub fn new(width: u32, height: u32, regions: Regions) -> Result<Self, ResultError> {
    if width == 0 || height == 0 {
      return Err(ResultError::InvalidSize { width, height });
    }
    if let Regions::Boxes { bboxes, labels } = &regions
      && bboxes.len() != labels.len()
    {
      return Err(ResultError::LabelCountMismatch {
        bboxes: bboxes.len(),
        labels: labels.len(),
      });
    }

    Ok(Self {
      width,
      height,
      regions,
    })
  }

  pub fn boxes(
    width: u32,
    height: u32,
    bboxes: Vec<Vec<f32>>,
    labels: Vec<String>,
  ) -> Result<Self, ResultError> {
    Self::new(width, height, Regions::Boxes { bboxes, labels })
  }

  pub fn polygons(
    width: u32,
    height: u32,
    groups: Vec<Vec<Vec<f32>>>,
    labels: Vec<String>,
  ) -> Result<Self, ResultError> {
    Self::new(width, height, Regions::Polygons { groups, labels })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn regions(&self) -> &Regions {
    &self.regions
  }

  pub fn len(&self) -> usize {
    match &self.regions {
      Regions::Boxes { bboxes, .. } => bboxes.len(),
      Regions::Polygons { groups, .. } => groups.first().map(Vec::len).unwrap_or(0),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// 去掉标签开头的 `</s>` 标记
pub fn clean_label(label: &str) -> &str {
  label.strip_prefix(LABEL_MARKER).unwrap_or(label)
}

/// 上游传入后处理节点的值：要么是结构化结果，要么是一段字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostprocessInput {
  Message(String),
  Result(DetectionResult),
}

impl PostprocessInput {
  /// 与 untagged 反序列化等价，但保留具体的错误原因
  pub fn from_value(value: serde_json::Value) -> Result<Self, ResultError> {
    match value {
      serde_json::Value::String(message) => Ok(PostprocessInput::Message(message)),
      serde_json::Value::Object(_) => {
        let raw: RawDetectionResult = serde_json::from_value(value)
          .map_err(|e| ResultError::UnrecognizedShape(e.to_string()))?;
        Ok(PostprocessInput::Result(DetectionResult::try_from(raw)?))
      }
      other => Err(ResultError::UnrecognizedShape(format!(
        "期望字符串或对象, 实际为 {}",
        other
      ))),
    }
  }
}

impl From<DetectionResult> for PostprocessInput {
  fn from(result: DetectionResult) -> Self {
    PostprocessInput::Result(result)
  }
}

impl From<String> for PostprocessInput {
  fn from(message: String) -> Self {
    PostprocessInput::Message(message)
  }
}

impl From<&str> for PostprocessInput {
  fn from(message: &str) -> Self {
    PostprocessInput::Message(message.to_string())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDetectionResult {
  width: u32,
  height: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  bboxes: Option<Vec<Vec<f32>>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  polygons: Option<Vec<Vec<Vec<f32>>>>,
  #[serde(default)]
  labels: Vec<String>,
}

impl TryFrom<RawDetectionResult> for DetectionResult {
  type Error = ResultError;

  fn try_from(raw: RawDetectionResult) -> Result<Self, Self::Error> {
    let regions = match (raw.bboxes, raw.polygons) {
      (Some(bboxes), None) => Regions::Boxes {
        bboxes,
        labels: raw.labels,
      },
      (None, Some(groups)) => Regions::Polygons {
        groups,
        labels: raw.labels,
      },
      (Some(_), Some(_)) => {
        return Err(ResultError::UnrecognizedShape(
          "同时包含 bboxes 与 polygons".to_string(),
        ));
      }
      (None, None) => {
        return Err(ResultError::UnrecognizedShape(
          "缺少 bboxes 或 polygons 字段".to_string(),
        ));
      }
    };
    DetectionResult::new(raw.width, raw.height, regions)
  }
}

impl From<DetectionResult> for RawDetectionResult {
  fn from(result: DetectionResult) -> Self {
    let (bboxes, polygons, labels) = match result.regions {
      Regions::Boxes { bboxes, labels } => (Some(bboxes), None, labels),
      Regions::Polygons { groups, labels } => (None, Some(groups), labels),
    };
    RawDetectionResult {
      width: result.width,
      height: result.height,
      bboxes,
      polygons,
      labels,
    }
  }
}
