// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/task.rs - 任务提示词定义
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

use std::{fmt, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TaskError {
  #[error("未知任务: {0}")]
  UnknownTask(String),
}

/// 任务返回的答案类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
  /// 纯文本
  Text,
  /// `bboxes` + `labels`
  Boxes,
  /// `polygons` + `labels`
  Polygons,
  /// `bboxes` + `bboxes_labels`，需要改写成 `labels`
  OpenVocabulary,
  /// `quad_boxes` + `labels`
  OcrRegions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Task {
  #[default]
  Caption,
  DetailedCaption,
  MoreDetailedCaption,
  ObjectDetection,
  DenseRegionCaption,
  RegionProposal,
  CaptionToPhraseGrounding,
  ReferringExpressionSegmentation,
  RegionToSegmentation,
  OpenVocabularyDetection,
  RegionToCategory,
  RegionToDescription,
  Ocr,
  OcrWithRegion,
}

impl Task {
  pub const ALL: [Task; 14] = [
    Task::Caption,
    Task::DetailedCaption,
    Task::MoreDetailedCaption,
    Task::ObjectDetection,
    Task::DenseRegionCaption,
    Task::RegionProposal,
    Task::CaptionToPhraseGrounding,
    Task::ReferringExpressionSegmentation,
    Task::RegionToSegmentation,
    Task::OpenVocabularyDetection,
    Task::RegionToCategory,
    Task::RegionToDescription,
    Task::Ocr,
    Task::OcrWithRegion,
  ];

  /// 节点界面上展示的任务名
  pub fn name(&self) -> &'static str {
    match self {
      Task::Caption => "caption",
      Task::DetailedCaption => "detailed caption",
      Task::MoreDetailedCaption => "more detailed caption",
      Task::ObjectDetection => "object detection",
      Task::DenseRegionCaption => "dense region caption",
      Task::RegionProposal => "region proposal",
      Task::CaptionToPhraseGrounding => "caption to phrase grounding",
      Task::ReferringExpressionSegmentation => "referring expression segmentation",
      Task::RegionToSegmentation => "region to segmentation",
      Task::OpenVocabularyDetection => "open vocabulary detection",
      Task::RegionToCategory => "region to category",
      Task::RegionToDescription => "region to description",
      Task::Ocr => "OCR",
      Task::OcrWithRegion => "OCR with region",
    }
  }

  /// 模型识别的任务标记，同时也是解析结果中的键
  pub fn tag(&self) -> &'static str {
    match self {
      Task::Caption => "<CAPTION>",
      Task::DetailedCaption => "<DETAILED_CAPTION>",
      Task::MoreDetailedCaption => "<MORE_DETAILED_CAPTION>",
      Task::ObjectDetection => "<OD>",
      Task::DenseRegionCaption => "<DENSE_REGION_CAPTION>",
      Task::RegionProposal => "<REGION_PROPOSAL>",
      Task::CaptionToPhraseGrounding => "<CAPTION_TO_PHRASE_GROUNDING>",
      Task::ReferringExpressionSegmentation => "<REFERRING_EXPRESSION_SEGMENTATION>",
      Task::RegionToSegmentation => "<REGION_TO_SEGMENTATION>",
      Task::OpenVocabularyDetection => "<OPEN_VOCABULARY_DETECTION>",
      Task::RegionToCategory => "<REGION_TO_CATEGORY>",
      Task::RegionToDescription => "<REGION_TO_DESCRIPTION>",
      Task::Ocr => "<OCR>",
      Task::OcrWithRegion => "<OCR_WITH_REGION>",
    }
  }

  pub fn takes_text(&self) -> bool {
    matches!(
      self,
      Task::CaptionToPhraseGrounding
        | Task::ReferringExpressionSegmentation
        | Task::RegionToSegmentation
        | Task::OpenVocabularyDetection
        | Task::RegionToCategory
        | Task::RegionToDescription
    )
  }

  pub fn answer_kind(&self) -> AnswerKind {
    match self {
      Task::Caption
      | Task::DetailedCaption
      | Task::MoreDetailedCaption
      | Task::RegionToCategory
      | Task::RegionToDescription
      | Task::Ocr => AnswerKind::Text,
      Task::ObjectDetection
      | Task::DenseRegionCaption
      | Task::RegionProposal
      | Task::CaptionToPhraseGrounding => AnswerKind::Boxes,
      Task::ReferringExpressionSegmentation | Task::RegionToSegmentation => AnswerKind::Polygons,
      Task::OpenVocabularyDetection => AnswerKind::OpenVocabulary,
      Task::OcrWithRegion => AnswerKind::OcrRegions,
    }
  }

  /// 拼接提示词：需要文本输入的任务在标记后追加文本
  pub fn prompt(&self, text_input: &str) -> String {
    if self.takes_text() {
      format!("{}{}", self.tag(), text_input)
    } else {
      self.tag().to_string()
    }
  }
}

impl fmt::Display for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Task {
  type Err = TaskError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Task::ALL
      .iter()
      .find(|task| task.name() == s || task.tag() == s)
      .copied()
      .ok_or_else(|| TaskError::UnknownTask(s.to_string()))
  }
}
