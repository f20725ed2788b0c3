// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/model/florence2.rs - Florence2 推理节点
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

use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::{FromRgbImage, ImageFrame, ToRgbImage},
  model::{GenerationBackend, GenerationOptions, OptionsError},
  output::draw::Preview,
  result::{DetectionResult, PostprocessInput, ResultError},
  task::{AnswerKind, Task},
};

#[derive(Error, Debug)]
pub enum RunError {
  #[error("生成参数无效: {0}")]
  Options(#[from] OptionsError),
  #[error("生成后端错误: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("解析结果中缺少任务标记 {0}")]
  MissingTag(&'static str),
  #[error("任务 {task} 的结果格式错误: {source}")]
  MalformedAnswer {
    task: Task,
    #[source]
    source: serde_json::Error,
  },
  #[error("结果无效: {0}")]
  Result(#[from] ResultError),
}

/// 推理节点输出：预览图、结果文本、交给后处理节点的结构
#[derive(Debug, Clone)]
pub struct RunOutput {
  pub preview: ImageFrame,
  pub text: String,
  pub result: PostprocessInput,
}

#[derive(Deserialize)]
struct BoxAnswer {
  #[serde(default)]
  bboxes: Vec<Vec<f32>>,
  #[serde(default)]
  labels: Vec<String>,
}

#[derive(Deserialize)]
struct OpenVocabularyAnswer {
  #[serde(default)]
  bboxes: Vec<Vec<f32>>,
  #[serde(default)]
  bboxes_labels: Vec<String>,
}

#[derive(Deserialize)]
struct OcrRegionAnswer {
  #[serde(default)]
  quad_boxes: Vec<Vec<f32>>,
  #[serde(default)]
  labels: Vec<String>,
}

#[derive(Deserialize)]
struct PolygonAnswer {
  #[serde(default)]
  polygons: Vec<Vec<Vec<f32>>>,
  #[serde(default)]
  labels: Vec<String>,
}

fn parse_answer<T: DeserializeOwned>(task: Task, value: serde_json::Value) -> Result<T, RunError> {
  serde_json::from_value(value).map_err(|source| RunError::MalformedAnswer { task, source })
}

/// 把图像和任务提示交给生成后端，并整理成后处理节点可用的结构
pub struct Florence2<B> {
  backend: B,
  preview: Preview,
}

impl<B: GenerationBackend> Florence2<B> {
  pub fn new(backend: B) -> Self {
    Self {
      backend,
      preview: Preview::default(),
    }
  }

  pub fn with_preview(mut self, preview: Preview) -> Self {
    self.preview = preview;
    self
  }

  pub fn run(
    &self,
    frame: &ImageFrame,
    task: Task,
    text_input: &str,
    options: &GenerationOptions,
  ) -> Result<RunOutput, RunError> {
    options.validate()?;

    let mut image = frame.to_rgb_image();
    let (width, height) = image.dimensions();
    let prompt = task.prompt(text_input);
    info!("执行任务 {} ({}x{}), 提示词: {}", task, width, height, prompt);

    let now = std::time::Instant::now();
    let mut answer = self
      .backend
      .generate(&image, &prompt, task.tag(), options)
      .map_err(|e| RunError::Backend(Box::new(e)))?;
    info!("生成完成，耗时: {:.2?}", now.elapsed());
    debug!("解析结果: {}", answer);

    let value = answer
      .get_mut(task.tag())
      .map(serde_json::Value::take)
      .ok_or(RunError::MissingTag(task.tag()))?;

    let result = match task.answer_kind() {
      AnswerKind::Text => {
        let text: String = parse_answer(task, value)?;
        return Ok(RunOutput {
          preview: frame.clone(),
          text: text.clone(),
          result: PostprocessInput::Message(text),
        });
      }
      AnswerKind::Boxes => {
        let answer: BoxAnswer = parse_answer(task, value)?;
        let result = DetectionResult::boxes(width, height, answer.bboxes, answer.labels)?;
        self.preview.draw_boxes(&mut image, &result);
        result
      }
      AnswerKind::OpenVocabulary => {
        let answer: OpenVocabularyAnswer = parse_answer(task, value)?;
        let result = DetectionResult::boxes(width, height, answer.bboxes, answer.bboxes_labels)?;
        self.preview.draw_boxes(&mut image, &result);
        result
      }
      AnswerKind::OcrRegions => {
        let answer: OcrRegionAnswer = parse_answer(task, value)?;
        let result = DetectionResult::boxes(width, height, answer.quad_boxes, answer.labels)?;
        self.preview.draw_quads(&mut image, &result);
        result
      }
      AnswerKind::Polygons => {
        let answer: PolygonAnswer = parse_answer(task, value)?;
        let result = DetectionResult::polygons(width, height, answer.polygons, answer.labels)?;
        self
          .preview
          .draw_polygons(&mut image, &result, options.fill_mask);
        result
      }
    };

    debug!("任务 {} 得到 {} 个区域", task, result.len());
    let text = serde_json::to_string(&result)
      .map_err(|source| RunError::MalformedAnswer { task, source })?;
    Ok(RunOutput {
      preview: ImageFrame::from_rgb_image(&image),
      text,
      result: result.into(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;
  use serde_json::json;
  use std::cell::RefCell;

  #[derive(Debug, Error)]
  #[error("backend offline")]
  struct Offline;

  struct Recording {
    answer: serde_json::Value,
    prompts: RefCell<Vec<String>>,
  }

  impl GenerationBackend for Recording {
    type Error = Offline;

    fn generate(
      &self,
      _image: &RgbImage,
      prompt: &str,
      _task_tag: &str,
      _options: &GenerationOptions,
    ) -> Result<serde_json::Value, Self::Error> {
      self.prompts.borrow_mut().push(prompt.to_string());
      Ok(self.answer.clone())
    }
  }

  fn recording(answer: serde_json::Value) -> Recording {
    Recording {
      answer,
      prompts: RefCell::new(Vec::new()),
    }
  }

  #[test]
  fn text_tasks_pass_the_frame_through() {
    let frame = ImageFrame::with_shape(4, 6);
    let runner = Florence2::new(recording(json!({ "<CAPTION>": "a cat on a mat" })));
    let out = runner
      .run(&frame, Task::Caption, "ignored", &GenerationOptions::default())
      .unwrap();
    assert_eq!(out.text, "a cat on a mat");
    assert_eq!(out.result, PostprocessInput::from("a cat on a mat"));
    assert_eq!(out.preview, frame);
    assert_eq!(runner.backend.prompts.borrow().as_slice(), ["<CAPTION>"]);
  }

  #[test]
  fn open_vocabulary_labels_are_renamed() {
    let frame = ImageFrame::with_shape(20, 30);
    let runner = Florence2::new(recording(json!({
      "<OPEN_VOCABULARY_DETECTION>": {
        "bboxes": [[1.0, 2.0, 10.0, 12.0]],
        "bboxes_labels": ["mug"],
        "polygons": [],
        "polygons_labels": []
      }
    })));
    let out = runner
      .run(&frame, Task::OpenVocabularyDetection, "mug", &GenerationOptions::default())
      .unwrap();
    let PostprocessInput::Result(result) = out.result else {
      panic!("expected structured result");
    };
    assert_eq!((result.width(), result.height()), (30, 20));
    assert_eq!(
      result.regions(),
      &crate::result::Regions::Boxes {
        bboxes: vec![vec![1.0, 2.0, 10.0, 12.0]],
        labels: vec!["mug".into()],
      }
    );
    assert_eq!(
      runner.backend.prompts.borrow().as_slice(),
      ["<OPEN_VOCABULARY_DETECTION>mug"]
    );
    assert_ne!(out.preview, frame);
  }

  #[test]
  fn missing_tag_is_reported() {
    let runner = Florence2::new(recording(json!({ "<OD>": {} })));
    let err = runner
      .run(&ImageFrame::with_shape(2, 2), Task::Ocr, "", &GenerationOptions::default())
      .unwrap_err();
    assert!(matches!(err, RunError::MissingTag("<OCR>")));
  }

  #[test]
  fn zero_beams_are_rejected_before_generation() {
    let runner = Florence2::new(recording(json!({})));
    let options = GenerationOptions {
      num_beams: 0,
      ..Default::default()
    };
    let err = runner
      .run(&ImageFrame::with_shape(2, 2), Task::Caption, "", &options)
      .unwrap_err();
    assert!(matches!(err, RunError::Options(OptionsError::ZeroBeams)));
    assert!(runner.backend.prompts.borrow().is_empty());
  }

  #[test]
  fn backend_errors_propagate() {
    struct Failing;
    impl GenerationBackend for Failing {
      type Error = Offline;
      fn generate(
        &self,
        _: &RgbImage,
        _: &str,
        _: &str,
        _: &GenerationOptions,
      ) -> Result<serde_json::Value, Self::Error> {
        Err(Offline)
      }
    }

    let err = Florence2::new(Failing)
      .run(&ImageFrame::with_shape(2, 2), Task::Caption, "", &GenerationOptions::default())
      .unwrap_err();
    assert_eq!(err.to_string(), "生成后端错误: backend offline");
  }
}
