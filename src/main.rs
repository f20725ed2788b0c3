// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/main.rs - 后处理命令行程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use florence_nodes::{
  FromUrl,
  input::{ImageFileInput, ResultFileInput},
  output::{Render, SaveImageFileOutput},
  postprocess::{AllRegionsPostprocess, Postprocess, SingleRegionPostprocess},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入结果: {}", args.input);
  let input = ResultFileInput::from_url(&args.input)?.into_input();

  let node: Box<dyn Postprocess> = match args.index {
    Some(index) => {
      info!("取第 {} 个区域", index);
      Box::new(SingleRegionPostprocess::new(index))
    }
    None => {
      info!("合并全部区域");
      Box::new(AllRegionsPostprocess)
    }
  };

  let now = std::time::Instant::now();
  let region = node.apply(&input);
  info!("后处理完成，耗时: {:.2?}", now.elapsed());

  if let Some(url) = &args.output {
    SaveImageFileOutput::from_url(url)?.save_mask(&region)?;
  }

  if let (Some(image), Some(preview)) = (&args.image, &args.preview) {
    let output = SaveImageFileOutput::from_url(preview)?;
    match ImageFileInput::from_url(image)?.into_frames().next() {
      Some(frame) => output.render_result(&frame, &input)?,
      None => warn!("源图像为空，跳过预览"),
    }
  }

  println!("{}", serde_json::to_string(&region)?);

  Ok(())
}
