// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

/// Florence2 区域后处理
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 上游结果文件，例如 json:///tmp/od.json
  /// 文件内容为结构化结果对象，或一段 JSON 字符串
  #[arg(long, value_name = "RESULT")]
  pub input: Url,

  /// 掩码输出路径，例如 image:///tmp/mask.png
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,

  /// 区域下标；不指定时合并全部区域
  #[arg(long, value_name = "INDEX")]
  pub index: Option<usize>,

  /// 源图像，例如 image:///tmp/source.png，需与 --preview 一起使用
  #[arg(long, value_name = "SOURCE", requires = "preview")]
  pub image: Option<Url>,

  /// 预览图输出路径，加上 ?fill 填充多边形，加上 &font=<ttf> 写出标签
  #[arg(long, value_name = "PREVIEW", requires = "image")]
  pub preview: Option<Url>,
}
