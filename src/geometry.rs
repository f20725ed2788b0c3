// 该文件是 Florence Nodes （花谷节点） 项目的一部分。
// src/geometry.rs - 轴对齐边界框与位置字符串
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

/// 位置编码的取值上限，每个轴归一化到 `[0, LOC_BINS]`
pub const LOC_BINS: i64 = 999;

/// 多边形至少需要的顶点数
pub const MIN_POLYGON_POINTS: usize = 3;

/// 坐标绝对值上限，保证位置编码与宽高计算不溢出
pub const COORD_LIMIT: f32 = i32::MAX as f32;

/// 浮点坐标向零截断成整数像素，超出 `COORD_LIMIT` 的取边界值，NaN 记为 0
fn to_pixel(v: f32) -> i64 {
  v.clamp(-COORD_LIMIT, COORD_LIMIT) as i64
}

/// 轴对齐边界框，坐标为整数像素（浮点坐标向零截断）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
  pub x1: i64,
  pub y1: i64,
  pub x2: i64,
  pub y2: i64,
}

impl Bounds {
  pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
    Self { x1, y1, x2, y2 }
  }

  /// 退化情形使用的全零边界
  pub fn empty() -> Self {
    Self::default()
  }

  /// 并集累积的初值：整幅图像范围取反，第一个区域总能收紧它
  pub fn inverted(width: u32, height: u32) -> Self {
    Self::new(width as i64, height as i64, 0, 0)
  }

  /// 4 个坐标直接使用；8 个坐标（四边形）取偶数位 / 奇数位的最小最大值。
  /// 其他数量返回 `None`。
  pub fn from_box(coords: &[f32]) -> Option<Self> {
    match coords.len() {
      4 => Some(Self::new(
        to_pixel(coords[0]),
        to_pixel(coords[1]),
        to_pixel(coords[2]),
        to_pixel(coords[3]),
      )),
      8 => Some(Self::from_interleaved(coords)),
      _ => None,
    }
  }

  /// 多边形 `[x0, y0, x1, y1, ...]` 的外接框，顶点不足或坐标个数为奇数时返回 `None`
  pub fn from_polygon(coords: &[f32]) -> Option<Self> {
    if coords.len() % 2 != 0 || coords.len() / 2 < MIN_POLYGON_POINTS {
      return None;
    }
    Some(Self::from_interleaved(coords))
  }

  fn from_interleaved(coords: &[f32]) -> Self {
    let xs = coords.iter().step_by(2).copied();
    let ys = coords.iter().skip(1).step_by(2).copied();
    let (x_min, x_max) = min_max(xs);
    let (y_min, y_max) = min_max(ys);
    Self::new(
      to_pixel(x_min),
      to_pixel(y_min),
      to_pixel(x_max),
      to_pixel(y_max),
    )
  }

  pub fn union(&self, other: &Bounds) -> Self {
    Self::new(
      self.x1.min(other.x1),
      self.y1.min(other.y1),
      self.x2.max(other.x2),
      self.y2.max(other.y2),
    )
  }

  /// 区域宽度 `x2 - x1 + 1`
  pub fn width(&self) -> i64 {
    self.x2 - self.x1 + 1
  }

  /// 区域高度 `y2 - y1 + 1`
  pub fn height(&self) -> i64 {
    self.y2 - self.y1 + 1
  }

  /// `<loc_A><loc_B><loc_C><loc_D>`，每项为 `坐标 * 999` 对轴长向下取整除
  pub fn loc_string(&self, width: u32, height: u32) -> String {
    let w = width.max(1) as i64;
    let h = height.max(1) as i64;
    format!(
      "<loc_{}><loc_{}><loc_{}><loc_{}>",
      (self.x1 * LOC_BINS).div_euclid(w),
      (self.y1 * LOC_BINS).div_euclid(h),
      (self.x2 * LOC_BINS).div_euclid(w),
      (self.y2 * LOC_BINS).div_euclid(h),
    )
  }
}

fn min_max(values: impl Iterator<Item = f32>) -> (f32, f32) {
  values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
    (lo.min(v), hi.max(v))
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rect_box_passes_through() {
    let bounds = Bounds::from_box(&[10.7, 20.2, 30.9, 40.0]).unwrap();
    assert_eq!(bounds, Bounds::new(10, 20, 30, 40));
    assert_eq!(bounds.width(), 21);
    assert_eq!(bounds.height(), 21);
  }

  #[test]
  fn quad_box_uses_min_max() {
    let bounds = Bounds::from_box(&[10.0, 40.0, 30.0, 40.0, 30.0, 20.0, 10.0, 20.0]).unwrap();
    assert_eq!(bounds, Bounds::new(10, 20, 30, 40));
  }

  #[test]
  fn other_coordinate_counts_are_rejected() {
    assert_eq!(Bounds::from_box(&[1.0, 2.0, 3.0]), None);
    assert_eq!(Bounds::from_box(&[0.0; 6]), None);
    assert_eq!(Bounds::from_box(&[]), None);
  }

  #[test]
  fn polygon_needs_three_points() {
    assert_eq!(Bounds::from_polygon(&[0.0, 0.0, 5.0, 5.0]), None);
    assert_eq!(Bounds::from_polygon(&[0.0, 0.0, 5.0, 5.0, 1.0]), None);
    assert_eq!(
      Bounds::from_polygon(&[2.0, 3.0, 8.0, 1.0, 5.0, 9.5]),
      Some(Bounds::new(2, 1, 8, 9))
    );
  }

  #[test]
  fn huge_coordinates_saturate() {
    let bounds = Bounds::from_box(&[0.0, 0.0, 1e30, f32::INFINITY]).unwrap();
    assert_eq!(bounds, Bounds::new(0, 0, 2_147_483_648, 2_147_483_648));
    assert_eq!(bounds.width(), 2_147_483_649);
    assert_eq!(
      bounds.loc_string(100, 100),
      "<loc_0><loc_0><loc_21453361643><loc_21453361643>"
    );

    let polygon = Bounds::from_polygon(&[-3e9, f32::NAN, 3e9, 0.0, 0.0, 3e9]).unwrap();
    assert_eq!(polygon.x1, -2_147_483_648);
    assert_eq!(polygon.y2, 2_147_483_648);
  }

  #[test]
  fn union_tightens_inverted_start() {
    let start = Bounds::inverted(40, 40);
    let merged = start
      .union(&Bounds::new(0, 0, 10, 10))
      .union(&Bounds::new(20, 20, 30, 30));
    assert_eq!(merged, Bounds::new(0, 0, 30, 30));
  }

  #[test]
  fn loc_string_uses_floor_division() {
    let bounds = Bounds::new(10, 20, 30, 40);
    assert_eq!(
      bounds.loc_string(100, 100),
      "<loc_99><loc_199><loc_299><loc_399>"
    );
    assert_eq!(
      Bounds::empty().loc_string(100, 100),
      "<loc_0><loc_0><loc_0><loc_0>"
    );
    assert_eq!(
      Bounds::new(-1, 0, 0, 0).loc_string(1000, 1000),
      "<loc_-1><loc_0><loc_0><loc_0>"
    );
  }
}
