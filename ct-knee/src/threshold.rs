//! 根据 HU 直方图自动估计骨阈值.
//!
//! 思路: 膝关节 CT 中软组织 (约 0 ~ 100 HU) 占绝大多数体素, 直方图在软组织峰之后
//! 迅速下降, 随后进入骨骼对应的平坦长尾. 阈值取下降结束、曲线变平的位置.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::hu;
use crate::{Error, Result};

/// 直方图阈值估计的参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistogramParams {
    /// HU 值先截断到该范围 `[lo, hi]` 内再统计.
    pub clip: (f32, f32),

    /// 等宽直方图柱数.
    pub bins: usize,

    /// 滑动平均窗口宽度 (柱数).
    pub smooth: usize,

    /// 软组织峰所在的 HU 范围.
    pub peak_search: (f32, f32),

    /// 梯度绝对值不超过 `flat_ratio * |最陡梯度|` 即视为平坦.
    pub flat_ratio: f64,

    /// 结果被限制在该范围内.
    pub bounds: (f32, f32),

    /// 无法估计时返回的阈值.
    pub fallback: f32,
}

impl Default for HistogramParams {
    fn default() -> Self {
        Self {
            clip: (hu::AIR, hu::CLIP_MAX),
            bins: hu::HISTOGRAM_BINS,
            smooth: 5,
            peak_search: (-200.0, 300.0),
            flat_ratio: 0.05,
            bounds: (100.0, 700.0),
            fallback: hu::DEFAULT_BONE,
        }
    }
}

impl HistogramParams {
    /// 检查参数是否合法.
    pub fn validate(&self) -> Result<()> {
        let ordered = |(lo, hi): (f32, f32)| lo.is_finite() && hi.is_finite() && lo < hi;
        if !ordered(self.clip) {
            return Err(Error::InvalidParameter("clip", format!("{:?}", self.clip)));
        }
        if self.bins < 3 {
            return Err(Error::InvalidParameter("bins", "need at least 3".into()));
        }
        if self.smooth == 0 {
            return Err(Error::InvalidParameter("smooth", "must be positive".into()));
        }
        if !ordered(self.peak_search) {
            let v = format!("{:?}", self.peak_search);
            return Err(Error::InvalidParameter("peak_search", v));
        }
        if !(self.flat_ratio.is_finite() && self.flat_ratio >= 0.0) {
            let v = self.flat_ratio.to_string();
            return Err(Error::InvalidParameter("flat_ratio", v));
        }
        if !(self.bounds.0 <= self.bounds.1) {
            return Err(Error::InvalidParameter("bounds", format!("{:?}", self.bounds)));
        }
        Ok(())
    }
}

/// 阈值的来源.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ThresholdSource {
    /// 由调用者直接指定.
    Manual,

    /// 由直方图成功估计.
    Histogram,

    /// 没有任何有限 HU 值.
    NoFiniteValue,

    /// 软组织范围内没有体素.
    NoPeak,

    /// 软组织峰之后直方图没有下降.
    NoDescent,

    /// 下降之后始终没有变平.
    NoFlatBin,
}

impl ThresholdSource {
    /// 是否使用了默认阈值?
    #[inline]
    pub fn is_fallback(&self) -> bool {
        !matches!(self, ThresholdSource::Manual | ThresholdSource::Histogram)
    }
}

/// 阈值估计结果.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThresholdEstimate {
    /// 骨阈值 (HU).
    pub hu: f32,

    /// 阈值来源.
    pub source: ThresholdSource,
}

/// 居中滑动平均. 两端窗口越界的部分不参与平均.
fn moving_average(counts: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let n = counts.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            counts[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}

/// 中心差分梯度, 两端使用单侧差分. `y` 至少包含 2 个元素.
fn gradient(y: &[f64]) -> Vec<f64> {
    let n = y.len();
    (0..n)
        .map(|i| match i {
            0 => y[1] - y[0],
            _ if i == n - 1 => y[n - 1] - y[n - 2],
            _ => (y[i + 1] - y[i - 1]) / 2.0,
        })
        .collect()
}

/// 根据 HU 直方图估计骨阈值.
///
/// 非有限值被忽略. 参数不合法时返回 `Err`; 估计失败时返回 `params.fallback`,
/// 并在 [`ThresholdEstimate::source`] 中注明原因.
pub fn find_bone_threshold_by_histogram<I>(
    hu: I,
    params: &HistogramParams,
) -> Result<ThresholdEstimate>
where
    I: IntoIterator<Item = f32>,
{
    params.validate()?;
    let fallback = |source: ThresholdSource| {
        log::warn!("bone threshold falls back to {} HU ({source:?})", params.fallback);
        Ok(ThresholdEstimate {
            hu: params.fallback,
            source,
        })
    };

    let (lo, hi) = params.clip;
    let bins = params.bins;
    let width = (hi - lo) / bins as f32;
    let centre = |i: usize| lo + (i as f32 + 0.5) * width;

    let mut counts = vec![0.0f64; bins];
    let mut total = 0usize;
    for v in hu.into_iter().filter(|v| v.is_finite()) {
        let idx = ((v.clamp(lo, hi) - lo) / width) as usize;
        counts[idx.min(bins - 1)] += 1.0;
        total += 1;
    }
    if total == 0 {
        return fallback(ThresholdSource::NoFiniteValue);
    }

    let smoothed = moving_average(&counts, params.smooth);
    let grad = gradient(&smoothed);

    let (p_lo, p_hi) = params.peak_search;
    let peak = (0..bins)
        .filter(|&i| (p_lo..=p_hi).contains(&centre(i)))
        .max_by_key(|&i| (OrderedFloat(smoothed[i]), Reverse(i)));
    let Some(peak) = peak.filter(|&i| smoothed[i] > 0.0) else {
        return fallback(ThresholdSource::NoPeak);
    };

    let steepest = (peak + 1..bins).min_by_key(|&i| OrderedFloat(grad[i]));
    let Some(steepest) = steepest.filter(|&i| grad[i] < 0.0) else {
        return fallback(ThresholdSource::NoDescent);
    };

    let tolerance = params.flat_ratio * grad[steepest].abs();
    let Some(flat) = (steepest + 1..bins).find(|&i| grad[i].abs() <= tolerance) else {
        return fallback(ThresholdSource::NoFlatBin);
    };

    let threshold = centre(flat).clamp(params.bounds.0, params.bounds.1);
    log::debug!(
        "histogram: peak {:.1} HU, steepest {:.1} HU, flat {:.1} HU",
        centre(peak),
        centre(steepest),
        centre(flat)
    );
    log::info!("estimated bone threshold: {threshold:.1} HU");
    Ok(ThresholdEstimate {
        hu: threshold,
        source: ThresholdSource::Histogram,
    })
}
