//! 股骨/胫骨分割.
//!
//! 流程: 阈值 -> 最大连通域 -> 沿切片方向切分 -> 分别清理 (去除小连通域 + 闭运算).

use std::path::{Path, PathBuf};

use ndarray::{Array3, Axis, Slice};
use nifti::NiftiHeader;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::{self, label};
use crate::morph::{self, Kernel, Structure};
use crate::threshold::{
    find_bone_threshold_by_histogram, HistogramParams, ThresholdEstimate, ThresholdSource,
};
use crate::{BoneMask, CtScan, Error, Mask, Result};

/// 切分股骨和胫骨的方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SplitAxis {
    /// 切片方向 (nifti 第三维 `k`, 本 crate 的 `Axis(0)`).
    #[default]
    Slice,

    /// nifti 第二维 `j` (本 crate 的 `Axis(1)`).
    Height,

    /// nifti 第一维 `i` (本 crate 的 `Axis(2)`).
    Width,
}

impl SplitAxis {
    /// 对应的 `ndarray` 轴.
    #[inline]
    pub fn axis(&self) -> Axis {
        match self {
            SplitAxis::Slice => Axis(0),
            SplitAxis::Height => Axis(1),
            SplitAxis::Width => Axis(2),
        }
    }
}

/// 分割参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentParams {
    /// 骨阈值 (HU). `None` 表示根据直方图自动估计.
    pub threshold: Option<f32>,

    /// 自动估计阈值时的直方图参数.
    pub histogram: HistogramParams,

    /// 切分方向.
    pub split_axis: SplitAxis,

    /// 切分比例. 切分位置为 `floor(len * cut_frac)`.
    pub cut_frac: f64,

    /// 清理时保留连通域的最小体素数.
    pub min_size: usize,

    /// 清理时闭运算的次数.
    pub closing_iter: usize,

    /// 连通性.
    pub structure: Structure,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            threshold: None,
            histogram: HistogramParams::default(),
            split_axis: SplitAxis::default(),
            cut_frac: consts::DEFAULT_CUT_FRAC,
            min_size: consts::DEFAULT_MIN_COMPONENT,
            closing_iter: consts::DEFAULT_CLOSING_ITER,
            structure: Structure::Face,
        }
    }
}

/// 分割结果的三个输出文件.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentOutputs {
    /// 股骨 + 胫骨二值掩膜.
    pub combined: PathBuf,

    /// 股骨为 1, 胫骨为 2 的标签.
    pub labeled: PathBuf,

    /// 仅胫骨的二值掩膜.
    pub tibia_only: PathBuf,
}

/// 分割结果.
#[derive(Clone, Debug)]
pub struct BoneSegmentation {
    /// 使用的骨阈值.
    pub threshold: ThresholdEstimate,

    /// 阈值化后的连通域个数.
    pub num_labels: usize,

    /// 保留的最大连通域体素数.
    pub largest_size: usize,

    /// 清理后的股骨.
    pub femur: Mask,

    /// 清理后的胫骨.
    pub tibia: Mask,
}

impl BoneSegmentation {
    /// 股骨与胫骨的并集.
    pub fn combined(&self) -> Mask {
        let mut ans = self.femur.clone();
        ans.zip_mut_with(&self.tibia, |f, &t| *f |= t);
        ans
    }

    /// 股骨为 [`label::FEMUR`], 胫骨为 [`label::TIBIA`] 的标签.
    /// 两者重叠处记为胫骨.
    pub fn labeled(&self) -> Array3<u8> {
        let mut ans = Array3::<u8>::zeros(self.femur.dim());
        ndarray::Zip::from(&mut ans)
            .and(&self.femur)
            .and(&self.tibia)
            .for_each(|p, &f, &t| {
                if t {
                    *p = label::TIBIA;
                } else if f {
                    *p = label::FEMUR;
                }
            });
        ans
    }

    /// 以 `header` (通常来自原始 CT) 为几何参考保存三个输出文件.
    /// 缺失的父目录会被创建.
    pub fn save(&self, header: &NiftiHeader, outputs: &SegmentOutputs) -> Result<()> {
        let tibia = BoneMask::from_binary(header, &self.tibia)?;
        save_logged(&tibia, &outputs.tibia_only, "tibia-only mask")?;

        let combined = BoneMask::from_binary(header, &self.combined())?;
        save_logged(&combined, &outputs.combined, "combined femur + tibia mask")?;

        let labeled = BoneMask::from_labels(header, self.labeled())?;
        save_logged(&labeled, &outputs.labeled, "labeled femur + tibia mask")
    }
}

/// 保存 `mask` 到 `path` 并记录日志, 必要时创建父目录.
///
/// `what` 是日志中对该掩膜的描述.
pub fn save_logged(mask: &BoneMask, path: &Path, what: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    mask.save(path)?;
    log::info!("saved {what} to {}", path.display());
    Ok(())
}

/// 阈值化并标记连通域. 返回二值掩膜, 标签数组和连通域个数.
pub fn threshold_and_label(
    scan: &CtScan,
    hu: f32,
    structure: Structure,
) -> (Mask, Array3<u32>, usize) {
    let mask = scan.threshold(hu);
    let (labels, n) = morph::label(&mask, structure);
    log::info!("number of labels above {hu:.1} HU: {n}");
    (mask, labels, n)
}

/// 沿 `axis` 在 `floor(len * cut_frac)` 处切分. 返回 `(femur, tibia)`:
/// 股骨取索引 `>= cut` 的部分, 胫骨取 `< cut` 的部分.
///
/// `cut_frac` 不在 `[0, 1]` 内时返回 `Err`.
pub fn split_femur_tibia_by_slice(
    mask: &Mask,
    axis: SplitAxis,
    cut_frac: f64,
) -> Result<(Mask, Mask)> {
    if !(0.0..=1.0).contains(&cut_frac) {
        return Err(Error::InvalidParameter(
            "cut_frac",
            format!("{cut_frac} is not in [0, 1]"),
        ));
    }
    let axis = axis.axis();
    let len = mask.len_of(axis);
    let cut = ((len as f64 * cut_frac) as usize).min(len);
    log::debug!("split along {axis:?} at {cut} of {len}");

    let mut femur = mask.clone();
    femur.slice_axis_mut(axis, Slice::from(..cut)).fill(false);
    let mut tibia = mask.clone();
    tibia.slice_axis_mut(axis, Slice::from(cut..)).fill(false);
    Ok((femur, tibia))
}

/// 去除体素数小于 `min_size` 的 6-连通域, 然后执行 `closing_iter` 次 6-连通闭运算.
#[inline]
pub fn clean_mask(mask: &Mask, min_size: usize, closing_iter: usize) -> Mask {
    clean_mask_with(mask, min_size, closing_iter, Structure::Face)
}

/// 指定连通性的 [`clean_mask`].
pub fn clean_mask_with(
    mask: &Mask,
    min_size: usize,
    closing_iter: usize,
    structure: Structure,
) -> Mask {
    let kernel = Kernel::from_structure(structure);
    let mut cleaned = morph::remove_small_components(mask, min_size, structure);
    for _ in 0..closing_iter {
        cleaned = morph::binary_closing(&cleaned, &kernel, 1);
    }
    cleaned
}

/// 分割股骨与胫骨.
///
/// 阈值之上没有任何体素时返回 [`Error::EmptyMask`].
pub fn segment_bones(scan: &CtScan, params: &SegmentParams) -> Result<BoneSegmentation> {
    let threshold = match params.threshold {
        Some(hu) => ThresholdEstimate {
            hu,
            source: ThresholdSource::Manual,
        },
        None => find_bone_threshold_by_histogram(scan.finite_hu(), &params.histogram)?,
    };

    let (_, labels, num_labels) = threshold_and_label(scan, threshold.hu, params.structure);
    let sizes = morph::component_sizes(&labels, num_labels);
    let (best, largest_size) = morph::largest_label(&sizes).ok_or(Error::EmptyMask)?;
    log::info!("keeping only component #{best} of size {largest_size}");
    let bone = labels.mapv(|l| l == best);

    if let Some((lo, hi)) = morph::foreground_span(&bone, Axis(2)) {
        log::debug!("bone spans i in [{lo}, {hi}], middle {}", (lo + hi) / 2);
    }

    let (femur, tibia) = split_femur_tibia_by_slice(&bone, params.split_axis, params.cut_frac)?;
    let clean =
        |m: &Mask| clean_mask_with(m, params.min_size, params.closing_iter, params.structure);
    let (femur, tibia) = (clean(&femur), clean(&tibia));
    log::info!(
        "femur {} voxels, tibia {} voxels",
        femur.iter().filter(|p| **p).count(),
        tibia.iter().filter(|p| **p).count()
    );

    Ok(BoneSegmentation {
        threshold,
        num_labels,
        largest_size,
        femur,
        tibia,
    })
}
