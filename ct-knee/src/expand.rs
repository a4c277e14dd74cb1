//! 按物理距离 (毫米) 扩张轮廓.
//!
//! 扩张量先按各轴体素分辨率换算为体素半径 (向上取整), 再以椭球结构元膨胀.
//! 因此各向异性的扫描在每个方向上都至少扩张 `expand_mm` 毫米.

use ndarray::Array3;

use crate::consts::label;
use crate::morph::{self, Kernel};
use crate::{BoneMask, Error, Mask, NiftiHeaderAttr, Result, Spacing};

/// 检查体素分辨率: 每个分量都必须是有限正数.
pub(crate) fn check_spacing(spacing: Spacing) -> Result<()> {
    if spacing.iter().all(|s| s.is_finite() && *s > 0.0) {
        Ok(())
    } else {
        Err(Error::InvalidParameter("spacing", format!("{spacing:?}")))
    }
}

/// 检查毫米距离: 必须是有限非负数.
pub(crate) fn check_mm(name: &'static str, mm: f64) -> Result<()> {
    if mm.is_finite() && mm >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(name, format!("{mm} mm")))
    }
}

/// 检查两个掩膜形状一致.
pub(crate) fn check_same_shape(a: &Mask, b: &Mask) -> Result<()> {
    if a.dim() == b.dim() {
        Ok(())
    } else {
        Err(Error::ShapeMismatch(a.dim(), b.dim()))
    }
}

/// 把 `expand_mm` 毫米换算为各轴体素半径 `ceil(expand_mm / spacing)`, 按 `(z, h, w)` 顺序.
pub fn radius_voxels(expand_mm: f64, spacing: Spacing) -> Result<[usize; 3]> {
    check_mm("expand_mm", expand_mm)?;
    check_spacing(spacing)?;
    Ok(spacing.map(|s| (expand_mm / s).ceil() as usize))
}

/// 扩张结果.
#[derive(Clone, Debug)]
pub struct Expansion {
    /// 实际使用的体素半径 `(z, h, w)`.
    pub radius: [usize; 3],

    /// 扩张后的掩膜.
    pub mask: Mask,
}

/// 将 `mask` 向外扩张 `expand_mm` 毫米.
///
/// `expand_mm` 为 0 时结果与输入相同.
pub fn expand_mask(mask: &Mask, spacing: Spacing, expand_mm: f64) -> Result<Expansion> {
    let radius = radius_voxels(expand_mm, spacing)?;
    log::info!("expanding by {expand_mm} mm, kernel radius (z, h, w) {radius:?}");
    let kernel = Kernel::ellipsoid(radius);
    Ok(Expansion {
        radius,
        mask: morph::binary_dilation(mask, &kernel, 1),
    })
}

/// 将标签中值为 `fg_value` 的区域扩张 `expand_mm` 毫米.
///
/// 扩张到的体素被写为 `fg_value`, 其他体素保持原值. 结果沿用 `mask` 的 header.
pub fn expand_bone_mask(mask: &BoneMask, expand_mm: f64, fg_value: u8) -> Result<BoneMask> {
    let spacing = mask.spacing();
    log::info!("voxel spacing (z, h, w) in mm: {spacing:?}");
    let expansion = expand_mask(&mask.to_mask_of(fg_value), spacing, expand_mm)?;

    let mut data = mask.data().to_owned();
    data.zip_mut_with(&expansion.mask, |p, &e| {
        if e {
            *p = fg_value;
        }
    });
    BoneMask::from_labels(mask.header(), data)
}

/// 扩张前后对比标签: 背景为 0, 原始区域 (`original`) 为 [`label::ORIGINAL`],
/// 仅由扩张新增的环带为 [`label::RING`].
pub fn ring_label_map(original: &Mask, expanded: &Mask) -> Result<Array3<u8>> {
    check_same_shape(original, expanded)?;
    let mut ans = Array3::<u8>::zeros(original.dim());
    ndarray::Zip::from(&mut ans)
        .and(original)
        .and(expanded)
        .for_each(|p, &o, &e| {
            *p = match (o, e) {
                (true, _) => label::ORIGINAL,
                (false, true) => label::RING,
                (false, false) => label::BACKGROUND,
            }
        });
    Ok(ans)
}
