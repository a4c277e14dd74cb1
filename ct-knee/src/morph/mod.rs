//! 3D 二值形态学操作.
//!
//! 语义与 `scipy.ndimage` 保持一致: 体数据之外的体素一律视为背景.

use ndarray::{s, ArrayView3, Axis};

use crate::{Idx3d, Mask};

mod distance;
mod kernel;
mod label;

pub use distance::{edt_squared, signed_distance};
pub use kernel::{Kernel, Structure};
pub use label::{
    component_sizes, label, largest_component, largest_label, remove_small_components,
};

#[cfg(feature = "rayon")]
pub use distance::par_edt_squared;

use kernel::Offset;

/// 计算 `pos + d`. 若结果越界 (相对 `dim`) 则返回 `None`.
#[inline]
pub(crate) fn shift((z, h, w): Idx3d, (dz, dh, dw): Offset, dim: Idx3d) -> Option<Idx3d> {
    let z = z.checked_add_signed(dz).filter(|v| *v < dim.0)?;
    let h = h.checked_add_signed(dh).filter(|v| *v < dim.1)?;
    let w = w.checked_add_signed(dw).filter(|v| *v < dim.2)?;
    Some((z, h, w))
}

/// 在体数据四周补 `pad` 层背景.
fn pad_background(mask: &Mask, [pz, ph, pw]: [usize; 3]) -> Mask {
    let (z, h, w) = mask.dim();
    let mut ans = Mask::from_elem((z + 2 * pz, h + 2 * ph, w + 2 * pw), false);
    ans.slice_mut(s![pz..pz + z, ph..ph + h, pw..pw + w])
        .assign(mask);
    ans
}

/// 逐次调用 `ndarray_ndimage` 的形态学操作.
///
/// 每次调用前都在四周补上结构元半径那么厚的背景, 调用后再裁回原大小.
/// 这样体数据之外的体素始终是背景, 且结构元比体数据大时也能处理.
fn padded_iterations<F>(mask: &Mask, kernel: &Kernel, iterations: usize, op: F) -> Mask
where
    F: Fn(&Mask, ArrayView3<'_, bool>) -> Mask,
{
    let mut cur = mask.clone();
    if kernel.is_identity() || mask.is_empty() {
        return cur;
    }
    let [pz, ph, pw] = kernel.radius();
    let (z, h, w) = mask.dim();
    for _ in 0..iterations {
        let padded = op(&pad_background(&cur, kernel.radius()), kernel.as_array());
        cur = padded
            .slice(s![pz..pz + z, ph..ph + h, pw..pw + w])
            .to_owned();
    }
    cur
}

/// 二值膨胀, 重复 `iterations` 次.
pub fn binary_dilation(mask: &Mask, kernel: &Kernel, iterations: usize) -> Mask {
    padded_iterations(mask, kernel, iterations, |m, k| {
        ndarray_ndimage::binary_dilation(m, &k, 1)
    })
}

/// 二值腐蚀, 重复 `iterations` 次.
///
/// 结构元伸出体数据之外的前景体素会被腐蚀掉.
pub fn binary_erosion(mask: &Mask, kernel: &Kernel, iterations: usize) -> Mask {
    padded_iterations(mask, kernel, iterations, |m, k| {
        ndarray_ndimage::binary_erosion(m, &k, 1)
    })
}

/// 二值闭运算: 先膨胀 `iterations` 次, 再腐蚀 `iterations` 次.
///
/// 与 `ndarray_ndimage::binary_closing` 不同, 腐蚀时体数据边界之外同样视为背景.
#[inline]
pub fn binary_closing(mask: &Mask, kernel: &Kernel, iterations: usize) -> Mask {
    binary_erosion(&binary_dilation(mask, kernel, iterations), kernel, iterations)
}

/// 前景表面: `mask` 减去其 6-连通腐蚀结果.
pub fn surface(mask: &Mask) -> Mask {
    let eroded = binary_erosion(mask, &Kernel::from_structure(Structure::Face), 1);
    let mut ans = mask.clone();
    ans.zip_mut_with(&eroded, |s, &e| *s &= !e);
    ans
}

/// 前景在 `axis` 方向上的索引范围 `[min, max]`. 若不存在前景则返回 `None`.
pub fn foreground_span(mask: &Mask, axis: Axis) -> Option<(usize, usize)> {
    let mut it = mask
        .axis_iter(axis)
        .enumerate()
        .filter(|(_, sli)| sli.iter().any(|p| *p))
        .map(|(i, _)| i);
    let first = it.next()?;
    Some((first, it.last().unwrap_or(first)))
}
