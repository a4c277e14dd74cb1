//! 体素坐标到物理坐标 (毫米) 的仿射变换.

use std::fmt;

use nalgebra::{Matrix4, Vector3, Vector4};
use nifti::NiftiHeader;

use crate::Idx3d;

/// 4x4 仿射矩阵, 把 nifti 体素坐标 `(i, j, k)` 映射到物理坐标 `(x, y, z)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Affine(Matrix4<f64>);

impl Affine {
    /// 从 header 中提取仿射变换.
    ///
    /// 1. `sform_code > 0` 时使用 `srow_{x, y, z}`;
    /// 2. 否则 `qform_code > 0` 时由四元数、pixdim 和 `qoffset` 构造;
    /// 3. 否则仅按 pixdim 缩放.
    pub fn from_header(h: &NiftiHeader) -> Self {
        if h.sform_code > 0 {
            Self(h.sform_affine())
        } else if h.qform_code > 0 {
            Self(qform_sanitized(h).qform_affine())
        } else {
            let [_, dx, dy, dz, ..] = h.pixdim.map(|p| p.abs() as f64);
            Self(Matrix4::new_nonuniform_scaling(&Vector3::new(dx, dy, dz)))
        }
    }

    /// 原始矩阵.
    #[inline]
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// 把 nifti 体素坐标 `(i, j, k)` 映射到物理坐标.
    pub fn apply(&self, [i, j, k]: [f64; 3]) -> [f64; 3] {
        let p = self.0 * Vector4::new(i, j, k, 1.0);
        [p.x, p.y, p.z]
    }

    /// 把本 crate 的 `(z, h, w)` 索引映射到物理坐标.
    #[inline]
    pub fn apply_zhw(&self, (z, h, w): Idx3d) -> [f64; 3] {
        self.apply([w as f64, h as f64, z as f64])
    }
}

/// `nifti` 在 qfac 不为 ±1、pixdim 为负或四元数模长超过 1 时直接 panic.
/// 这里先按 NIfTI-1 的约定把这些字段整理好.
fn qform_sanitized(h: &NiftiHeader) -> NiftiHeader {
    let mut q = h.clone();
    q.pixdim[0] = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    for p in &mut q.pixdim[1..4] {
        *p = p.abs();
    }
    let (b, c, d) = (q.quatern_b, q.quatern_c, q.quatern_d);
    let n = (b * b + c * c + d * d).sqrt();
    if n > 1.0 {
        (q.quatern_b, q.quatern_c, q.quatern_d) = (b / n, c / n, d / n);
    }
    q
}

impl fmt::Display for Affine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.0.row_iter().enumerate() {
            write!(
                f,
                "[{:10.4} {:10.4} {:10.4} {:10.4}]",
                row[0], row[1], row[2], row[3]
            )?;
            if i != 3 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
