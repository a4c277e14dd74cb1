//! 各向异性欧氏距离变换.
//!
//! 逐轴执行一维下包络 (lower envelope) 变换, 复杂度与体素个数呈线性关系.

use ndarray::{Array3, ArrayViewMut1, Axis};

use crate::{Mask, Spacing};

/// 单条扫描线所需的缓冲区. 每条线都会复用, 以免重复分配.
#[derive(Default)]
struct LineBuf {
    f: Vec<f64>,
    v: Vec<usize>,
    z: Vec<f64>,
}

impl LineBuf {
    /// 对 `lane` 原地执行一维平方距离变换. `s2` 为该轴体素间距的平方.
    ///
    /// `lane` 中的 `inf` 表示该点不是源点. 若整条线都不含源点, 则保持 `inf`.
    fn transform(&mut self, mut lane: ArrayViewMut1<'_, f64>, s2: f64) {
        self.f.clear();
        self.f.extend(lane.iter().copied());
        self.v.clear();
        self.z.clear();
        let f = &self.f;

        // 抛物线 p 与 q (p < q) 的交点横坐标.
        let intersect = |p: usize, q: usize| {
            let (pf, qf) = (p as f64, q as f64);
            ((f[q] + s2 * qf * qf) - (f[p] + s2 * pf * pf)) / (2.0 * s2 * (qf - pf))
        };

        for q in 0..f.len() {
            if f[q].is_infinite() {
                continue;
            }
            loop {
                let Some(&p) = self.v.last() else {
                    self.v.push(q);
                    self.z.push(f64::NEG_INFINITY);
                    break;
                };
                let x = intersect(p, q);
                if self.z.last().is_some_and(|&zl| x <= zl) {
                    self.v.pop();
                    self.z.pop();
                } else {
                    self.v.push(q);
                    self.z.push(x);
                    break;
                }
            }
        }

        if self.v.is_empty() {
            return;
        }
        let mut k = 0;
        for (p, out) in lane.iter_mut().enumerate() {
            let pf = p as f64;
            while k + 1 < self.v.len() && self.z[k + 1] < pf {
                k += 1;
            }
            let d = pf - self.v[k] as f64;
            *out = s2 * d * d + f[self.v[k]];
        }
    }
}

/// 源点为 0, 其余为 `inf` 的初始距离场.
#[inline]
fn init(mask: &Mask) -> Array3<f64> {
    mask.mapv(|p| if p { 0.0 } else { f64::INFINITY })
}

/// 每个体素到最近的前景 (`true`) 体素中心的平方欧氏距离, 以平方毫米为单位.
///
/// 前景体素处为 0; 若 `mask` 没有前景, 则全部为 `inf`.
/// `spacing` 按 `(z, h, w)` 给出, 且每个分量都必须为正.
pub fn edt_squared(mask: &Mask, spacing: Spacing) -> Array3<f64> {
    debug_assert!(spacing.iter().all(|s| *s > 0.0));
    let mut dist = init(mask);
    let mut buf = LineBuf::default();
    for (axis, s) in spacing.iter().enumerate() {
        for lane in dist.lanes_mut(Axis(axis)) {
            buf.transform(lane, s * s);
        }
    }
    dist
}

/// [`edt_squared`] 的并行版本. 同一轴上的扫描线互相独立, 因此按线并行.
#[cfg(feature = "rayon")]
pub fn par_edt_squared(mask: &Mask, spacing: Spacing) -> Array3<f64> {
    use ndarray::Zip;

    debug_assert!(spacing.iter().all(|s| *s > 0.0));
    let mut dist = init(mask);
    for (axis, s) in spacing.iter().enumerate() {
        let s2 = s * s;
        Zip::from(dist.lanes_mut(Axis(axis))).par_for_each(|lane| {
            LineBuf::default().transform(lane, s2);
        });
    }
    dist
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        /// 同时计算前景和背景的平方距离场.
        fn edt_pair(fg: &Mask, bg: &Mask, spacing: Spacing) -> (Array3<f64>, Array3<f64>) {
            rayon::join(
                || par_edt_squared(fg, spacing),
                || par_edt_squared(bg, spacing),
            )
        }
    } else {
        fn edt_pair(fg: &Mask, bg: &Mask, spacing: Spacing) -> (Array3<f64>, Array3<f64>) {
            (edt_squared(fg, spacing), edt_squared(bg, spacing))
        }
    }
}

/// 符号距离场 (毫米). 外部为到最近前景体素的距离 (正),
/// 内部为到最近背景体素距离的相反数 (负).
///
/// `mask` 全为背景时外部距离为 `+inf`; 全为前景时内部距离为 `-inf`.
pub fn signed_distance(mask: &Mask, spacing: Spacing) -> Array3<f64> {
    let inverted = mask.mapv(|p| !p);
    let (outside, inside) = edt_pair(mask, &inverted, spacing);
    let mut ans = outside;
    ndarray::Zip::from(&mut ans)
        .and(&inside)
        .and(mask)
        .for_each(|d, &i, &p| *d = if p { -i.sqrt() } else { d.sqrt() });
    ans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Idx3d;
    use itertools::iproduct;

    fn brute_force(mask: &Mask, spacing: Spacing) -> Array3<f64> {
        let sources: Vec<Idx3d> = mask
            .indexed_iter()
            .filter(|(_, p)| **p)
            .map(|(pos, _)| pos)
            .collect();
        Array3::from_shape_fn(mask.dim(), |(z, h, w)| {
            sources
                .iter()
                .map(|&(sz, sh, sw)| {
                    let dz = (z as f64 - sz as f64) * spacing[0];
                    let dh = (h as f64 - sh as f64) * spacing[1];
                    let dw = (w as f64 - sw as f64) * spacing[2];
                    dz * dz + dh * dh + dw * dw
                })
                .fold(f64::INFINITY, f64::min)
        })
    }

    fn pattern() -> Mask {
        let mut m = Mask::from_elem((6, 7, 9), false);
        for (z, h, w) in iproduct!(0..6, 0..7, 0..9) {
            m[(z, h, w)] = (z * 31 + h * 17 + w * 7) % 23 == 0;
        }
        m
    }

    #[test]
    fn test_edt_single_voxel() {
        let mut m = Mask::from_elem((3, 3, 5), false);
        m[(1, 1, 0)] = true;
        let d = edt_squared(&m, [2.0, 1.0, 0.5]);
        assert_eq!(d[(1, 1, 0)], 0.0);
        assert_eq!(d[(1, 1, 4)], 4.0);
        assert_eq!(d[(0, 1, 0)], 4.0);
        assert_eq!(d[(0, 0, 2)], 4.0 + 1.0 + 1.0);
    }

    #[test]
    fn test_edt_matches_brute_force() {
        let m = pattern();
        for spacing in [[1.0, 1.0, 1.0], [3.0, 0.7, 0.7], [0.5, 2.0, 1.25]] {
            let fast = edt_squared(&m, spacing);
            let brute = brute_force(&m, spacing);
            for (a, b) in fast.iter().zip(brute.iter()) {
                assert!((a - b).abs() < 1e-9, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_edt_empty() {
        let d = edt_squared(&Mask::from_elem((2, 3, 4), false), [1.0; 3]);
        assert!(d.iter().all(|v| v.is_infinite()));
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_par_edt_squared() {
        let m = pattern();
        let spacing = [2.5, 0.8, 0.8];
        assert_eq!(par_edt_squared(&m, spacing), edt_squared(&m, spacing));
    }

    #[test]
    fn test_signed_distance() {
        let mut m = Mask::from_elem((1, 1, 9), false);
        for w in 3..6 {
            m[(0, 0, w)] = true;
        }
        let d = signed_distance(&m, [1.0, 1.0, 0.5]);
        assert_eq!(d[(0, 0, 0)], 1.5);
        assert_eq!(d[(0, 0, 2)], 0.5);
        assert_eq!(d[(0, 0, 3)], -0.5);
        assert_eq!(d[(0, 0, 4)], -1.0);
        assert_eq!(d[(0, 0, 8)], 1.5);
    }

    #[test]
    fn test_signed_distance_degenerate() {
        let empty = signed_distance(&Mask::from_elem((2, 2, 2), false), [1.0; 3]);
        assert!(empty.iter().all(|v| *v == f64::INFINITY));
        let full = signed_distance(&Mask::from_elem((2, 2, 2), true), [1.0; 3]);
        assert!(full.iter().all(|v| *v == f64::NEG_INFINITY));
    }
}
