use itertools::iproduct;
use ndarray::{Array3, ArrayView3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 三维偏移, 按 `(z, h, w)` 顺序.
pub(crate) type Offset = (isize, isize, isize);

/// 3 x 3 x 3 的基础连通结构.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Structure {
    /// 6-连通 (钻石型). 相当于 `generate_binary_structure(3, 1)`.
    Face,

    /// 26-连通. 相当于 `generate_binary_structure(3, 3)`.
    Full,
}

impl Structure {
    /// 不含中心点的邻居偏移.
    pub(crate) fn neighbours(&self) -> Vec<Offset> {
        match self {
            Structure::Face => vec![
                (-1, 0, 0),
                (1, 0, 0),
                (0, -1, 0),
                (0, 1, 0),
                (0, 0, -1),
                (0, 0, 1),
            ],
            Structure::Full => iproduct!(-1..=1, -1..=1, -1..=1)
                .filter(|&d| d != (0, 0, 0))
                .collect(),
        }
    }
}

/// 形态学结构元.
///
/// 以 `(2 rz + 1, 2 rh + 1, 2 rw + 1)` 的布尔数组存储, 中心总为 `true`.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    data: Array3<bool>,
    radius: [usize; 3],
}

impl Kernel {
    fn from_fn<F>(radius: [usize; 3], f: F) -> Self
    where
        F: Fn(Offset) -> bool,
    {
        let [rz, rh, rw] = radius;
        let data = Array3::from_shape_fn((2 * rz + 1, 2 * rh + 1, 2 * rw + 1), |(z, h, w)| {
            f((
                z as isize - rz as isize,
                h as isize - rh as isize,
                w as isize - rw as isize,
            ))
        });
        Self { data, radius }
    }

    /// 由基础连通结构生成 3 x 3 x 3 结构元.
    pub fn from_structure(s: Structure) -> Self {
        let neighbours = s.neighbours();
        Self::from_fn([1; 3], |d| d == (0, 0, 0) || neighbours.contains(&d))
    }

    /// 生成各轴半径分别为 `[rz, rh, rw]` 体素的椭球结构元.
    ///
    /// 偏移 `d` 被包含当且仅当 `sum (d_a / (r_a + 0.5))^2 <= 1`,
    /// 与 ITK 的 ball 结构元一致. 半径为 0 的轴只包含偏移 0.
    pub fn ellipsoid(radius: [usize; 3]) -> Self {
        let axes = radius.map(|r| r as f64 + 0.5);
        Self::from_fn(radius, |(z, h, w)| {
            [z, h, w]
                .iter()
                .zip(axes)
                .map(|(&v, a)| (v as f64 / a).powi(2))
                .sum::<f64>()
                <= 1.0
        })
    }

    /// 布尔数组形式的结构元, 可直接交给 `ndarray_ndimage`.
    #[inline]
    pub fn as_array(&self) -> ArrayView3<'_, bool> {
        self.data.view()
    }

    /// 各轴半径 `(z, h, w)`.
    #[inline]
    pub fn radius(&self) -> [usize; 3] {
        self.radius
    }

    /// 结构元包含的偏移个数.
    pub fn len(&self) -> usize {
        self.data.iter().filter(|p| **p).count()
    }

    /// 结构元是否只包含中心 (即膨胀/腐蚀为恒等变换)?
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.len() == 1
    }

    /// 结构元是否包含偏移 `d`?
    pub fn contains(&self, (z, h, w): Offset) -> bool {
        let [rz, rh, rw] = self.radius.map(|r| r as isize);
        if z.abs() > rz || h.abs() > rh || w.abs() > rw {
            return false;
        }
        self.data[((z + rz) as usize, (h + rh) as usize, (w + rw) as usize)]
    }
}
