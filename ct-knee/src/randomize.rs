//! 随机轮廓变体.
//!
//! 在原始掩膜的符号距离场上以随机半径 `r ~ U[0, max_mm)` 取阈值,
//! 得到一个介于原始轮廓与 `max_mm` 扩张轮廓之间的掩膜.

use ndarray::Array3;
use rand::Rng;

use crate::consts::label;
use crate::expand::{check_mm, check_same_shape, check_spacing};
use crate::morph;
use crate::{BoneMask, Mask, NiftiHeaderAttr, Result};

/// 随机变体.
#[derive(Clone, Debug)]
pub struct RandomVariant {
    /// 抽样得到的扩张半径 (毫米).
    pub radius_mm: f64,

    /// 二值掩膜, 前景为 [`label::FOREGROUND`]. 沿用原始 header.
    pub mask: BoneMask,
}

/// 生成随机变体. 所有非零体素视为前景.
///
/// `max_mm` 为 0 时半径恒为 0, 结果即原始前景.
pub fn randomized_mask<R: Rng>(
    mask: &BoneMask,
    max_mm: f64,
    rng: &mut R,
) -> Result<RandomVariant> {
    check_mm("max_mm", max_mm)?;
    let spacing = mask.spacing();
    check_spacing(spacing)?;

    let dist = morph::signed_distance(&mask.to_mask(), spacing);
    let radius_mm = if max_mm > 0.0 {
        rng.gen_range(0.0..max_mm)
    } else {
        0.0
    };
    log::info!("using random expansion r = {radius_mm:.2} mm (max {max_mm} mm)");

    let variant = dist.mapv(|d| d <= radius_mm);
    Ok(RandomVariant {
        radius_mm,
        mask: BoneMask::from_binary(mask.header(), &variant)?,
    })
}

/// 对比原始、固定扩张与随机变体: 背景为 0, 原始区域为 [`label::ORIGINAL`],
/// 只属于随机变体的区域为 [`label::RANDOM_ONLY`],
/// 只属于固定扩张的区域为 [`label::FIXED_ONLY`].
pub fn variant_label_map(original: &Mask, fixed: &Mask, random: &Mask) -> Result<Array3<u8>> {
    check_same_shape(original, fixed)?;
    check_same_shape(original, random)?;
    let mut ans = Array3::<u8>::zeros(original.dim());
    ndarray::Zip::from(&mut ans)
        .and(original)
        .and(fixed)
        .and(random)
        .for_each(|p, &o, &f, &r| {
            *p = match (o, f, r) {
                (true, _, _) => label::ORIGINAL,
                (false, false, true) => label::RANDOM_ONLY,
                (false, true, false) => label::FIXED_ONLY,
                _ => label::BACKGROUND,
            }
        });
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand_mask;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tibia() -> BoneMask {
        let mut data = Array3::<u8>::zeros((9, 16, 16));
        for z in 3..6 {
            for h in 6..10 {
                for w in 5..11 {
                    data[(z, h, w)] = label::FOREGROUND;
                }
            }
        }
        BoneMask::fake(data, [1.5, 0.5, 0.5])
    }

    #[test]
    fn test_seeded_is_deterministic() {
        let mask = tibia();
        let a = randomized_mask(&mask, 2.0, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = randomized_mask(&mask, 2.0, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.radius_mm, b.radius_mm);
        assert_eq!(a.mask.data(), b.mask.data());
        assert!((0.0..2.0).contains(&a.radius_mm));
    }

    /// 随机变体介于原始掩膜与 `max_mm` 扩张掩膜之间.
    #[test]
    fn test_between_original_and_fixed() {
        let mask = tibia();
        let original = mask.to_mask();
        let fixed = expand_mask(&original, mask.spacing(), 4.0).unwrap().mask;
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..5 {
            let v = randomized_mask(&mask, 4.0, &mut rng).unwrap();
            let random = v.mask.to_mask();
            for ((o, f), r) in original.iter().zip(fixed.iter()).zip(random.iter()) {
                assert!(!*o || *r);
                assert!(!*r || *f);
            }
        }
    }

    #[test]
    fn test_zero_max_is_original() {
        let mask = tibia();
        let v = randomized_mask(&mask, 0.0, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(v.radius_mm, 0.0);
        assert_eq!(v.mask.to_mask(), mask.to_mask());
    }

    #[test]
    fn test_empty_and_invalid() {
        let empty = BoneMask::fake(Array3::zeros((3, 3, 3)), [1.0; 3]);
        let v = randomized_mask(&empty, 2.0, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(v.mask.count(label::FOREGROUND), 0);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(randomized_mask(&empty, -1.0, &mut rng).is_err());
        assert!(randomized_mask(&empty, f64::INFINITY, &mut rng).is_err());
    }

    #[test]
    fn test_variant_label_map() {
        let mut o = Mask::from_elem((1, 1, 5), false);
        let mut f = o.clone();
        let mut r = o.clone();
        o[(0, 0, 0)] = true;
        f[(0, 0, 0)] = true;
        r[(0, 0, 0)] = true;
        f[(0, 0, 1)] = true;
        r[(0, 0, 1)] = true;
        r[(0, 0, 2)] = true;
        f[(0, 0, 3)] = true;
        let l = variant_label_map(&o, &f, &r).unwrap();
        assert_eq!(l.as_slice().unwrap(), &[1, 0, 2, 3, 0]);
    }
}
