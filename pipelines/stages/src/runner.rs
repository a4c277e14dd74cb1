//! 程序运行函数.

use crate::layout::OutputLayout;
use ct_knee::consts::label::FOREGROUND;
use ct_knee::expand::{expand_bone_mask, expand_mask, ring_label_map};
use ct_knee::randomize::{randomized_mask, variant_label_map};
use ct_knee::segment::{save_logged, segment_bones, BoneSegmentation, SegmentParams};
use ct_knee::{BoneMask, CtScan, NiftiHeaderAttr, Result};
use rand::Rng;
use std::path::Path;

/// 股骨 + 胫骨掩膜的扩张量 (毫米).
pub const COMBINED_EXPAND_MM: f64 = 2.0;

/// 胫骨掩膜的扩张量 (毫米).
pub const TIBIA_EXPAND_MM: [f64; 2] = [2.0, 4.0];

/// 胫骨随机变体的最大扩张量 (毫米). 第 `i` 项对应第 `i + 1` 个变体.
pub const RANDOM_MAX_MM: [f64; 2] = [2.0, 4.0];

/// 分割 `scan` 并把三个结果写入 `layout`.
pub fn segment(
    scan: &CtScan,
    params: &SegmentParams,
    layout: &OutputLayout,
) -> Result<BoneSegmentation> {
    log::info!("input scan:\n{}", scan.summary());
    let seg = segment_bones(scan, params)?;
    seg.save(scan.header(), &layout.segment_outputs())?;
    Ok(seg)
}

/// 读取 `input` 并以默认参数 (自动阈值) 分割.
pub fn segment_file(input: &Path, layout: &OutputLayout) -> Result<BoneSegmentation> {
    let scan = CtScan::open(input)?;
    segment(&scan, &SegmentParams::default(), layout)
}

/// 扩张分割结果:
///
/// 1. 股骨 + 胫骨掩膜扩张 [`COMBINED_EXPAND_MM`], 同时输出原始/环带标签;
/// 2. 胫骨掩膜分别扩张 [`TIBIA_EXPAND_MM`] 中的每个值.
pub fn expand(layout: &OutputLayout) -> Result<()> {
    let combined = BoneMask::open(layout.combined())?;
    let mm = COMBINED_EXPAND_MM;
    let expanded = expand_bone_mask(&combined, mm, FOREGROUND)?;
    save_logged(&expanded, &layout.combined_expanded(mm), "expanded mask")?;

    let ring = ring_label_map(&combined.to_mask(), &expanded.to_mask())?;
    let ring = BoneMask::from_labels(combined.header(), ring)?;
    save_logged(&ring, &layout.combined_expanded_labeled(mm), "ring labels")?;
    log::info!("labels: 0 = background, 1 = original, 2 = ring");

    let tibia = BoneMask::open(layout.tibia_only())?;
    for mm in TIBIA_EXPAND_MM {
        let expanded = expand_bone_mask(&tibia, mm, FOREGROUND)?;
        save_logged(&expanded, &layout.tibia_expanded(mm), "expanded tibia")?;
    }
    Ok(())
}

/// 为胫骨掩膜生成随机变体, 并输出与同等固定扩张的对比标签.
/// 返回每个变体抽样得到的半径 (毫米).
pub fn randomize<R: Rng>(layout: &OutputLayout, rng: &mut R) -> Result<Vec<f64>> {
    let tibia = BoneMask::open(layout.tibia_only())?;
    let original = tibia.to_mask();
    let mut radii = Vec::with_capacity(RANDOM_MAX_MM.len());

    for (i, max_mm) in RANDOM_MAX_MM.into_iter().enumerate() {
        let variant = randomized_mask(&tibia, max_mm, rng)?;
        save_logged(&variant.mask, &layout.tibia_random(i + 1), "random tibia")?;

        let fixed = expand_mask(&original, tibia.spacing(), max_mm)?.mask;
        let labels = variant_label_map(&original, &fixed, &variant.mask.to_mask())?;
        let labels = BoneMask::from_labels(tibia.header(), labels)?;
        save_logged(&labels, &layout.tibia_random_labeled(i + 1), "variant labels")?;
        radii.push(variant.radius_mm);
    }
    log::info!("labels: 0 = background, 1 = original, 2 = random-only, 3 = fixed-only");
    Ok(radii)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_knee::consts::{hu, label};
    use ndarray::Array3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 两块骨头由一根细柱连接.
    fn knee() -> CtScan {
        let mut data = Array3::from_elem((20, 10, 10), hu::AIR);
        for z in (2..8).chain(12..18) {
            for h in 3..7 {
                for w in 3..7 {
                    data[(z, h, w)] = 800.0;
                }
            }
        }
        for z in 8..12 {
            data[(z, 4, 4)] = 400.0;
        }
        CtScan::fake(data, [1.0, 0.5, 0.5])
    }

    #[test]
    fn test_full_pipeline() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("knee-stages-{}", std::process::id()));
        let layout = OutputLayout::new(&dir);

        let params = SegmentParams {
            threshold: Some(150.0),
            min_size: 10,
            closing_iter: 1,
            ..Default::default()
        };
        let seg = segment(&knee(), &params, &layout).unwrap();
        expand(&layout).unwrap();
        let radii = randomize(&layout, &mut StdRng::seed_from_u64(2024)).unwrap();

        let tibia = BoneMask::open(layout.tibia_only()).unwrap();
        let tibia_4mm = BoneMask::open(layout.tibia_expanded(4.0)).unwrap();
        let ring = BoneMask::open(layout.combined_expanded_labeled(2.0)).unwrap();
        let random2 = BoneMask::open(layout.tibia_random(2)).unwrap();
        let compare2 = BoneMask::open(layout.tibia_random_labeled(2)).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(tibia.to_mask(), seg.tibia);
        assert!(tibia_4mm.count(FOREGROUND) > tibia.count(FOREGROUND));
        assert!(ring.count(label::RING) > 0);
        let combined = seg.combined().iter().filter(|p| **p).count();
        assert_eq!(ring.count(label::ORIGINAL), combined);

        assert_eq!(radii.len(), 2);
        assert!((0.0..4.0).contains(&radii[1]));
        // 随机变体不会超出 4 mm 的固定扩张
        let fixed = tibia_4mm.to_mask();
        assert!(random2.to_mask().iter().zip(fixed.iter()).all(|(r, f)| !*r || *f));
        assert_eq!(compare2.count(label::ORIGINAL), tibia.count(FOREGROUND));
    }
}
