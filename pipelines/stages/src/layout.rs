//! 输出目录下各文件的位置.

use ct_knee::segment::SegmentOutputs;
use std::path::{Path, PathBuf};

/// 股骨 + 胫骨二值掩膜.
pub const COMBINED: &str = "femur_tibia_mask.nii.gz";
/// 股骨为 1, 胫骨为 2 的标签.
pub const COMBINED_LABELED: &str = "femur_tibia_mask_labeled.nii.gz";
/// 胫骨相关文件所在子目录.
pub const TIBIA_DIR: &str = "tibia_only";
/// 仅胫骨的二值掩膜.
pub const TIBIA_ONLY: &str = "tibia_mask_only.nii.gz";

/// 扩张后的文件名: `femur_tibia_mask.nii.gz` -> `femur_tibia_mask_2mm_expanded.nii.gz`.
pub fn expanded_name(base: &str, mm: f64) -> String {
    let stem = base.trim_end_matches(".nii.gz");
    format!("{stem}_{mm}mm_expanded.nii.gz")
}

/// 在文件名后缀 `.nii.gz` 之前插入 `_labeled`.
pub fn labeled_name(name: &str) -> String {
    let stem = name.trim_end_matches(".nii.gz");
    format!("{stem}_labeled.nii.gz")
}

/// 第 `i` 个 (从 1 开始) 胫骨随机变体.
pub fn random_name(i: usize) -> String {
    format!("random_mask{i}_tibia.nii.gz")
}

/// 输出目录.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    /// 以 `dir` 为根目录.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// 根目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 胫骨子目录.
    #[inline]
    pub fn tibia_dir(&self) -> PathBuf {
        self.dir.join(TIBIA_DIR)
    }

    /// 分割阶段的三个输出.
    pub fn segment_outputs(&self) -> SegmentOutputs {
        SegmentOutputs {
            combined: self.combined(),
            labeled: self.dir.join(COMBINED_LABELED),
            tibia_only: self.tibia_only(),
        }
    }

    /// 股骨 + 胫骨二值掩膜.
    #[inline]
    pub fn combined(&self) -> PathBuf {
        self.dir.join(COMBINED)
    }

    /// 仅胫骨的二值掩膜.
    #[inline]
    pub fn tibia_only(&self) -> PathBuf {
        self.tibia_dir().join(TIBIA_ONLY)
    }

    /// 扩张 `mm` 毫米后的股骨 + 胫骨掩膜.
    pub fn combined_expanded(&self, mm: f64) -> PathBuf {
        self.dir.join(expanded_name(COMBINED, mm))
    }

    /// 扩张 `mm` 毫米后的股骨 + 胫骨环带标签.
    pub fn combined_expanded_labeled(&self, mm: f64) -> PathBuf {
        self.dir.join(labeled_name(&expanded_name(COMBINED, mm)))
    }

    /// 扩张 `mm` 毫米后的胫骨掩膜.
    pub fn tibia_expanded(&self, mm: f64) -> PathBuf {
        self.tibia_dir().join(expanded_name(TIBIA_ONLY, mm))
    }

    /// 第 `i` 个胫骨随机变体.
    pub fn tibia_random(&self, i: usize) -> PathBuf {
        self.tibia_dir().join(random_name(i))
    }

    /// 第 `i` 个胫骨随机变体的对比标签.
    pub fn tibia_random_labeled(&self, i: usize) -> PathBuf {
        self.tibia_dir().join(labeled_name(&random_name(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(
            expanded_name(COMBINED, 2.0),
            "femur_tibia_mask_2mm_expanded.nii.gz"
        );
        assert_eq!(
            labeled_name(&expanded_name(COMBINED, 2.0)),
            "femur_tibia_mask_2mm_expanded_labeled.nii.gz"
        );
        assert_eq!(
            expanded_name(TIBIA_ONLY, 4.0),
            "tibia_mask_only_4mm_expanded.nii.gz"
        );
        assert_eq!(expanded_name(TIBIA_ONLY, 1.5), "tibia_mask_only_1.5mm_expanded.nii.gz");
        assert_eq!(random_name(2), "random_mask2_tibia.nii.gz");
    }

    #[test]
    fn test_layout() {
        let l = OutputLayout::new("/data/out");
        assert_eq!(
            l.tibia_only(),
            PathBuf::from("/data/out/tibia_only/tibia_mask_only.nii.gz")
        );
        assert_eq!(
            l.segment_outputs().labeled,
            PathBuf::from("/data/out/femur_tibia_mask_labeled.nii.gz")
        );
        assert_eq!(
            l.tibia_random_labeled(1),
            PathBuf::from("/data/out/tibia_only/random_mask1_tibia_labeled.nii.gz")
        );
    }
}
