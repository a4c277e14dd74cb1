//! 🦴欢迎光临🦵
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Affine, BoneMask, CtScan, Idx3d, Mask, NiftiHeaderAttr, ScanSummary, Spacing};
pub use crate::{Error, Result};

pub use crate::consts::label::{BACKGROUND, FEMUR, FOREGROUND, TIBIA};

pub use crate::dataset::{self, home_dataset_dir_with};

pub use crate::expand::{expand_bone_mask, expand_mask, ring_label_map, Expansion};
pub use crate::morph::{Kernel, Structure};
pub use crate::randomize::{randomized_mask, variant_label_map, RandomVariant};
pub use crate::segment::{segment_bones, BoneSegmentation, SegmentOutputs, SegmentParams};
pub use crate::threshold::{find_bone_threshold_by_histogram, HistogramParams, ThresholdEstimate};
