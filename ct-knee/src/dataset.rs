//! 数据集路径.
//!
//! 默认的数据布局为:
//!
//! ```text
//! {用户主目录}/dataset/knee/
//! ├── input/3702_left_knee.nii
//! └── output/
//!     ├── femur_tibia_mask.nii.gz
//!     └── tibia_only/tibia_mask_only.nii.gz
//! ```

use std::path::{Path, PathBuf};

/// 数据集在 `{用户主目录}/dataset` 下的子目录名.
pub const KNEE_DIR: &str = "knee";

/// 默认输入扫描文件名.
pub const DEFAULT_SCAN: &str = "3702_left_knee.nii";

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// `{用户主目录}/dataset/knee/input/3702_left_knee.nii`.
#[inline]
pub fn home_scan_path() -> Option<PathBuf> {
    home_dataset_dir_with([KNEE_DIR, "input", DEFAULT_SCAN])
}

/// `{用户主目录}/dataset/knee/output`.
#[inline]
pub fn home_output_dir() -> Option<PathBuf> {
    home_dataset_dir_with([KNEE_DIR, "output"])
}

/// 由目录和若干文件名组成的路径.
pub fn join_all<P: AsRef<Path>, I: IntoIterator<Item = P>>(dir: &Path, it: I) -> PathBuf {
    let mut ans = dir.to_path_buf();
    ans.extend(it);
    ans
}
