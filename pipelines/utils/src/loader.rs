//! 对 `ct-knee::dataset` 的更一层封装. 提供输入输出路径.

use ct_knee::{dataset, Error, Result};
use std::env;
use std::path::PathBuf;

/// 输入扫描路径环境变量.
pub const INPUT_ENV: &str = "KNEE_INPUT";

/// 输出目录环境变量.
pub const OUTPUT_ENV: &str = "KNEE_OUTPUT_DIR";

/// 随机种子环境变量.
pub const SEED_ENV: &str = "KNEE_SEED";

/// 非空环境变量的值.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// 获取输入 CT 扫描路径.
///
/// 1. 若环境变量 `$KNEE_INPUT` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/knee/input/3702_left_knee.nii`.
pub fn input_path_from_env_or_home() -> Result<PathBuf> {
    match non_empty_var(INPUT_ENV) {
        Some(p) => Ok(PathBuf::from(p)),
        None => dataset::home_scan_path().ok_or(Error::NoHomeDir(INPUT_ENV)),
    }
}

/// 获取输出目录.
///
/// 1. 若环境变量 `$KNEE_OUTPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/knee/output`.
pub fn output_dir_from_env_or_home() -> Result<PathBuf> {
    match non_empty_var(OUTPUT_ENV) {
        Some(p) => Ok(PathBuf::from(p)),
        None => dataset::home_output_dir().ok_or(Error::NoHomeDir(OUTPUT_ENV)),
    }
}

/// 获取随机种子. 若 `$KNEE_SEED` 未设置则返回 `None`; 若无法解析为 `u64` 则返回 `Err`.
pub fn seed_from_env() -> Result<Option<u64>> {
    match non_empty_var(SEED_ENV) {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidParameter(SEED_ENV, format!("`{s}` is not a u64"))),
    }
}
