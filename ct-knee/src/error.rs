//! 运行时错误.

use crate::Idx3d;
use thiserror::Error as ThisError;

/// 读写、分割、扩张过程中的错误.
#[derive(Debug, ThisError)]
pub enum Error {
    /// 读写 nifti 文件错误.
    #[error("nifti error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 其他底层 I/O 错误.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 体数据维度不是 3 (允许末尾长度为 1 的第 4 维).
    #[error("expected a 3D volume, got dim {0:?}")]
    UnsupportedDim(Vec<usize>),

    /// 两个本应对齐的体数据形状不一致.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Idx3d, Idx3d),

    /// 掩膜没有任何前景体素.
    #[error("mask has no foreground voxel")]
    EmptyMask,

    /// 找不到用户主目录, 且对应的环境变量未设置.
    #[error("cannot locate home directory, set `{0}` instead")]
    NoHomeDir(&'static str),

    /// 参数不合法. 第一个参数是参数名, 第二个是原因.
    #[error("invalid parameter `{0}`: {1}")]
    InvalidParameter(&'static str, String),
}

/// 本 crate 的 `Result`.
pub type Result<T> = std::result::Result<T, Error>;
