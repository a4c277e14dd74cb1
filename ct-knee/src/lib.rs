#![warn(missing_docs)]

//! 核心库. 提供膝关节 CT 扫描 (HU) 的骨骼分割、清理、物理距离扩张和随机轮廓变体生成.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 所有 3D 数据都按照 `(z, h, w)` 组织, 即 nifti 原始 `(i, j, k)` 的逆序.
//!   因此 `Axis(0)` 是切片方向 `k`, `Axis(2)` 是 nifti 的第一维 `i`.
//! 2. 文件读写失败、参数非法等情况以 [`Error`] 返回, 而不是 panic.
//!
//! # 开发计划
//!
//! ### 根据 HU 直方图自动估计骨阈值 ✅
//!
//! 直方图平滑后求梯度, 从软组织峰值之后最陡下降处开始寻找平坦段.
//!
//! 实现位于 `ct-knee/src/threshold.rs`.
//!
//! ### 三维形态学操作 ✅
//!
//! 连通域标记、膨胀、腐蚀、闭运算、椭球结构元, 以及各向异性的欧氏距离变换.
//!
//! 实现位于 `ct-knee/src/morph`.
//!
//! ### 股骨/胫骨分割 ✅
//!
//! 阈值 -> 最大连通域 -> 按切片切分 -> 去除小连通域 + 闭运算 -> 保存.
//!
//! 实现位于 `ct-knee/src/segment.rs`.
//!
//! ### 按物理距离扩张轮廓 ✅
//!
//! 将毫米换算为各轴体素半径, 以椭球结构元膨胀, 并标记原始区域与新增环带.
//!
//! 实现位于 `ct-knee/src/expand.rs`.
//!
//! ### 随机轮廓变体 ✅
//!
//! 在符号距离场上以随机半径取阈值.
//!
//! 实现位于 `ct-knee/src/randomize.rs`.

/// 三维索引, 按 `(z, h, w)` 顺序.
pub type Idx3d = (usize, usize, usize);

/// 二值掩膜. 形状与对应 CT 扫描一致, 按 `(z, h, w)` 组织.
pub type Mask = ndarray::Array3<bool>;

mod data;

pub use data::{Affine, BoneMask, CtScan, NiftiHeaderAttr, ScanSummary, Spacing};

pub mod consts;

mod error;

pub use error::{Error, Result};

pub mod dataset;
pub mod expand;
pub mod morph;
pub mod prelude;
pub mod randomize;
pub mod segment;
pub mod threshold;
