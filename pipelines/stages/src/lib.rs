//! 膝关节骨骼处理流水线: 分割 -> 扩张 -> 随机变体.
//!
//! 每个阶段都从输出目录读取上一阶段的结果, 对应 `src/bin` 下的同名程序.

pub mod layout;
pub mod runner;

pub use layout::OutputLayout;
