//! 通用常量.

/// 标签体素值.
pub mod label {
    /// 背景.
    pub const BACKGROUND: u8 = 0;

    /// 组合标签中的股骨.
    pub const FEMUR: u8 = 1;

    /// 组合标签中的胫骨.
    pub const TIBIA: u8 = 2;

    /// 二值掩膜的前景.
    pub const FOREGROUND: u8 = 1;

    /// 扩张标签中的原始区域.
    pub const ORIGINAL: u8 = 1;

    /// 扩张标签中由扩张新增的环带.
    pub const RING: u8 = 2;

    /// 变体对比标签中只属于随机扩张的区域.
    pub const RANDOM_ONLY: u8 = 2;

    /// 变体对比标签中只属于固定扩张的区域.
    pub const FIXED_ONLY: u8 = 3;

    /// 体素是否是前景 (任意非零标签)?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        p != BACKGROUND
    }
}

/// HU 相关常量.
pub mod hu {
    /// 空气的 HU 值, 同时作为直方图下限.
    pub const AIR: f32 = -1000.0;

    /// 直方图上限. 致密骨与金属伪影以上的值都被截断到这里.
    pub const CLIP_MAX: f32 = 3000.0;

    /// 直方图柱数.
    pub const HISTOGRAM_BINS: usize = 1000;

    /// 自动估计失败时使用的骨阈值.
    pub const DEFAULT_BONE: f32 = 150.0;
}

/// 默认的股骨/胫骨切分比例.
pub const DEFAULT_CUT_FRAC: f64 = 0.5;

/// 清理时保留连通域的最小体素数.
pub const DEFAULT_MIN_COMPONENT: usize = 1000;

/// 清理时闭运算的默认次数.
pub const DEFAULT_CLOSING_ITER: usize = 2;
