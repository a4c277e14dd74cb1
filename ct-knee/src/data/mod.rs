use std::fmt;
use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayD, ArrayView3, ArrayViewMut3, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::label::{is_foreground, FOREGROUND};
use crate::{Error, Idx3d, Mask, Result};

mod affine;

pub use affine::Affine;

/// 体素分辨率, 以毫米为单位, 按 `(z, h, w)` 顺序.
pub type Spacing = [f64; 3];

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 读取 nifti 文件, 返回 header 和 `(z, H, W)` 组织的数据.
///
/// `convert` 负责把体数据转换成目标元素类型的 `ndarray`.
fn read_volume<T, F>(path: &Path, convert: F) -> Result<(BoxedHeader, Array3<T>)>
where
    T: Clone,
    F: FnOnce(nifti::InMemNiftiVolume) -> nifti::Result<ArrayD<T>>,
{
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());
    let data = convert(obj.into_volume())?;

    // 允许 [W, H, z, 1] 形式的 4D 文件.
    let shape = data.shape().to_vec();
    let data = match shape.as_slice() {
        [_, _, _] => data,
        [_, _, _, 1] => data.index_axis_move(Axis(3), 0),
        other => return Err(Error::UnsupportedDim(other.to_vec())),
    };
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| Error::UnsupportedDim(shape.clone()))?;

    // [W, H, z] -> [z, H, W]
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = data.permuted_axes([2, 1, 0]);
    let data = if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().to_owned()
    };
    debug_assert!(data.is_standard_layout());
    Ok((header, data))
}

/// 按照体素分辨率和形状构造一个最小可用的 header.
fn fake_header((z, h, w): Idx3d, [sz, sh, sw]: Spacing) -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
    let [_, pw, ph, pz, ..] = &mut header.pixdim;
    (*pw, *ph, *pz) = (sw as f32, sh as f32, sz as f32);
    header.intent_name[..4].copy_from_slice(b"fake");
    header
}

/// 3D CT nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取水平切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    ///
    /// 某些文件的 pixdim 带有符号, 这里总是返回绝对值.
    #[inline]
    fn spacing(&self) -> Spacing {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z.abs() as f64, h.abs() as f64, w.abs() as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.spacing().iter().product()
    }

    /// 体素分辨率在三个维度上是否是各向同的?
    #[inline]
    fn is_isotropic(&self) -> bool {
        let [z, h, w] = self.spacing();
        z == h && z == w
    }

    /// 获取体素坐标到物理坐标 (毫米) 的仿射变换.
    #[inline]
    fn affine(&self) -> Affine {
        Affine::from_header(self.header())
    }

    /// 判断该结构是否是由 `fake` 方法手动拼接的.
    fn is_faked(&self) -> bool {
        self.header().intent_name.starts_with(b"fake")
    }
}

/// nii 格式 3D CT 扫描, 包括 header 和 CT 扫描 (HU). HU 值以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct CtScan {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl NiftiHeaderAttr for CtScan {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for CtScan {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for CtScan {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl CtScan {
    /// 打开 nii (或 nii.gz) 文件格式的 3D CT 扫描. `path` 为文件的本地路径.
    ///
    /// header 中的线性缩放 (`scl_slope`, `scl_inter`) 会在读取时应用, 因此数据即为 HU 值.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (header, data) = read_volume(path.as_ref(), |v| v.into_ndarray::<f32>())?;
        Ok(Self { header, data })
    }

    /// 根据裸 HU 数据和体素分辨率直接创建 `CtScan`.
    ///
    /// `data` 按照 `(z, h, w)` 组织, `spacing` 也按照 `(z, h, w)` 给出.
    /// 该方法创建的 header 只包含形状和分辨率, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<f32>, spacing: Spacing) -> Self {
        let (z, h, w) = data.dim();
        Self {
            header: fake_header((z, h, w), spacing),
            data,
        }
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut3<'_, f32> {
        self.data.view_mut()
    }

    /// 获取所有有限 (非 NaN, 非 inf) 的 HU 值.
    #[inline]
    pub fn finite_hu(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().copied().filter(|v| v.is_finite())
    }

    /// 大于等于 `threshold` 的体素构成的二值掩膜.
    #[inline]
    pub fn threshold(&self, threshold: f32) -> Mask {
        self.data.mapv(|hu| hu >= threshold)
    }

    /// 获取扫描的基本信息.
    pub fn summary(&self) -> ScanSummary {
        let (min_hu, max_hu) = self
            .finite_hu()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        ScanSummary {
            shape: self.shape(),
            spacing: self.spacing(),
            affine: self.affine(),
            min_hu,
            max_hu,
        }
    }
}

/// CT 扫描的基本信息. 若扫描中没有有限值, 则 `min_hu` 为 `+inf`, `max_hu` 为 `-inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    /// 形状 `(z, h, w)`.
    pub shape: Idx3d,

    /// 体素分辨率 (毫米), `(z, h, w)`.
    pub spacing: Spacing,

    /// 体素到物理坐标的仿射变换.
    pub affine: Affine,

    /// 最小 HU 值.
    pub min_hu: f32,

    /// 最大 HU 值.
    pub max_hu: f32,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (z, h, w) = self.shape;
        let [sz, sh, sw] = self.spacing;
        writeln!(f, "shape (z, h, w): ({z}, {h}, {w})")?;
        writeln!(f, "spacing (mm): ({sz:.4}, {sh:.4}, {sw:.4})")?;
        writeln!(f, "HU range: [{:.1}, {:.1}]", self.min_hu, self.max_hu)?;
        write!(f, "affine:\n{}", self.affine)
    }
}

/// nii 格式 3D 标签/掩膜, 包括 header 和标签值. 标签值以 `u8` 保存.
///
/// 二值掩膜中前景为 [`FOREGROUND`]; 组合标签中股骨、胫骨分别为
/// [`crate::consts::label::FEMUR`] 和 [`crate::consts::label::TIBIA`].
#[derive(Debug, Clone)]
pub struct BoneMask {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for BoneMask {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for BoneMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for BoneMask {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl BoneMask {
    /// 打开 nii (或 nii.gz) 文件格式的 3D 标签. 如果打开成功,
    /// 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (header, data) = read_volume(path.as_ref(), |v| v.into_ndarray::<u8>())?;
        Ok(Self { header, data })
    }

    /// 根据裸标签数据和体素分辨率直接创建 `BoneMask`.
    ///
    /// `data` 与 `spacing` 都按照 `(z, h, w)` 组织.
    /// 该方法创建的 header 只包含形状和分辨率, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<u8>, spacing: Spacing) -> Self {
        let (z, h, w) = data.dim();
        Self {
            header: fake_header((z, h, w), spacing),
            data,
        }
    }

    /// 以 `header` 为几何参考, 由标签数据创建 `BoneMask`.
    ///
    /// 显示范围 (`cal_min`, `cal_max`) 会被清零. 强度缩放无需处理:
    /// 保存时 `nifti` 总是写出 `scl_slope = 1`, `scl_inter = 0`.
    /// 若 `data` 形状与 `header` 不符则返回 `Err`.
    pub fn from_labels(header: &NiftiHeader, data: Array3<u8>) -> Result<Self> {
        let expected = get_shape_from_header(header);
        if data.dim() != expected {
            return Err(Error::ShapeMismatch(expected, data.dim()));
        }
        let mut header = Box::new(header.clone());
        header.cal_min = 0.0;
        header.cal_max = 0.0;
        Ok(Self { header, data })
    }

    /// 以 `header` 为几何参考, 把二值掩膜 `mask` 的前景写为 `label`.
    #[inline]
    pub fn from_mask(header: &NiftiHeader, mask: &Mask, label: u8) -> Result<Self> {
        Self::from_labels(header, mask.mapv(|p| if p { label } else { 0 }))
    }

    /// 以 `header` 为几何参考, 把二值掩膜 `mask` 的前景写为 [`FOREGROUND`].
    #[inline]
    pub fn from_binary(header: &NiftiHeader, mask: &Mask) -> Result<Self> {
        Self::from_mask(header, mask, FOREGROUND)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        self.data.view_mut()
    }

    /// 消费自我, 获得底层数据.
    #[inline]
    pub fn into_data(self) -> Array3<u8> {
        self.data
    }

    /// 所有非零体素构成的二值掩膜.
    #[inline]
    pub fn to_mask(&self) -> Mask {
        self.data.mapv(is_foreground)
    }

    /// 值为 `label` 的体素构成的二值掩膜.
    #[inline]
    pub fn to_mask_of(&self, label: u8) -> Mask {
        self.data.mapv(|p| p == label)
    }

    /// 获取 3D 标签中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 将标签保存到 `path`. 以 `.gz` 结尾的路径会被压缩.
    ///
    /// 体素以 `u8` 写出, 几何信息 (pixdim, qform, sform) 沿用 header.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        // [z, H, W] -> [W, H, z]
        let data = self.data.view().permuted_axes([2, 1, 0]);
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BoneMask, CtScan, NiftiHeaderAttr};
    use crate::consts::label::*;
    use crate::Error;
    use ndarray::{Array2, Array3, Array4};
    use nifti::writer::WriterOptions;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("ct-knee-{}-{name}", std::process::id()));
        p
    }

    #[test]
    fn test_fake_header_attr() {
        let scan = CtScan::fake(Array3::zeros((4, 5, 6)), [2.5, 0.5, 0.75]);
        assert_eq!(scan.shape(), (4, 5, 6));
        assert_eq!(scan.size(), 120);
        assert_eq!(scan.spacing(), [2.5, 0.5, 0.75]);
        assert!(!scan.is_isotropic());
        assert!(scan.is_faked());
        assert!(scan.check(&(3, 4, 5)));
        assert!(!scan.check(&(4, 0, 0)));
    }

    #[test]
    fn test_summary() {
        let mut data = Array3::from_elem((2, 2, 2), 10.0f32);
        data[(0, 0, 0)] = -900.0;
        data[(1, 1, 1)] = f32::NAN;
        data[(1, 0, 1)] = 1200.0;
        let s = CtScan::fake(data, [1.0; 3]).summary();
        assert_eq!(s.min_hu, -900.0);
        assert_eq!(s.max_hu, 1200.0);
        assert_eq!(s.shape, (2, 2, 2));
    }

    #[test]
    fn test_from_labels_shape_mismatch() {
        let reference = BoneMask::fake(Array3::zeros((3, 3, 3)), [1.0; 3]);
        assert!(BoneMask::from_labels(reference.header(), Array3::zeros((3, 3, 2))).is_err());
        assert!(BoneMask::from_labels(reference.header(), Array3::zeros((3, 3, 3))).is_ok());
    }

    #[test]
    fn test_save_and_open_gz() {
        let mut data = Array3::<u8>::zeros((3, 4, 5));
        data[(0, 1, 2)] = FEMUR;
        data[(2, 3, 4)] = TIBIA;
        data[(1, 0, 0)] = TIBIA;
        let mask = BoneMask::fake(data.clone(), [3.0, 0.5, 0.5]);

        let path = temp_path("labels.nii.gz");
        mask.save(&path).unwrap();
        let back = BoneMask::open(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(back.shape(), (3, 4, 5));
        assert_eq!(back.data(), data.view());
        assert_eq!(back.count(TIBIA), 2);
        assert_eq!(back.spacing(), [3.0, 0.5, 0.5]);
    }

    /// `[W, H, z, 1]` 形式的 4D 文件按 3D 读取, 并转换为 `(z, h, w)`.
    #[test]
    fn test_open_trailing_singleton_4d() {
        let reference = CtScan::fake(Array3::zeros((3, 4, 5)), [2.0, 0.5, 0.75]);
        let raw = Array4::from_shape_fn((5, 4, 3, 1), |(w, h, z, _)| {
            (100 * z + 10 * h + w) as f32 - 1000.0
        });
        let path = temp_path("scan4d.nii");
        WriterOptions::new(&path)
            .reference_header(reference.header())
            .write_nifti(&raw)
            .unwrap();
        let scan = CtScan::open(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(scan.shape(), (3, 4, 5));
        assert_eq!(scan.spacing(), [2.0, 0.5, 0.75]);
        assert_eq!(scan[(2, 1, 4)], 214.0 - 1000.0);
        assert_eq!(scan[(0, 3, 0)], 30.0 - 1000.0);
        assert!(scan.data().is_standard_layout());
    }

    #[test]
    fn test_open_unsupported_dim() {
        let path = temp_path("true4d.nii");
        WriterOptions::new(&path)
            .write_nifti(&Array4::<f32>::zeros((5, 4, 3, 2)))
            .unwrap();
        let err = CtScan::open(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, Err(Error::UnsupportedDim(d)) if d == vec![5, 4, 3, 2]));

        let path = temp_path("slice2d.nii");
        WriterOptions::new(&path)
            .write_nifti(&Array2::<f32>::zeros((5, 4)))
            .unwrap();
        let err = CtScan::open(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, Err(Error::UnsupportedDim(d)) if d == vec![5, 4]));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(CtScan::open(temp_path("missing.nii.gz")).is_err());
    }

    /// 参考 header 带有 HU 偏移时, 保存的标签依然是原值.
    #[test]
    fn test_labels_ignore_reference_scaling() {
        let mut reference = BoneMask::fake(Array3::zeros((2, 3, 4)), [1.0; 3]).header().clone();
        reference.scl_slope = 1.0;
        reference.scl_inter = -1024.0;
        reference.cal_max = 3071.0;

        let mut data = Array3::<u8>::zeros((2, 3, 4));
        data[(1, 2, 3)] = TIBIA;
        let mask = BoneMask::from_labels(&reference, data.clone()).unwrap();
        assert_eq!(mask.header().cal_max, 0.0);

        let path = temp_path("scaled.nii");
        mask.save(&path).unwrap();
        let back = BoneMask::open(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.header().scl_slope, 1.0);
        assert_eq!(back.header().scl_inter, 0.0);
        assert_eq!(back.data(), data.view());
    }
}
