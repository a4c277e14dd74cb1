use std::cmp::Reverse;
use std::collections::VecDeque;

use ndarray::Array3;

use super::{shift, Structure};
use crate::Mask;

/// 连通域标记.
///
/// 返回标签数组和连通域个数 `n`. 背景为 0, 连通域按首个体素的行优先顺序依次编号为
/// `1..=n`.
pub fn label(mask: &Mask, structure: Structure) -> (Array3<u32>, usize) {
    let dim = mask.dim();
    let neighbours = structure.neighbours();
    let mut labels = Array3::<u32>::zeros(dim);
    let mut queue = VecDeque::with_capacity(1024);
    let mut n = 0u32;

    for (pos, &p) in mask.indexed_iter() {
        if !p || labels[pos] != 0 {
            continue;
        }
        n += 1;
        labels[pos] = n;
        queue.push_back(pos);

        while let Some(cur) = queue.pop_front() {
            for &d in neighbours.iter() {
                let Some(next) = shift(cur, d, dim) else {
                    continue;
                };
                if mask[next] && labels[next] == 0 {
                    labels[next] = n;
                    queue.push_back(next);
                }
            }
        }
    }
    (labels, n as usize)
}

/// 统计每个标签的体素个数. 返回值长度为 `n + 1`, 第 0 项 (背景) 恒为 0.
pub fn component_sizes(labels: &Array3<u32>, n: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; n + 1];
    for &l in labels.iter().filter(|l| **l != 0) {
        sizes[l as usize] += 1;
    }
    sizes
}

/// 根据 [`component_sizes`] 的结果找出最大连通域的标签及其体素个数.
/// 若有多个同样大小的连通域, 取编号最小者. 没有连通域时返回 `None`.
pub fn largest_label(sizes: &[usize]) -> Option<(u32, usize)> {
    let (best, &size) = sizes
        .iter()
        .enumerate()
        .skip(1)
        .max_by_key(|&(i, s)| (*s, Reverse(i)))?;
    Some((best as u32, size))
}

/// 提取最大连通域及其体素个数. 若有多个同样大小的连通域, 取编号最小者.
///
/// 如果 `mask` 不存在前景, 则返回 `None`.
pub fn largest_component(mask: &Mask, structure: Structure) -> Option<(Mask, usize)> {
    let (labels, n) = label(mask, structure);
    let (best, size) = largest_label(&component_sizes(&labels, n))?;
    log::debug!("largest component #{best} of {n}, size {size}");
    Some((labels.mapv(|l| l == best), size))
}

/// 去除体素个数小于 `min_size` 的连通域.
pub fn remove_small_components(mask: &Mask, min_size: usize, structure: Structure) -> Mask {
    let (labels, n) = label(mask, structure);
    let sizes = component_sizes(&labels, n);
    let removed = sizes.iter().skip(1).filter(|s| **s < min_size).count();
    log::debug!("removing {removed} of {n} components smaller than {min_size}");
    labels.mapv(|l| l != 0 && sizes[l as usize] >= min_size)
}
