//! 股骨/胫骨分割.
//!
//! 输入: `$KNEE_INPUT`, 默认为 `$HOME/dataset/knee/input/3702_left_knee.nii`.
//! 输出: `$KNEE_OUTPUT_DIR`, 默认为 `$HOME/dataset/knee/output`.

use stages::{runner, OutputLayout};
use utils::loader;

fn main() -> ct_knee::Result<()> {
    utils::init_logger();
    let input = loader::input_path_from_env_or_home()?;
    let layout = OutputLayout::new(loader::output_dir_from_env_or_home()?);

    utils::sep();
    log::info!("segmenting {}", input.display());
    let seg = runner::segment_file(&input, &layout)?;
    log::info!(
        "threshold {:.1} HU ({:?}), kept {} of {} components",
        seg.threshold.hu,
        seg.threshold.source,
        seg.largest_size,
        seg.num_labels
    );
    utils::sep();
    Ok(())
}
