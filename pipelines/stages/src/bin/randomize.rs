//! 胫骨随机轮廓变体. 需要先运行 `segment`.
//!
//! 设置 `$KNEE_SEED` 可得到可复现的结果.

use rand::rngs::StdRng;
use rand::SeedableRng;
use stages::{runner, OutputLayout};
use utils::loader;

fn main() -> ct_knee::Result<()> {
    utils::init_logger();
    let layout = OutputLayout::new(loader::output_dir_from_env_or_home()?);
    let mut rng = match loader::seed_from_env()? {
        Some(seed) => {
            log::info!("random seed: {seed}");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    utils::sep();
    let radii = runner::randomize(&layout, &mut rng)?;
    for (i, r) in radii.iter().enumerate() {
        log::info!("variant #{}: r = {r:.2} mm", i + 1);
    }
    utils::sep();
    Ok(())
}
