//! 按物理距离扩张分割结果. 需要先运行 `segment`.

use stages::{runner, OutputLayout};
use utils::loader;

fn main() -> ct_knee::Result<()> {
    utils::init_logger();
    let layout = OutputLayout::new(loader::output_dir_from_env_or_home()?);

    utils::sep();
    log::info!("expanding masks under {}", layout.dir().display());
    runner::expand(&layout)?;
    utils::sep();
    Ok(())
}
