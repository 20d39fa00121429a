//! Prepare-night command: turn a night-lights mosaic into a background the
//! preprocessor can composite behind the disk.

use anyhow::{Context, Result};
use std::path::Path;

use crate::common::constants::EXIT_SUCCESS;
use crate::common::utils::private_path;
use crate::config;
use crate::imaging::prepare_night_background;

/// Handle `earthpaper prepare-night`.
///
/// `size` defaults to the configured canonical size.
pub fn handle_prepare_night_command(input: &str, output: &str, size: Option<u32>) -> Result<i32> {
    let size = match size {
        Some(size) => size,
        None => config::load()?.canonical_size(),
    };
    let input = Path::new(input);
    let output = Path::new(output);

    log_block_start!("Preparing night background from {}", private_path(input));
    prepare_file(input, output, size)?;
    log_decorated!("Wrote {size}x{size} background to {}", private_path(output));
    log_end!();
    Ok(EXIT_SUCCESS)
}

fn prepare_file(input: &Path, output: &Path, size: u32) -> Result<()> {
    anyhow::ensure!(size > 0, "size must be positive");
    let source = image::open(input)
        .with_context(|| format!("Failed to open {}", private_path(input)))?
        .to_rgba8();
    prepare_night_background(&source, size)
        .save(output)
        .with_context(|| format!("Failed to write {}", private_path(output)))
}
