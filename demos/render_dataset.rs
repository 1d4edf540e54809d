use std::path::PathBuf;

use mask_overlay_utils::{DEFAULT_NUM_COLS, DatasetLayout, load_dataset, plot_masks_and_scores};

/// Renders one overlay grid per sample of a dataset directory.
///
/// Usage: `cargo run --example render_dataset -- <dataset_dir> [output_dir]`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args_os().skip(1);
    let Some(base_dir) = args.next().map(PathBuf::from) else {
        eprintln!("usage: render_dataset <dataset_dir> [output_dir]");
        std::process::exit(2);
    };
    let out_dir = args.next().map_or_else(|| base_dir.join("overlays"), PathBuf::from);

    // 1. Load images, masks and scores
    println!("Loading dataset from {}...", base_dir.display());
    let dataset = load_dataset(&base_dir, &DatasetLayout::default())?;
    println!("Loaded {} samples", dataset.len());

    // 2. Render and save one grid per sample
    std::fs::create_dir_all(&out_dir)?;
    for sample in dataset.samples() {
        // scores.json holds one score per sample, the renderer wants one per mask.
        let scores = vec![sample.score; sample.masks.len()];
        let figure = plot_masks_and_scores(
            sample.image,
            sample.masks,
            Some(scores.as_slice()),
            DEFAULT_NUM_COLS,
        )?;

        let path = out_dir.join(format!("{}.png", sample.key));
        figure.save(&path)?;
        println!(
            "Saved {} ({}x{} grid, {} masks)",
            path.display(),
            figure.rows(),
            figure.cols(),
            sample.masks.len()
        );
    }

    Ok(())
}
