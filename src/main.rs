use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use skeinpath::{default_config_path, init_logging, process_text, Config, BUILD_DATE, VERSION};

/// Config from the first argument, else the default path when it exists,
/// else built-in defaults
fn load_config() -> anyhow::Result<Config> {
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        return Config::load_from_file(&path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    match default_config_path() {
        Ok(path) if path.exists() => Config::load_from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        _ => Ok(Config::default()),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging()?;
    tracing::debug!("skeinpath {} built {}", VERSION, BUILD_DATE);

    let config = load_config()?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("reading toolpath from stdin")?;

    let processed = process_text(&input, &config);
    for stage in &processed.report.stages {
        if stage.skipped {
            tracing::info!("Stage '{}' skipped, marker already present", stage.stage);
        }
    }

    std::io::stdout()
        .lock()
        .write_all(processed.text.as_bytes())
        .context("writing toolpath to stdout")?;
    Ok(())
}
