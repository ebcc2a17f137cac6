use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ConfigArgs;
use crate::config::{load_config, render_config};

pub fn run(args: ConfigArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let rendered = render_config(&config)?;

    info!(
        source = %args
            .config
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string()),
        "effective configuration"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    output
        .write_all(rendered.as_bytes())
        .context("failed to write configuration")?;
    output.flush()?;
    Ok(())
}
