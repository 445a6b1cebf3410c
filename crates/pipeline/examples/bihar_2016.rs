//! Build the Bihar 2016 composite from a local catalog directory.
//!
//! ```text
//! cargo run -p irrimetrics-pipeline --example bihar_2016 -- <catalog-dir> [config.json]
//! ```
//!
//! Set `IRRIMETRICS_STAC=<stac.json>` to read scenes from a STAC catalog
//! instead; the catalog directory then only receives the export. The file
//! holds a `StacBackendConfig`: Landsat 8 is mapped by default, while the
//! region dataset and the rainfall and nightlight collections must be
//! mapped there, e.g.
//!
//! ```text
//! {"regions": {"users/bl/Ind_admin_shapefiles/ind_states": "data/ind_states.geojson"},
//!  "collections": {"LANDSAT/LC8_L1T_TOA": "landsat-c2-l2", "NASA/GPM_L3/IMERG_V04": "..."}}
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use irrimetrics_cloud::{ExportDestination, ImageryBackend, LocalDirectoryBackend, StacBackend, StacBackendConfig};
use irrimetrics_pipeline::{Pipeline, PipelineConfig};

async fn run<B: ImageryBackend>(config: PipelineConfig, backend: B) -> Result<()> {
    let start = Instant::now();
    let pipeline = Pipeline::new(config, backend)?;
    let output = pipeline.run().await?;

    info!(
        region = output.region.name(),
        bands = output.composite.len(),
        export = %output.export.id,
        elapsed = ?start.elapsed(),
        "done"
    );
    if let Some(path) = &output.export.location {
        println!("{}", path.display());
    }
    println!("{}", output.composite.band_names().join(","));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).context("installing log subscriber")?;

    let mut args = std::env::args().skip(1);
    let Some(root) = args.next().map(PathBuf::from) else {
        bail!("usage: bihar_2016 <catalog-dir> [config.json]");
    };
    let mut config = match args.next() {
        Some(path) => PipelineConfig::from_path(&path).with_context(|| format!("reading {path}"))?,
        None => PipelineConfig::default(),
    };

    if let Some(path) = std::env::var_os("IRRIMETRICS_STAC") {
        let path = PathBuf::from(path);
        let mut stac = StacBackendConfig::from_path(&path)
            .with_context(|| format!("reading STAC settings from {}", path.display()))?;
        if config.region.point.is_none() {
            stac.region_source(&config.region.dataset)
                .with_context(|| format!("{} maps no region source", path.display()))?;
        }
        stac.export_dir = root.join("exports");
        stac.retry = config.retry;
        config.export.destination = ExportDestination::Directory(root.join("exports"));
        run(config, StacBackend::new(stac)?).await
    } else {
        let backend = LocalDirectoryBackend::open(&root)
            .with_context(|| format!("opening catalog in {}", root.display()))?;
        run(config, backend).await
    }
}
