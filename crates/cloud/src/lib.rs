//! # Irrimetrics Cloud
//!
//! Imagery backends: where regions and scenes come from and where
//! composites go.
//!
//! - [`ImageryBackend`]: the async request/response interface
//! - [`Retrying`]: timeout plus exponential-backoff decorator
//! - [`MemoryBackend`]: fixtures held in memory, exports recorded
//! - [`LocalDirectoryBackend`]: GeoTIFF scenes listed in `catalog.json`
//! - [`StacBackend`]: STAC Item Search with HTTP GeoTIFF downloads

pub mod backend;
pub mod error;
pub mod export;
pub mod http;
pub mod local;
pub mod memory;
pub mod retry;
pub mod stac;
pub mod stac_client;
pub mod stac_models;

pub use backend::{
    CollectionQuery, ExportDestination, ExportHandle, ExportRequest, ExportState, FileFormat,
    ImageStack, ImageryBackend, RegionQuery, Retrying, Scene,
};
pub use error::{CloudError, Result};
pub use export::{ExportManifest, LocalExporter};
pub use irrimetrics_algorithms::Reducer;
pub use local::{Catalog, CatalogScene, LocalDirectoryBackend};
pub use memory::{MemoryBackend, RecordedExport};
pub use retry::RetryPolicy;
pub use stac::{StacBackend, StacBackendConfig};
pub use stac_client::{StacCatalog, StacClient};
pub use stac_models::{StacItem, StacItemCollection, StacSearchParams};
