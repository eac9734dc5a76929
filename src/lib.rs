pub use cache::Cache;
pub use config::Config;
pub use coordinate::{to_decimal, Coordinates, Dms, Hemisphere};
pub use error::{ConfigError, Error, FilesystemError, GeocodeError, MetadataError, Result};
pub use geocode::{GeocodeResult, GeocodeService, GoogleGeocoder, PlaceNameResolver};
pub use organize::{
    AuditSink, FileStore, JsonAuditSink, LocalFileStore, NameFilter, OrganizeReport, Organizer,
};
pub use photo_metadata::{ExifMetadataSource, MetadataSource, PhotoMetadata, PhotoRecord, RawGps};
pub use segment::{OrganizationPlan, Visit, VisitSegmenter};

pub mod cache;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod geocode;
pub mod organize;
pub mod photo_metadata;
pub mod segment;

/// Geocoder for `config`, with its response cache when one is configured.
pub fn geocoder(config: &Config) -> Result<GoogleGeocoder> {
    let api_key = config.api_key()?;
    let cache = config.cache_dir().and_then(|dir| match Cache::new(&dir) {
        Ok(cache) => Some(cache),
        Err(e) => {
            tracing::warn!("Geocode cache disabled, {}: {}", dir.display(), e);
            None
        }
    });
    Ok(GoogleGeocoder::new(api_key, &config.geocode_endpoint, cache))
}

fn with_organizer<T>(
    config: &Config,
    f: impl FnOnce(&Organizer<GoogleGeocoder>) -> Result<T>,
) -> Result<T> {
    let resolver = PlaceNameResolver::new(geocoder(config)?);
    let audit = JsonAuditSink::new(&config.data_file);
    let organizer = Organizer::new(
        &config.image_folder(),
        config.name_filter(),
        config.time_threshold(),
        &ExifMetadataSource,
        &resolver,
        &LocalFileStore,
        &audit,
    );
    f(&organizer)
}

/// Groups the photos under `config.image_folder` without touching them.
pub fn plan(config: &Config) -> Result<OrganizationPlan> {
    with_organizer(config, |organizer| Ok(organizer.plan()?.1))
}

/// Groups the photos, stores the metadata dump and moves every photo into
/// the folder of its place.
pub fn run(config: &Config) -> Result<OrganizeReport> {
    with_organizer(config, |organizer| organizer.run())
}
