//! Turning resolved JSON into a [`TileSource`].

use dz_core::{
    IiifInfoSource, IiifSize, IiifTile, ImageSize, LegacyPyramidSource, PyramidLevel,
    ResolutionError, TileSource,
};
use serde_json::Value;
use tracing::debug;

use crate::ResolveOptions;

/// Build a descriptor from an IIIF info document or a legacy pyramid array.
pub fn tile_source_from_json(
    value: &Value,
    options: &ResolveOptions,
) -> Result<TileSource, ResolutionError> {
    match value {
        Value::Array(levels) => legacy_pyramid_from_levels(levels),
        Value::Object(_) => tile_source_from_info(value, options),
        other => Err(invalid(format!(
            "expected an info object or a level array, found {other}"
        ))),
    }
}

/// True for an array consumed as-is as a legacy pyramid.
#[must_use]
pub fn is_legacy_level_array(value: &Value) -> bool {
    value.as_array().is_some_and(|entries| {
        !entries.is_empty()
            && entries
                .iter()
                .all(|entry| entry.get("url").is_some_and(Value::is_string))
    })
}

fn tile_source_from_info(
    info: &Value,
    options: &ResolveOptions,
) -> Result<TileSource, ResolutionError> {
    let size = ImageSize::checked(dimension(info, "width")?, dimension(info, "height")?)
        .map_err(|err| invalid(err.to_string()))?;
    let id = info
        .get("@id")
        .or_else(|| info.get("id"))
        .and_then(Value::as_str)
        .map(|id| id.trim_end_matches('/').to_string())
        .ok_or_else(|| invalid("missing '@id' or 'id'"))?;

    let tiles = match &options.tiles_override {
        Some(tiles) => tiles.clone(),
        None => parse_array::<IiifTile>(info, "tiles")?,
    };
    let sizes = match &options.sizes_override {
        Some(sizes) => sizes.clone(),
        None => parse_array::<IiifSize>(info, "sizes")?,
    };

    if !tiles.is_empty() {
        debug!("IIIF info {id}: {} tile specs", tiles.len());
        return Ok(TileSource::IiifInfo(IiifInfoSource {
            id,
            size,
            tiles,
            sizes,
        }));
    }

    // Every level carries the full image size; only the URL names the tier.
    let ext = extension_for_mime(&options.mime_type);
    let levels: Vec<PyramidLevel> = if sizes.is_empty() {
        vec![pyramid_level(&id, size.width, size, ext)]
    } else {
        sizes
            .iter()
            .map(|tier| pyramid_level(&id, tier.width, size, ext))
            .collect()
    };
    debug!("IIIF info {id}: no tiles, synthesized {} levels", levels.len());
    Ok(TileSource::LegacyPyramid(LegacyPyramidSource { size, levels }))
}

fn pyramid_level(id: &str, tier_width: u32, full: ImageSize, ext: &str) -> PyramidLevel {
    PyramidLevel {
        url: format!("{id}/full/{tier_width},/0/default.{ext}"),
        width: full.width,
        height: full.height,
    }
}

fn legacy_pyramid_from_levels(entries: &[Value]) -> Result<TileSource, ResolutionError> {
    let mut levels = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let url = entry
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(format!("level {index} has no url")))?;
        levels.push(PyramidLevel {
            url: url.to_string(),
            width: dimension(entry, "width")?,
            height: dimension(entry, "height")?,
        });
    }
    let largest = levels
        .iter()
        .max_by_key(|level| level.width)
        .ok_or_else(|| invalid("legacy pyramid has no levels"))?;
    let size = ImageSize::checked(largest.width, largest.height)
        .map_err(|err| invalid(err.to_string()))?;
    Ok(TileSource::LegacyPyramid(LegacyPyramidSource { size, levels }))
}

/// File extension for a MIME type, normalizing `jpeg` and `tiff`.
#[must_use]
pub fn extension_for_mime(mime_type: &str) -> &str {
    let subtype = mime_type
        .split(';')
        .next()
        .unwrap_or(mime_type)
        .rsplit('/')
        .next()
        .unwrap_or(mime_type)
        .trim();
    match subtype {
        "jpeg" => "jpg",
        "tiff" => "tif",
        other => other,
    }
}

fn dimension(value: &Value, field: &str) -> Result<u32, ResolutionError> {
    value
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|number| u32::try_from(number).ok())
        .ok_or_else(|| invalid(format!("'{field}' must be a non-negative integer")))
}

fn parse_array<T: serde::de::DeserializeOwned>(
    info: &Value,
    field: &str,
) -> Result<Vec<T>, ResolutionError> {
    match info.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|err| invalid(format!("malformed '{field}': {err}"))),
    }
}

fn invalid(message: impl Into<String>) -> ResolutionError {
    ResolutionError::InvalidInfo {
        message: message.into(),
    }
}
