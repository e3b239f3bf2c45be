#![forbid(unsafe_code)]

//! Tile-source resolution.
//!
//! A reference is classified first and resolved second:
//! 1. JSON values are taken as already resolved
//! 2. `http://`, `https://` and `file:/` strings are URIs; only `.json`
//!    URIs are fetched
//! 3. any other string must parse as JSON
//!
//! The resolved JSON then becomes an IIIF source when it declares tiles, and a
//! synthesized legacy pyramid otherwise. Direct image URIs fall back to a
//! single-image source.

mod fetch;
mod info;

use std::time::Duration;

use dz_core::{IiifSize, IiifTile, ResolutionError, SingleImageSource, TileSource, ViewerConfig};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub use fetch::{JsonFetcher, MemoryFetcher, StdFetcher};
pub use info::{extension_for_mime, is_legacy_level_array, tile_source_from_json};

const URI_PREFIXES: [&str; 3] = ["http://", "https://", "file:/"];

/// A tile-source reference as handed to the viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum TileSourceReference {
    /// Already-parsed JSON.
    Json(Value),
    /// A URI or a JSON string.
    Text(String),
}

impl From<Value> for TileSourceReference {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Json(other),
        }
    }
}

impl From<&str> for TileSourceReference {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TileSourceReference {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl TileSourceReference {
    /// Short form used in logs and error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => {
                let mut text = value.to_string();
                if text.len() > 80 {
                    let mut cut = 77;
                    while !text.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    text.truncate(cut);
                    text.push_str("...");
                }
                text
            }
        }
    }
}

/// How a reference will be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReferenceKind {
    /// JSON value, used without fetching.
    ResolvedJson,
    /// URI whose path ends in `.json`; fetched.
    JsonUri,
    /// Any other URI; resolves to a single image.
    ImageUri,
    /// String that parses as JSON.
    JsonText,
    /// Neither a URI nor JSON.
    Unrecognized,
}

impl ReferenceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResolvedJson => "resolved JSON",
            Self::JsonUri => "JSON URI",
            Self::ImageUri => "image URI",
            Self::JsonText => "JSON text",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Classify a reference without fetching anything.
#[must_use]
pub fn classify(reference: &TileSourceReference) -> ReferenceKind {
    match reference {
        TileSourceReference::Json(_) => ReferenceKind::ResolvedJson,
        TileSourceReference::Text(text) => {
            let text = text.trim();
            if is_uri(text) {
                if is_json_uri(text) {
                    ReferenceKind::JsonUri
                } else {
                    ReferenceKind::ImageUri
                }
            } else if serde_json::from_str::<Value>(text).is_ok() {
                ReferenceKind::JsonText
            } else {
                ReferenceKind::Unrecognized
            }
        }
    }
}

#[must_use]
pub fn is_uri(text: &str) -> bool {
    URI_PREFIXES.iter().any(|prefix| text.starts_with(prefix))
}

/// True when the URI path, ignoring query, fragment and a trailing slash,
/// ends in `.json` (case-insensitive).
#[must_use]
pub fn is_json_uri(uri: &str) -> bool {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    path.trim_end_matches('/')
        .to_ascii_lowercase()
        .ends_with(".json")
}

/// Split a JSON list of references into its elements.
///
/// Legacy level arrays are a single reference, not a list.
#[must_use]
pub fn expand_references(value: Value) -> Vec<TileSourceReference> {
    if is_legacy_level_array(&value) {
        return vec![TileSourceReference::from(value)];
    }
    match value {
        Value::Array(entries) => entries.into_iter().map(TileSourceReference::from).collect(),
        other => vec![TileSourceReference::from(other)],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    pub mime_type: String,
    pub timeout: Duration,
    pub tiles_override: Option<Vec<IiifTile>>,
    pub sizes_override: Option<Vec<IiifSize>>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl ResolveOptions {
    #[must_use]
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            mime_type: config.mime_type.clone(),
            timeout: config.fetch_timeout(),
            tiles_override: config.iiif_tiles.clone(),
            sizes_override: config.iiif_sizes.clone(),
        }
    }
}

/// Resolves references through a [`JsonFetcher`].
///
/// Failed fetches are not retried.
#[derive(Debug, Clone)]
pub struct Resolver<F> {
    fetcher: F,
    options: ResolveOptions,
}

impl<F: JsonFetcher> Resolver<F> {
    #[must_use]
    pub const fn new(fetcher: F, options: ResolveOptions) -> Self {
        Self { fetcher, options }
    }

    #[must_use]
    pub const fn options(&self) -> &ResolveOptions {
        &self.options
    }

    #[must_use]
    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Turn a reference into JSON, fetching JSON URIs.
    pub fn resolve_json(&self, reference: &TileSourceReference) -> Result<Value, ResolutionError> {
        let kind = classify(reference);
        debug!("Classified {} as {}", reference.describe(), kind.as_str());
        match (kind, reference) {
            (_, TileSourceReference::Json(value)) => Ok(value.clone()),
            (ReferenceKind::JsonUri, TileSourceReference::Text(uri)) => {
                info!("Fetching image information from {}", uri.trim());
                self.fetcher.fetch_json(uri.trim(), self.options.timeout)
            }
            (ReferenceKind::ImageUri, TileSourceReference::Text(uri)) => {
                Err(ResolutionError::NotJsonUri {
                    uri: uri.trim().to_string(),
                })
            }
            (ReferenceKind::JsonText, TileSourceReference::Text(text)) => {
                serde_json::from_str(text.trim()).map_err(|_| ResolutionError::Unrecognized {
                    reference: text.clone(),
                })
            }
            (_, TileSourceReference::Text(text)) => Err(ResolutionError::Unrecognized {
                reference: text.clone(),
            }),
        }
    }

    /// Resolve one reference into a descriptor.
    pub fn resolve(&self, reference: &TileSourceReference) -> Result<TileSource, ResolutionError> {
        let resolved = self
            .resolve_json(reference)
            .and_then(|json| tile_source_from_json(&json, &self.options));
        match (resolved, reference) {
            (Ok(source), _) => Ok(source),
            (Err(err), TileSourceReference::Text(text))
                if classify(reference) == ReferenceKind::ImageUri =>
            {
                debug!("Falling back to single image for {}: {err}", text.trim());
                Ok(TileSource::SingleImage(SingleImageSource {
                    url: text.trim().to_string(),
                    size: None,
                }))
            }
            (Err(err), _) => {
                warn!("Failed to resolve {}: {err}", reference.describe());
                Err(err)
            }
        }
    }

    /// Resolve every reference, in order, before returning any of them.
    ///
    /// The first failure aborts the whole set.
    pub fn resolve_all(
        &self,
        references: &[TileSourceReference],
    ) -> Result<Vec<TileSource>, ResolutionError> {
        references
            .iter()
            .map(|reference| self.resolve(reference))
            .collect()
    }
}

impl Resolver<StdFetcher> {
    /// Resolver over [`StdFetcher`] configured from `config`.
    #[must_use]
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self::new(StdFetcher, ResolveOptions::from_config(config))
    }
}

#[cfg(test)]
mod tests {
    use dz_core::{ResolutionError, TileSource, TileSourceKind};
    use proptest::prelude::*;
    use serde_json::json;

    use super::{
        MemoryFetcher, ReferenceKind, ResolveOptions, Resolver, TileSourceReference, classify,
        expand_references, is_json_uri,
    };

    const INFO_URI: &str = "https://example.org/iiif/book1/info.json";

    fn iiif_info() -> serde_json::Value {
        json!({
            "@id": "https://example.org/iiif/book1",
            "width": 1000,
            "height": 1400,
            "tiles": [{"width": 512, "scaleFactors": [1, 2, 4]}]
        })
    }

    #[test]
    fn classifies_the_three_reference_shapes() {
        assert_eq!(classify(&INFO_URI.into()), ReferenceKind::JsonUri);
        assert_eq!(
            classify(&"https://example.org/image.jpg".into()),
            ReferenceKind::ImageUri
        );
        assert_eq!(
            classify(&json!({"width": 100, "height": 200}).into()),
            ReferenceKind::ResolvedJson
        );
        assert_eq!(
            classify(&r#"{"width": 1, "height": 1}"#.into()),
            ReferenceKind::JsonText
        );
        assert_eq!(classify(&"not json".into()), ReferenceKind::Unrecognized);
    }

    #[test]
    fn json_uri_detection_ignores_query_and_trailing_slash() {
        assert!(is_json_uri("https://e/info.JSON"));
        assert!(is_json_uri("https://e/info.json?token=abc"));
        assert!(is_json_uri("https://e/info.json/"));
        assert!(is_json_uri("file:/tmp/info.json"));
        assert!(!is_json_uri("https://e/image.jpg?format=.json"));
    }

    #[test]
    fn json_uri_is_fetched() {
        let fetcher = MemoryFetcher::new().with_document(INFO_URI, iiif_info());
        let resolver = Resolver::new(&fetcher, ResolveOptions::default());

        let source = resolver.resolve(&INFO_URI.into()).expect("info resolves");
        assert_eq!(source.kind(), TileSourceKind::IiifInfo);
        assert_eq!(fetcher.requests(), vec![INFO_URI]);
    }

    #[test]
    fn inline_json_is_not_fetched() {
        let fetcher = MemoryFetcher::new();
        let resolver = Resolver::new(&fetcher, ResolveOptions::default());

        let json = resolver
            .resolve_json(&json!({"width": 100, "height": 200}).into())
            .expect("inline JSON passes through");
        assert_eq!(json["height"], 200);
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn image_uri_falls_back_to_single_image() {
        let fetcher = MemoryFetcher::new();
        let resolver = Resolver::new(&fetcher, ResolveOptions::default());

        let reference = TileSourceReference::from("https://example.org/image.jpg");
        assert!(matches!(
            resolver.resolve_json(&reference),
            Err(ResolutionError::NotJsonUri { .. })
        ));
        let source = resolver.resolve(&reference).expect("falls back");
        let TileSource::SingleImage(image) = source else {
            panic!("expected single image, got {source:?}");
        };
        assert_eq!(image.url, "https://example.org/image.jpg");
        assert_eq!(image.size, None);
        assert!(fetcher.requests().is_empty());
    }

    #[test]
    fn failed_json_fetch_is_an_error() {
        let resolver = Resolver::new(MemoryFetcher::new(), ResolveOptions::default());
        let result = resolver.resolve(&INFO_URI.into());
        assert!(matches!(result, Err(ResolutionError::Fetch { .. })));
    }

    #[test]
    fn unparseable_text_is_rejected() {
        let resolver = Resolver::new(MemoryFetcher::new(), ResolveOptions::default());
        assert!(matches!(
            resolver.resolve(&"ftp://example.org/info.json".into()),
            Err(ResolutionError::Unrecognized { .. })
        ));
    }

    #[test]
    fn resolve_all_keeps_order_and_fails_on_first_error() {
        let fetcher = MemoryFetcher::new().with_document(INFO_URI, iiif_info());
        let resolver = Resolver::new(&fetcher, ResolveOptions::default());

        let sources = resolver
            .resolve_all(&[INFO_URI.into(), "https://example.org/b.png".into()])
            .expect("both resolve");
        assert_eq!(sources[0].kind(), TileSourceKind::IiifInfo);
        assert_eq!(sources[1].kind(), TileSourceKind::SingleImage);

        let failed = resolver.resolve_all(&["garbage".into(), INFO_URI.into()]);
        assert!(failed.is_err());
    }

    #[test]
    fn reference_lists_expand_but_level_arrays_do_not() {
        let list = expand_references(json!([INFO_URI, {"@id": "x", "width": 1, "height": 1}]));
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], TileSourceReference::Text(INFO_URI.to_string()));

        let levels = expand_references(json!([{"url": "a.jpg", "width": 1, "height": 1}]));
        assert_eq!(levels.len(), 1);
        assert!(matches!(levels[0], TileSourceReference::Json(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_classify_is_total_and_deterministic(input in ".{0,128}") {
            let reference = TileSourceReference::from(input.as_str());
            prop_assert_eq!(classify(&reference), classify(&reference));
        }

        #[test]
        fn prop_http_paths_ending_in_json_are_json_uris(path in "[a-z0-9/]{1,32}") {
            let uri = format!("https://example.org/{path}.json");
            prop_assert_eq!(classify(&uri.as_str().into()), ReferenceKind::JsonUri);
        }
    }
}
