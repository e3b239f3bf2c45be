//! Viewer configuration and its tolerant JSON validator.

use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{IiifSize, IiifTile};

/// Style and interactivity profile shared by a group of overlays.
///
/// A missing `styleClass` defaults to the group name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "OverlayGroupFields", rename_all = "camelCase")]
pub struct OverlayGroup {
    pub name: String,
    pub style_class: String,
    pub interactive: bool,
    pub hidden: bool,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct OverlayGroupFields {
    name: String,
    style_class: Option<String>,
    interactive: bool,
    hidden: bool,
}

impl From<OverlayGroupFields> for OverlayGroup {
    fn from(fields: OverlayGroupFields) -> Self {
        let mut group = Self::new(fields.name);
        if let Some(style_class) = fields.style_class {
            group.style_class = style_class;
        }
        group.interactive = fields.interactive;
        group.hidden = fields.hidden;
        group
    }
}

impl OverlayGroup {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            style_class: name.clone(),
            name,
            interactive: false,
            hidden: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Grow the container to the image height instead of fitting into it.
    pub adapt_container_height: bool,
    /// Pixels reserved below the image for a static footer.
    pub footer_height: f64,
    /// Lower zoom bound as a multiple of the home zoom.
    pub min_zoom_level: f64,
    /// Upper zoom bound as a multiple of the home zoom.
    pub max_zoom_level: f64,
    /// Fraction of the image that must stay visible while panning.
    pub visibility_ratio: f64,
    /// Hit-test tolerance in viewport-normalized units.
    pub hit_tolerance: f64,
    pub overlay_groups: Vec<OverlayGroup>,
    /// MIME type used for synthesized legacy pyramid URLs.
    pub mime_type: String,
    pub fetch_timeout_secs: u64,
    /// Replaces the `tiles` array of every IIIF info document.
    pub iiif_tiles: Option<Vec<IiifTile>>,
    /// Replaces the `sizes` array of every IIIF info document.
    pub iiif_sizes: Option<Vec<IiifSize>>,
    /// Key under which the last viewport location is persisted.
    pub persistence_id: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            adapt_container_height: false,
            footer_height: 0.0,
            min_zoom_level: 1.0,
            max_zoom_level: 20.0,
            visibility_ratio: 0.5,
            hit_tolerance: 0.004,
            overlay_groups: Vec::new(),
            mime_type: "image/jpeg".to_string(),
            fetch_timeout_secs: 600,
            iiif_tiles: None,
            iiif_sizes: None,
            persistence_id: None,
        }
    }
}

impl ViewerConfig {
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn overlay_group(&self, name: &str) -> Option<&OverlayGroup> {
        self.overlay_groups.iter().find(|group| group.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConfigError {
    pub field: String,
    pub value: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ViewerConfigParse {
    pub config: ViewerConfig,
    pub warnings: Vec<String>,
    pub errors: Vec<ConfigError>,
}

impl ViewerConfigParse {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a configuration document field by field.
///
/// Invalid fields keep their default and are reported in `errors`; unknown
/// keys are reported in `warnings`. The function never fails as a whole.
#[must_use]
pub fn parse_viewer_config_value(value: &Value) -> ViewerConfigParse {
    let mut parsed = ViewerConfigParse::default();
    let Some(config_obj) = value.as_object() else {
        parsed.errors.push(ConfigError {
            field: "$".to_string(),
            value: value.to_string(),
            message: "viewer config root must be a JSON object".to_string(),
        });
        return parsed;
    };

    for (key, raw_value) in config_obj {
        match key.as_str() {
            "adaptContainerHeight" => {
                if let Some(flag) = raw_value.as_bool() {
                    parsed.config.adapt_container_height = flag;
                } else {
                    push_type_error(&mut parsed, key, raw_value, "must be a boolean");
                }
            }
            "footerHeight" => {
                if let Some(height) = non_negative(raw_value) {
                    parsed.config.footer_height = height;
                } else {
                    push_type_error(&mut parsed, key, raw_value, "must be a number >= 0");
                }
            }
            "minZoomLevel" => {
                if let Some(level) = positive(raw_value) {
                    parsed.config.min_zoom_level = level;
                } else {
                    push_type_error(&mut parsed, key, raw_value, "must be a number > 0");
                }
            }
            "maxZoomLevel" => {
                if let Some(level) = positive(raw_value) {
                    parsed.config.max_zoom_level = level;
                } else {
                    push_type_error(&mut parsed, key, raw_value, "must be a number > 0");
                }
            }
            "visibilityRatio" => match raw_value.as_f64() {
                Some(ratio) if (0.0..=1.0).contains(&ratio) => {
                    parsed.config.visibility_ratio = ratio;
                }
                _ => push_type_error(
                    &mut parsed,
                    key,
                    raw_value,
                    "must be a number between 0 and 1",
                ),
            },
            "hitTolerance" => {
                if let Some(tolerance) = positive(raw_value) {
                    parsed.config.hit_tolerance = tolerance;
                } else {
                    push_type_error(&mut parsed, key, raw_value, "must be a number > 0");
                }
            }
            "mimeType" => {
                if let Some(mime) = raw_value.as_str().filter(|mime| mime.contains('/')) {
                    parsed.config.mime_type = mime.to_string();
                } else {
                    push_type_error(
                        &mut parsed,
                        key,
                        raw_value,
                        "must be a MIME type string (for example, \"image/jpeg\")",
                    );
                }
            }
            "fetchTimeoutSecs" => {
                if let Some(secs) = raw_value.as_u64().filter(|secs| *secs > 0) {
                    parsed.config.fetch_timeout_secs = secs;
                } else {
                    push_type_error(&mut parsed, key, raw_value, "must be a positive integer");
                }
            }
            "persistenceId" => match raw_value {
                Value::String(id) => parsed.config.persistence_id = Some(id.clone()),
                Value::Null => parsed.config.persistence_id = None,
                _ => push_type_error(&mut parsed, key, raw_value, "must be a string"),
            },
            "iiifTiles" => match serde_json::from_value::<Vec<IiifTile>>(raw_value.clone()) {
                Ok(tiles) => parsed.config.iiif_tiles = Some(tiles),
                Err(_) => push_type_error(
                    &mut parsed,
                    key,
                    raw_value,
                    "must be an array of {width, height, scaleFactors}",
                ),
            },
            "iiifSizes" => match serde_json::from_value::<Vec<IiifSize>>(raw_value.clone()) {
                Ok(sizes) => parsed.config.iiif_sizes = Some(sizes),
                Err(_) => push_type_error(
                    &mut parsed,
                    key,
                    raw_value,
                    "must be an array of {width, height}",
                ),
            },
            "overlayGroups" => parse_overlay_groups(raw_value, &mut parsed),
            other => parsed
                .warnings
                .push(format!("Unsupported viewer config key '{other}' ignored")),
        }
    }

    if parsed.config.min_zoom_level > parsed.config.max_zoom_level {
        parsed.errors.push(ConfigError {
            field: "minZoomLevel".to_string(),
            value: parsed.config.min_zoom_level.to_string(),
            message: "must not exceed maxZoomLevel".to_string(),
        });
        let defaults = ViewerConfig::default();
        parsed.config.min_zoom_level = defaults.min_zoom_level;
        parsed.config.max_zoom_level = defaults.max_zoom_level;
    }

    parsed
}

fn parse_overlay_groups(value: &Value, parsed: &mut ViewerConfigParse) {
    let Some(entries) = value.as_array() else {
        push_type_error(parsed, "overlayGroups", value, "must be an array");
        return;
    };

    let mut seen = FxHashSet::default();
    for (index, entry) in entries.iter().enumerate() {
        let field = format!("overlayGroups[{index}]");
        let group = match serde_json::from_value::<OverlayGroup>(entry.clone()) {
            Ok(group) if !group.name.is_empty() => group,
            _ => {
                push_type_error(
                    parsed,
                    &field,
                    entry,
                    "must be an object with a non-empty name",
                );
                continue;
            }
        };
        if !seen.insert(group.name.clone()) {
            parsed
                .warnings
                .push(format!("Duplicate overlay group '{}' ignored", group.name));
            continue;
        }
        parsed.config.overlay_groups.push(group);
    }
}

fn push_type_error(parsed: &mut ViewerConfigParse, field: &str, value: &Value, message: &str) {
    parsed.errors.push(ConfigError {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    });
}

fn non_negative(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .filter(|number| number.is_finite() && *number >= 0.0)
}

fn positive(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .filter(|number| number.is_finite() && *number > 0.0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{OverlayGroup, ViewerConfig, parse_viewer_config_value};

    #[test]
    fn parses_known_fields() {
        let parsed = parse_viewer_config_value(&json!({
            "adaptContainerHeight": true,
            "footerHeight": 50,
            "minZoomLevel": 0.5,
            "maxZoomLevel": 10,
            "visibilityRatio": 0.8,
            "mimeType": "image/tiff",
            "overlayGroups": [
                {"name": "fulltext", "styleClass": "coords-highlighting", "interactive": true}
            ]
        }));

        assert!(parsed.is_valid(), "errors: {:?}", parsed.errors);
        assert!(parsed.warnings.is_empty());
        let config = parsed.config;
        assert!(config.adapt_container_height);
        assert_eq!(config.footer_height, 50.0);
        assert_eq!(config.min_zoom_level, 0.5);
        assert_eq!(config.max_zoom_level, 10.0);
        assert_eq!(config.mime_type, "image/tiff");
        let group = config.overlay_group("fulltext").expect("group is configured");
        assert_eq!(group.style_class, "coords-highlighting");
        assert!(group.interactive);
        assert!(!group.hidden);
    }

    #[test]
    fn bad_values_keep_defaults_and_report_errors() {
        let parsed = parse_viewer_config_value(&json!({
            "footerHeight": -3,
            "visibilityRatio": 2.0,
            "adaptContainerHeight": "yes"
        }));

        let defaults = ViewerConfig::default();
        assert_eq!(parsed.errors.len(), 3);
        assert_eq!(parsed.config.footer_height, defaults.footer_height);
        assert_eq!(parsed.config.visibility_ratio, defaults.visibility_ratio);
        assert!(!parsed.config.adapt_container_height);
    }

    #[test]
    fn unknown_keys_and_duplicate_groups_warn() {
        let parsed = parse_viewer_config_value(&json!({
            "rememberZoom": true,
            "overlayGroups": [{"name": "a"}, {"name": "a"}]
        }));

        assert!(parsed.is_valid());
        assert_eq!(parsed.warnings.len(), 2);
        assert_eq!(parsed.config.overlay_groups.len(), 1);
    }

    #[test]
    fn group_style_class_defaults_to_the_name() {
        let parsed = parse_viewer_config_value(&json!({
            "overlayGroups": [{"name": "notes"}, {"name": "marks", "styleClass": "mark"}]
        }));
        assert!(parsed.is_valid());
        assert_eq!(parsed.config.overlay_groups[0], OverlayGroup::new("notes"));
        assert_eq!(parsed.config.overlay_groups[1].style_class, "mark");

        let direct: OverlayGroup =
            serde_json::from_value(json!({"name": "x", "interactive": true})).expect("group");
        assert_eq!(direct.style_class, "x");
        assert!(direct.interactive);
    }

    #[test]
    fn inverted_zoom_range_is_rejected() {
        let parsed = parse_viewer_config_value(&json!({"minZoomLevel": 5, "maxZoomLevel": 2}));
        assert_eq!(parsed.errors.len(), 1);
        assert!(parsed.config.min_zoom_level <= parsed.config.max_zoom_level);
    }

    #[test]
    fn non_object_root_is_an_error() {
        let parsed = parse_viewer_config_value(&json!([1, 2]));
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].field, "$");
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let config: ViewerConfig =
            serde_json::from_value(json!({"footerHeight": 12.5})).expect("deserialize config");
        assert_eq!(config.footer_height, 12.5);
        assert_eq!(config.fetch_timeout().as_secs(), 600);
        assert_eq!(config.hit_tolerance, 0.004);
    }
}
