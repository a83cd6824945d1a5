use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

/// Page layout a card is rendered with.
///
/// Every `template_id` maps to exactly one variant; unknown and missing ids
/// fall back to [`RenderVariant::Classic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderVariant {
    #[default]
    Classic,
    Modern,
    Minimal,
    Corporate,
    Creative,
}

impl RenderVariant {
    pub const ALL: [RenderVariant; 5] = [
        RenderVariant::Classic,
        RenderVariant::Modern,
        RenderVariant::Minimal,
        RenderVariant::Corporate,
        RenderVariant::Creative,
    ];

    /// Maps a stored `template_id` to its variant.
    pub fn from_template_id(template_id: Option<&str>) -> Self {
        let Some(raw) = template_id else {
            return RenderVariant::default();
        };

        match raw.trim().to_ascii_lowercase().as_str() {
            "classic" | "template1" | "1" => RenderVariant::Classic,
            "modern" | "template2" | "2" => RenderVariant::Modern,
            "minimal" | "template3" | "3" => RenderVariant::Minimal,
            "corporate" | "template4" | "4" => RenderVariant::Corporate,
            "creative" | "template5" | "5" => RenderVariant::Creative,
            other => {
                debug!("Unknown template id '{}', using default variant", other);
                RenderVariant::default()
            }
        }
    }

    /// Key used to locate the static template file for this variant.
    pub fn key(self) -> &'static str {
        match self {
            RenderVariant::Classic => "classic",
            RenderVariant::Modern => "modern",
            RenderVariant::Minimal => "minimal",
            RenderVariant::Corporate => "corporate",
            RenderVariant::Creative => "creative",
        }
    }

    /// File name of the template inside the templates directory.
    pub fn template_file(self) -> String {
        format!("{}.html", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_template_maps_to_default() {
        assert_eq!(RenderVariant::from_template_id(None), RenderVariant::Classic);
    }

    #[test]
    fn unknown_template_maps_to_default() {
        assert_eq!(
            RenderVariant::from_template_id(Some("holographic")),
            RenderVariant::Classic
        );
        assert_eq!(RenderVariant::from_template_id(Some("")), RenderVariant::Classic);
    }

    #[test]
    fn known_templates_map_case_insensitively() {
        assert_eq!(
            RenderVariant::from_template_id(Some(" Modern ")),
            RenderVariant::Modern
        );
        assert_eq!(
            RenderVariant::from_template_id(Some("template5")),
            RenderVariant::Creative
        );
    }

    #[test]
    fn every_variant_round_trips_through_its_key() {
        for variant in RenderVariant::ALL {
            assert_eq!(RenderVariant::from_template_id(Some(variant.key())), variant);
        }
    }

    #[test]
    fn serializes_as_snake_case_key() {
        let json = serde_json::to_string(&RenderVariant::Corporate).unwrap();
        assert_eq!(json, "\"corporate\"");
    }
}
