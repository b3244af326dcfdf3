use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::types::LanguageCode;

/// Base address of the embeddable map view.
const MAP_EMBED_BASE: &str = "https://maps.google.com/maps";

/// Zoom level used for every embedded map.
pub const MAP_EMBED_ZOOM: u8 = 14;

/// A geographic point referenced from a message with `[MAP: lat,lng]`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapReference {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl MapReference {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds the embeddable map view centered on this point.
    pub fn embed_url(&self, language: LanguageCode) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("q", &format!("{},{}", self.latitude, self.longitude))
            .append_pair("hl", language.code())
            .append_pair("z", &MAP_EMBED_ZOOM.to_string())
            .append_pair("output", "embed")
            .finish();
        format!("{MAP_EMBED_BASE}?{query}")
    }
}

/// One renderable piece of a message, as produced by [`parse`](crate::parse).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Text shown as is.
    PlainText {
        /// The literal text.
        text: String,
    },

    /// Text that was wrapped in `**`.
    Bold {
        /// The text between the delimiters.
        text: String,
    },

    /// An image written as `![alt](url)`.
    Image {
        /// Alternative text.
        alt: String,
        /// Image location, exactly as written.
        url: String,
    },

    /// A map written as `[MAP: lat,lng]`.
    MapReference(MapReference),
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Segment::PlainText { text: text.into() }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Segment::Bold { text: text.into() }
    }

    pub fn image(alt: impl Into<String>, url: impl Into<String>) -> Self {
        Segment::Image {
            alt: alt.into(),
            url: url.into(),
        }
    }

    pub fn map(latitude: f64, longitude: f64) -> Self {
        Segment::MapReference(MapReference::new(latitude, longitude))
    }

    /// Returns the readable text carried by this segment, if any.
    ///
    /// Concatenating the text of every segment of a message yields the
    /// message with its markup removed.
    pub fn text(&self) -> Option<&str> {
        match self {
            Segment::PlainText { text } | Segment::Bold { text } => Some(text),
            Segment::Image { .. } | Segment::MapReference(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};
    use url::Url;

    #[test]
    fn embed_url_uses_fixed_zoom_and_language() {
        let url = MapReference::new(36.8703, 10.3421).embed_url(LanguageCode::Fr);
        assert_eq!(
            url,
            "https://maps.google.com/maps?q=36.8703%2C10.3421&hl=fr&z=14&output=embed"
        );
    }

    #[test]
    fn embed_url_keeps_negative_coordinates() {
        let url = Url::parse(&MapReference::new(-33.5, -70.25).embed_url(LanguageCode::En)).unwrap();
        assert_eq!(url.host_str(), Some("maps.google.com"));
        let q = url
            .query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.into_owned());
        assert_eq!(q.as_deref(), Some("-33.5,-70.25"));
    }

    #[test]
    fn segment_text() {
        assert_eq!(Segment::plain("a").text(), Some("a"));
        assert_eq!(Segment::bold("b").text(), Some("b"));
        assert_eq!(Segment::image("alt", "u").text(), None);
        assert_eq!(Segment::map(1.0, 2.0).text(), None);
    }

    #[test]
    fn segment_serialization() {
        assert_eq!(
            to_value(Segment::image("Carthage", "https://example.com/c.jpg")).unwrap(),
            json!({"type": "image", "alt": "Carthage", "url": "https://example.com/c.jpg"})
        );
        assert_eq!(
            to_value(Segment::map(36.8, 10.3)).unwrap(),
            json!({"type": "map_reference", "latitude": 36.8, "longitude": 10.3})
        );
    }
}
