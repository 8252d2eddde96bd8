use thiserror::Error;

/// Which kind of declared element an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Map,
    Location,
    Image,
    Video,
    Edge,
    Data,
}

impl ElementKind {
    /// Label used in user-facing notices.
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Map => "Story Maps",
            ElementKind::Location => "Story Locations",
            ElementKind::Image => "Map Images",
            ElementKind::Video => "Map Videos",
            ElementKind::Edge => "Map Edges",
            ElementKind::Data => "Map Data elements",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Map => write!(f, "geo-map"),
            ElementKind::Location => write!(f, "map-location"),
            ElementKind::Image => write!(f, "map-image"),
            ElementKind::Video => write!(f, "map-video"),
            ElementKind::Edge => write!(f, "map-edge"),
            ElementKind::Data => write!(f, "map-data"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{element} is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: ElementKind,
        attribute: &'static str,
    },
    #[error("{element} attribute `{attribute}` is not a number: {value:?}")]
    InvalidAttribute {
        element: ElementKind,
        attribute: &'static str,
        value: String,
    },
    #[error("story map requires a Mapbox access token")]
    MissingAccessToken,
    #[error("{0} requires a src attribute")]
    MissingSource(ElementKind),
    #[error("{element} is missing its {corner} corner")]
    MissingCorner {
        element: ElementKind,
        corner: &'static str,
    },
    #[error("no declared element with id {0:?}")]
    UnknownEndpoint(String),
    #[error("unknown map command {0:?}")]
    UnknownCommand(String),
    #[error("marker feed could not be parsed: {0}")]
    Feed(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

const README_HINT: &str = "Please consult the readme for more information";

impl Error {
    /// Text rendered inline inside the element that failed to construct.
    pub fn notice(&self) -> String {
        match self {
            Error::MissingAttribute { element, attribute }
            | Error::InvalidAttribute {
                element, attribute, ..
            } => format!(
                "Error: {} require a {} value. {}",
                element.label(),
                attribute,
                README_HINT
            ),
            Error::MissingAccessToken => {
                format!("Error: Story Map requires a Mapbox access token. {README_HINT}")
            }
            Error::MissingSource(element) => format!(
                "Error: {} require the attribute src to work. {}",
                element.label(),
                README_HINT
            ),
            Error::MissingCorner { element, corner } => format!(
                "Error: {} require a {} corner with longitude and latitude. {}",
                element.label(),
                corner,
                README_HINT
            ),
            Error::UnknownEndpoint(id) => {
                format!("Error: could not find a map element with id \"{id}\". {README_HINT}")
            }
            other => format!("Error: {other}. {README_HINT}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_zoom_notice_names_attribute() {
        let err = Error::MissingAttribute {
            element: ElementKind::Location,
            attribute: "zoom",
        };
        assert_eq!(
            err.notice(),
            "Error: Story Locations require a zoom value. Please consult the readme for more information"
        );
    }

    #[test]
    fn test_invalid_attribute_reads_like_missing() {
        let err = Error::InvalidAttribute {
            element: ElementKind::Location,
            attribute: "latitude",
            value: "north".to_string(),
        };
        assert!(err.notice().contains("require a latitude value"));
        assert!(err.to_string().contains("\"north\""));
    }

    #[test]
    fn test_element_kind_display_is_tag_name() {
        assert_eq!(ElementKind::Location.to_string(), "map-location");
        assert_eq!(ElementKind::Map.to_string(), "geo-map");
    }
}
