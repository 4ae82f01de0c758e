use std::fmt;

pub const ROUTE_PREFIX: &str = "talks";

/// `/talks/{deck}/{slide}` where `slide` is 1-based.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SlideAddress {
    pub deck: String,
    pub slide: u32,
}

impl SlideAddress {
    pub fn new(deck: impl Into<String>, slide: u32) -> Self {
        Self {
            deck: deck.into(),
            slide,
        }
    }

    pub fn to_path(&self) -> String {
        format!("/{}/{}/{}", ROUTE_PREFIX, self.deck, self.slide)
    }

    pub fn parse(path: &str) -> Result<Self, String> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> =
            path.split('/').filter(|s| !s.is_empty()).collect();

        Self::from_segments(&segments)
            .map_err(|err| format!("invalid slide path '{}': {}", path, err))
    }

    /// Builds an address from router segments, e.g. `["talks", "intro", "3"]`.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self, String> {
        let [prefix, deck, slide] = segments else {
            return Err(format!(
                "expected 3 segments, found {}",
                segments.len()
            ));
        };

        if prefix.as_ref() != ROUTE_PREFIX {
            return Err(format!(
                "expected '{}' prefix, found '{}'",
                ROUTE_PREFIX,
                prefix.as_ref()
            ));
        }

        let deck = deck.as_ref();
        if deck.is_empty() {
            return Err("empty deck segment".to_string());
        }

        let slide = slide
            .as_ref()
            .parse::<u32>()
            .map_err(|err| format!("bad slide number: {}", err))?;

        Ok(Self::new(deck, slide))
    }
}

impl fmt::Display for SlideAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_talk_path() {
        assert_eq!(SlideAddress::new("intro", 4).to_path(), "/talks/intro/4");
    }

    #[test]
    fn parses_path_ignoring_query_and_trailing_slash() {
        let address = SlideAddress::parse("/talks/intro/12/?mode=notes").unwrap();
        assert_eq!(address, SlideAddress::new("intro", 12));
    }

    #[test]
    fn parses_router_segments() {
        let address =
            SlideAddress::from_segments(&["talks", "deep-dive", "2"]).unwrap();
        assert_eq!(address.deck, "deep-dive");
        assert_eq!(address.slide, 2);
    }

    #[test]
    fn rejects_foreign_paths() {
        assert!(SlideAddress::parse("/blog/intro/1").is_err());
        assert!(SlideAddress::parse("/talks/intro").is_err());
        assert!(SlideAddress::parse("/talks/intro/first").is_err());
    }
}
