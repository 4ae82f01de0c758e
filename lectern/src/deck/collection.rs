use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yml::Value;
use yaml_merge_keys::merge_keys_serde_yml;

/// A single slide tagged with the deck it belongs to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Slide {
    pub deck: String,
    /// 1-based position within the deck.
    pub number: u32,
    pub title: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeckSummary {
    pub name: String,
    pub title: String,
    pub slide_count: u32,
}

/// Ordered, deck-tagged slides. Decks keep manifest order.
#[derive(Clone, Debug, Default)]
pub struct SlideCollection {
    slides: Vec<Slide>,
    titles: IndexMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    decks: IndexMap<String, DeckManifest>,
}

#[derive(Debug, Default, Deserialize)]
struct DeckManifest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    slides: Vec<SlideManifest>,
}

#[derive(Debug, Default, Deserialize)]
struct SlideManifest {
    #[serde(default)]
    title: String,
}

impl SlideCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let source = fs::read_to_string(path).map_err(|err| {
            format!(
                "failed to read deck manifest '{}': {}",
                path.display(),
                err
            )
        })?;

        Self::from_yaml(&source).map_err(|err| {
            format!("invalid deck manifest '{}': {}", path.display(), err)
        })
    }

    pub fn from_yaml(source: &str) -> Result<Self, String> {
        let raw: Value = serde_yml::from_str(source)
            .map_err(|err| format!("failed to parse YAML: {}", err))?;

        let merged = merge_keys_serde_yml(raw).map_err(|err| {
            format!("failed to process YAML merge keys: {}", err)
        })?;

        let manifest: Manifest = serde_yml::from_value(merged)
            .map_err(|err| format!("failed to decode decks: {}", err))?;

        let mut collection = Self::new();

        for (name, deck) in manifest.decks {
            if name.is_empty() || name.contains('/') {
                return Err(format!("invalid deck name '{}'", name));
            }

            let title = deck.title.unwrap_or_else(|| name.clone());
            collection.titles.insert(name.clone(), title);

            for (index, slide) in deck.slides.into_iter().enumerate() {
                collection.slides.push(Slide {
                    deck: name.clone(),
                    number: index as u32 + 1,
                    title: slide.title,
                });
            }
        }

        Ok(collection)
    }

    /// Appends a slide to `deck`, numbering it after the deck's last slide.
    pub fn push(&mut self, deck: &str, title: impl Into<String>) -> &Slide {
        let number = self.slide_count(deck) + 1;

        self.titles
            .entry(deck.to_string())
            .or_insert_with(|| deck.to_string());

        self.slides.push(Slide {
            deck: deck.to_string(),
            number,
            title: title.into(),
        });

        &self.slides[self.slides.len() - 1]
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn slide_count(&self, deck: &str) -> u32 {
        self.slides.iter().filter(|slide| slide.deck == deck).count() as u32
    }

    pub fn slide(&self, deck: &str, number: u32) -> Option<&Slide> {
        self.slides
            .iter()
            .find(|slide| slide.deck == deck && slide.number == number)
    }

    pub fn contains_deck(&self, deck: &str) -> bool {
        self.titles.contains_key(deck)
    }

    pub fn first_deck_name(&self) -> Option<&str> {
        self.titles.keys().next().map(String::as_str)
    }

    pub fn decks(&self) -> Vec<DeckSummary> {
        self.titles
            .iter()
            .map(|(name, title)| DeckSummary {
                name: name.clone(),
                title: title.clone(),
                slide_count: self.slide_count(name),
            })
            .collect()
    }
}
