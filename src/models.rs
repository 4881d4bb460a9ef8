// =============================================================================
// models.rs - THE CARD BINDER
// =============================================================================
//
// The structs that come out the other end of the crawl. One CardRecord per
// detail page, in the exact order the "next" links led us through the set.
//
// The two enumerations (card type and color) are closed: anything the site
// throws at us that isn't on the list lands in `Unrecognized` and is written
// out as -1. No more "sometimes undefined, sometimes -1".
// =============================================================================

use serde::{Serialize, Serializer};
use std::fmt;
use url::Url;

/// Product-line family tag written into every record.
pub const GAME_TAG: &str = "WS";

/// What kind of card this is. Serialized as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardType {
    Character,
    Event,
    Climax,
    /// The Card Type cell said something we don't know about (or was missing).
    Unrecognized,
}

impl CardType {
    /// Case-insensitive match against the three known card types.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "character" => CardType::Character,
            "event" => CardType::Event,
            "climax" => CardType::Climax,
            _ => CardType::Unrecognized,
        }
    }

    pub fn code(self) -> i8 {
        match self {
            CardType::Character => 1,
            CardType::Event => 2,
            CardType::Climax => 3,
            CardType::Unrecognized => -1,
        }
    }
}

impl Serialize for CardType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.code())
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardType::Character => write!(f, "Character"),
            CardType::Event => write!(f, "Event"),
            CardType::Climax => write!(f, "Climax"),
            CardType::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

/// Card color, derived from the icon filename in the Color cell
/// (`.../blue.gif` is blue, and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Yellow,
    Green,
    Red,
    Blue,
    Unrecognized,
}

impl Color {
    /// Case-insensitive match of an icon filename stem.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "yellow" => Color::Yellow,
            "green" => Color::Green,
            "red" => Color::Red,
            "blue" => Color::Blue,
            _ => Color::Unrecognized,
        }
    }

    pub fn code(self) -> i8 {
        match self {
            Color::Yellow => 1,
            Color::Green => 2,
            Color::Red => 3,
            Color::Blue => 4,
            Color::Unrecognized => -1,
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.code())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Yellow => write!(f, "Yellow"),
            Color::Green => write!(f, "Green"),
            Color::Red => write!(f, "Red"),
            Color::Blue => write!(f, "Blue"),
            Color::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}

/// One card, one detail page. Built once by the extractor and never touched
/// again after it lands in the collection.
///
/// Field order here is the key order in the output JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardRecord {
    pub name: String,
    pub set_code: String,
    pub title_code: String,
    pub rarity: String,
    pub card_type: CardType,
    pub level: i32,
    /// Only the extended variant reads Cost. The key is dropped otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<i32>,
    pub color: Color,
    pub power: i32,
    pub soul: u32,
    pub triggers: Vec<String>,
    pub text: String,
    pub traits: String,
    pub image_url: String,
    pub game: &'static str,
}

/// Which flavor of record we're producing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// The plain scraper: no Cost, image_url is the remote asset URL.
    Base,
    /// Reads Cost too, and rewrites image_url to `storage_prefix + filename`.
    Extended { storage_prefix: String },
}

impl Variant {
    pub fn reads_cost(&self) -> bool {
        matches!(self, Variant::Extended { .. })
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Base => write!(f, "base"),
            Variant::Extended { .. } => write!(f, "extended"),
        }
    }
}

/// An opaque page identifier, e.g. `.?cardno=TSK/S70-E001`. The first one comes
/// from config; every other one is the `href` of a "next" anchor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId(String);

impl PageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve against the site base using normal relative-reference rules.
    pub fn resolve(&self, base: &Url) -> Result<Url, url::ParseError> {
        base.join(&self.0)
    }

    /// The `cardno` query value if there is one, otherwise the raw identifier.
    /// Only used to make log lines readable.
    pub fn card_number(&self, base: &Url) -> String {
        self.resolve(base)
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "cardno")
                    .map(|(_, value)| value.into_owned())
            })
            .unwrap_or_else(|| self.0.clone())
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a card's image lives and what to call it on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub url: Url,
    pub filename: String,
}
