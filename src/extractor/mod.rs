// =============================================================================
// extractor/mod.rs - THE FIELD EXTRACTOR
// =============================================================================
//
// A cardlist detail page is one big table of `<th>label</th><td>value</td>`
// pairs. We find each label by the designator text it contains, read the
// cell right after it, and normalize what we find.
//
// Which designator feeds which field is a table (`FieldSpec`), checked once
// when the extractor is built. A page that is missing one of those labels
// still produces a record: the field degrades to its empty value and the
// page reports an `ExtractionGap` so the walker can complain about it.
//
// Everything in here is pure. Markup in, record out. No network, no disk.
// The image download happens later, in the walker.
// =============================================================================

pub mod navigation;
pub mod normalize;

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{ExtractionGap, ExtractorError, GapReason};
use crate::models::{CardRecord, CardType, Color, ImageAsset, PageId, Variant, GAME_TAG};
use normalize::{filename_stem, first_line, parse_leading_int, title_code, NUMERIC_SENTINEL};

static LABEL_CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th").expect("static selector `th` is valid"));

static ICONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("static selector `img` is valid"));

static CARD_GRAPHIC: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".graphic img").expect("static selector `.graphic img` is valid")
});

/// Every field the extractor knows how to fill from a labelled cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    SetCode,
    Rarity,
    CardType,
    Soul,
    Triggers,
    Level,
    Cost,
    Color,
    Power,
    Text,
    Traits,
}

impl Field {
    /// All fields, in the order the site lays them out.
    pub const ALL: [Field; 12] = [
        Field::Name,
        Field::SetCode,
        Field::Rarity,
        Field::CardType,
        Field::Soul,
        Field::Triggers,
        Field::Level,
        Field::Cost,
        Field::Color,
        Field::Power,
        Field::Text,
        Field::Traits,
    ];

    /// The record key this field fills.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::SetCode => "set_code",
            Field::Rarity => "rarity",
            Field::CardType => "card_type",
            Field::Soul => "soul",
            Field::Triggers => "triggers",
            Field::Level => "level",
            Field::Cost => "cost",
            Field::Color => "color",
            Field::Power => "power",
            Field::Text => "text",
            Field::Traits => "traits",
        }
    }

    /// The label text the English cardlist uses for this field.
    pub fn default_designator(self) -> &'static str {
        match self {
            Field::Name => "Card Name",
            Field::SetCode => "Card No",
            Field::Rarity => "Rarity",
            Field::CardType => "Card Type",
            Field::Soul => "Soul",
            Field::Triggers => "Trigger",
            Field::Level => "Level",
            Field::Cost => "Cost",
            Field::Color => "Color",
            Field::Power => "Power",
            Field::Text => "Text",
            Field::Traits => "Attribute",
        }
    }

    fn required_by(self, variant: &Variant) -> bool {
        self != Field::Cost || variant.reads_cost()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One row of the mapping: "the cell labelled `designator` fills `field`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub designator: String,
}

impl FieldSpec {
    pub fn new(field: Field, designator: impl Into<String>) -> Self {
        Self { field, designator: designator.into() }
    }
}

/// The default table for a variant.
pub fn default_fields(variant: &Variant) -> Vec<FieldSpec> {
    Field::ALL
        .into_iter()
        .filter(|field| field.required_by(variant))
        .map(|field| FieldSpec::new(field, field.default_designator()))
        .collect()
}

/// Everything one page gives us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageExtraction {
    pub record: CardRecord,
    /// The card image to download, if the page has one.
    pub image: Option<ImageAsset>,
    /// Where the "next" anchor points, if anywhere.
    pub next: Option<PageId>,
    pub gaps: Vec<ExtractionGap>,
}

/// Maps one page of markup to one `CardRecord`.
#[derive(Debug, Clone)]
pub struct Extractor {
    variant: Variant,
    base_url: Url,
    fields: Vec<FieldSpec>,
}

impl Extractor {
    /// Extractor with the English cardlist designators.
    pub fn new(variant: Variant, base_url: Url) -> Result<Self, ExtractorError> {
        let fields = default_fields(&variant);
        Self::with_fields(variant, base_url, fields)
    }

    /// Extractor with a custom designator table. The table must map every
    /// field the variant needs exactly once, with distinct non-empty designators.
    pub fn with_fields(
        variant: Variant,
        base_url: Url,
        fields: Vec<FieldSpec>,
    ) -> Result<Self, ExtractorError> {
        let mut seen_fields = HashSet::new();
        let mut seen_designators = HashSet::new();

        for row in &fields {
            if row.designator.trim().is_empty() {
                return Err(ExtractorError::EmptyDesignator(row.field.key()));
            }
            if !row.field.required_by(&variant) {
                return Err(ExtractorError::UnexpectedField(row.field.key(), variant.to_string()));
            }
            if !seen_fields.insert(row.field) {
                return Err(ExtractorError::DuplicateField(row.field.key()));
            }
            if !seen_designators.insert(row.designator.as_str()) {
                return Err(ExtractorError::DuplicateDesignator(row.designator.clone()));
            }
        }

        if let Some(missing) = Field::ALL
            .into_iter()
            .find(|field| field.required_by(&variant) && !seen_fields.contains(field))
        {
            return Err(ExtractorError::MissingField(missing.key()));
        }

        Ok(Self { variant, base_url, fields })
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Extract the record, image reference and next identifier from one page.
    ///
    /// Same markup in, same result out, every time.
    pub fn extract(&self, markup: &str) -> PageExtraction {
        let document = Html::parse_document(markup);
        let mut gaps = Vec::new();
        let mut draft = Draft::new(&self.variant);

        let labels: Vec<(String, ElementRef<'_>)> = document
            .select(&LABEL_CELLS)
            .map(|th| (th.text().collect::<String>(), th))
            .collect();

        for row in &self.fields {
            match value_cell(&labels, &row.designator) {
                Ok(cell) => draft.fill(row.field, cell, &mut gaps),
                Err(reason) => gaps.push(ExtractionGap { field: row.field.key(), reason }),
            }
        }

        let image = self.card_image(&document);
        if image.is_none() {
            gaps.push(ExtractionGap { field: "image_url", reason: GapReason::MissingImage });
        }
        let image_url = match (&image, &self.variant) {
            (None, _) => String::new(),
            (Some(asset), Variant::Base) => asset.url.to_string(),
            (Some(asset), Variant::Extended { storage_prefix }) => {
                format!("{}{}", storage_prefix, asset.filename)
            }
        };

        PageExtraction {
            record: draft.finish(image_url),
            image,
            next: navigation::next_page(&document),
            gaps,
        }
    }

    /// The `.graphic img` source, resolved against the site base.
    fn card_image(&self, document: &Html) -> Option<ImageAsset> {
        let src = document
            .select(&CARD_GRAPHIC)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::trim)
            .filter(|src| !src.is_empty())?;

        let url = self.base_url.join(src).ok()?;
        let filename = local_filename(&url)?;
        Some(ImageAsset { url, filename })
    }
}

/// Last path segment of the resolved image URL, decoded. Query and fragment
/// never make it in, and anything that could leave the image directory
/// (`.`, `..`, separators) means there is no usable image.
fn local_filename(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    let decoded = urlencoding::decode(segment).ok()?;
    match decoded.as_ref() {
        "" | "." | ".." => None,
        name if name.contains(['/', '\\']) => None,
        name => Some(name.to_string()),
    }
}

/// The cell right after the first label containing `designator`.
fn value_cell<'a>(
    labels: &[(String, ElementRef<'a>)],
    designator: &str,
) -> Result<ElementRef<'a>, GapReason> {
    let (_, th) = labels
        .iter()
        .find(|(text, _)| text.contains(designator))
        .ok_or(GapReason::MissingLabel)?;

    th.next_siblings()
        .find_map(ElementRef::wrap)
        .ok_or(GapReason::MissingValueCell)
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect()
}

fn icon_sources<'a>(cell: ElementRef<'a>) -> impl Iterator<Item = &'a str> + 'a {
    cell.select(&ICONS).filter_map(|img| img.value().attr("src"))
}

/// Record under construction. Starts out fully degraded; each labelled cell
/// that turns up overwrites its field.
struct Draft {
    name: String,
    set_code: String,
    rarity: String,
    card_type: CardType,
    level: i32,
    cost: Option<i32>,
    color: Color,
    power: i32,
    soul: u32,
    triggers: Vec<String>,
    text: String,
    traits: String,
}

impl Draft {
    fn new(variant: &Variant) -> Self {
        Self {
            name: String::new(),
            set_code: String::new(),
            rarity: String::new(),
            card_type: CardType::Unrecognized,
            level: NUMERIC_SENTINEL,
            cost: variant.reads_cost().then_some(NUMERIC_SENTINEL),
            color: Color::Unrecognized,
            power: NUMERIC_SENTINEL,
            soul: 0,
            triggers: Vec::new(),
            text: String::new(),
            traits: String::new(),
        }
    }

    fn fill(&mut self, field: Field, cell: ElementRef<'_>, gaps: &mut Vec<ExtractionGap>) {
        match field {
            Field::Name => self.name = first_line(&cell_text(cell)),
            Field::SetCode => self.set_code = cell_text(cell).trim().to_string(),
            Field::Rarity => self.rarity = cell_text(cell).trim().to_string(),
            Field::CardType => self.card_type = CardType::from_label(&cell_text(cell)),
            Field::Level => self.level = parse_leading_int(&cell_text(cell)),
            Field::Cost => self.cost = Some(parse_leading_int(&cell_text(cell))),
            Field::Power => self.power = parse_leading_int(&cell_text(cell)),
            Field::Text => self.text = cell_text(cell).trim().to_string(),
            Field::Traits => self.traits = cell_text(cell).trim().to_string(),
            Field::Soul => self.soul = cell.select(&ICONS).count() as u32,
            Field::Triggers => {
                self.triggers = icon_sources(cell)
                    .map(|src| filename_stem(src).to_string())
                    .collect();
            }
            Field::Color => match icon_sources(cell).next() {
                Some(src) => self.color = Color::from_token(filename_stem(src)),
                None => gaps.push(ExtractionGap { field: field.key(), reason: GapReason::MissingIcon }),
            },
        }
    }

    fn finish(self, image_url: String) -> CardRecord {
        let title_code = title_code(&self.set_code);
        CardRecord {
            name: self.name,
            set_code: self.set_code,
            title_code,
            rarity: self.rarity,
            card_type: self.card_type,
            level: self.level,
            cost: self.cost,
            color: self.color,
            power: self.power,
            soul: self.soul,
            triggers: self.triggers,
            text: self.text,
            traits: self.traits,
            image_url,
            game: GAME_TAG,
        }
    }
}
