// =============================================================================
// extractor/normalize.rs - TURNING CELL TEXT INTO NUMBERS AND TOKENS
// =============================================================================
//
// Small, pure string rules. Every one of them is reproduced exactly from how
// the cardlist has always been scraped, because downstream consumers already
// depend on the sentinels.
// =============================================================================

/// Value for a numeric field that didn't contain a number.
pub const NUMERIC_SENTINEL: i32 = -1;

/// Parse the leading integer of a trimmed cell: optional sign, then digits.
/// Anything after the digit run is ignored ("2 (two)" is 2). No digits at the
/// start, or a value that doesn't fit, gives the sentinel.
pub fn parse_leading_int(raw: &str) -> i32 {
    let text = raw.trim();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return NUMERIC_SENTINEL;
    }

    let digits = &rest[..digits_len];
    let parsed = if negative {
        format!("-{digits}").parse::<i32>()
    } else {
        digits.parse::<i32>()
    };
    parsed.unwrap_or(NUMERIC_SENTINEL)
}

/// First line of the cell text, trimmed. Card names come with the kana reading
/// on a second line that we don't want.
pub fn first_line(raw: &str) -> String {
    raw.trim().lines().next().unwrap_or("").trim().to_string()
}

/// `.../cardlist/_partimages/blue.gif` -> `blue`.
///
/// Takes the segment after the last `/` and cuts at the first `.`, so
/// `soul.v2.png` gives `soul`.
pub fn filename_stem(path: &str) -> &str {
    let file = filename(path);
    file.split('.').next().unwrap_or(file)
}

/// Segment after the last `/`.
pub fn filename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// `TSK/S70-E001` -> `TSK`. No separator means the whole code is the title.
pub fn title_code(set_code: &str) -> String {
    set_code.split('/').next().unwrap_or(set_code).to_string()
}
