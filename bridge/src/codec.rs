//! Scenario name transliteration
//!
//! Scenario names must look like words to pass the cloud's validation, so a
//! station's hex-and-dash id is spelled with Cyrillic letters behind a fixed
//! marker. Characters outside the alphabet pass through unchanged.

const SOURCE: [char; 17] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', '-',
];

const TARGET: [char; 17] = [
    'о', 'е', 'а', 'и', 'н', 'т', 'с', 'р', 'в', 'л', 'к', 'м', 'д', 'п', 'у', 'я', 'ы',
];

/// Marker prepended to every encoded name
pub const NAME_PREFIX: &str = "осис ";

fn translate(c: char, from: &[char; 17], to: &[char; 17]) -> char {
    from.iter()
        .position(|&f| f == c)
        .map_or(c, |i| to[i])
}

/// Encode an id into a scenario name
pub fn encode(id: &str) -> String {
    let mut name = String::from(NAME_PREFIX);
    name.extend(id.to_lowercase().chars().map(|c| translate(c, &SOURCE, &TARGET)));
    name
}

/// The encoded id without the marker, used as the voice trigger phrase
pub fn encode_phrase(id: &str) -> String {
    strip_prefix(&encode(id)).to_string()
}

/// Decode a scenario name back into an id
///
/// The first five characters are dropped whatever they are.
pub fn decode(name: &str) -> String {
    strip_prefix(name)
        .chars()
        .map(|c| translate(c, &TARGET, &SOURCE))
        .collect()
}

fn strip_prefix(name: &str) -> &str {
    let prefix_len = NAME_PREFIX.chars().count();
    match name.char_indices().nth(prefix_len) {
        Some((offset, _)) => &name[offset..],
        None => "",
    }
}
