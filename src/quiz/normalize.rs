/// Canonicalize text before comparing answers.
///
/// Lower-cases the input, drops everything that is not an ASCII letter, an
/// ASCII digit or whitespace, collapses whitespace runs into a single space
/// and trims both ends. Accented letters are dropped, not folded.
#[must_use]
pub fn normalize(text: &str) -> String {
    let kept: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
