use super::normalize::normalize;

/// Decide whether a spoken transcript answers a question.
///
/// True when the normalized transcript contains at least one normalized
/// keyword as a contiguous substring. An empty normalized transcript is
/// always incorrect, and keywords that normalize to nothing never match.
#[must_use]
pub fn is_correct<S: AsRef<str>>(spoken: &str, keywords: &[S]) -> bool {
    let spoken = normalize(spoken);
    if spoken.is_empty() {
        return false;
    }

    keywords.iter().any(|keyword| {
        let keyword = normalize(keyword.as_ref());
        !keyword.is_empty() && spoken.contains(&keyword)
    })
}
