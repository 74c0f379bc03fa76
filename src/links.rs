use std::collections::BTreeSet;

/// Collects whitespace-separated tokens containing `marker` from every text.
///
/// Tokens are kept verbatim: no URL validation happens here, so a malformed
/// token surfaces later as a fetch failure for that one link.
pub fn extract_links<I, S>(texts: I, marker: &str) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut links = BTreeSet::new();
    for text in texts {
        links.extend(
            text.as_ref()
                .split_whitespace()
                .filter(|token| token.contains(marker))
                .map(str::to_owned),
        );
    }
    links
}

/// Links present in `candidates` but not yet in `known`.
pub fn new_links(candidates: &BTreeSet<String>, known: &BTreeSet<String>) -> Vec<String> {
    candidates.difference(known).cloned().collect()
}
