//! Publication-type allow-list.

/// Publication types that qualify a paper for the digest
pub const PUBMED_PUBTYPES: &[&str] = &[
    "Journal Article",
    "Books and Documents",
    "Clinical Trial",
    "Meta-Analysis",
    "Randomized Controlled Trial",
    "Review",
    "Systematic Review",
];

/// True if any of `pubtypes` is on the allow-list
///
/// Matching is exact and case-sensitive. An empty list never qualifies.
pub fn check_pubtype<S: AsRef<str>>(pubtypes: &[S]) -> bool {
    pubtypes
        .iter()
        .any(|pubtype| PUBMED_PUBTYPES.contains(&pubtype.as_ref()))
}
