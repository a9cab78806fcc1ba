/// A remote function surfaced by one of the discovery sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTarget {
    pub name: String,
    pub description: Option<String>,
}

/// Outcome of evaluating a discovery marker against one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateDecision {
    Keep { description: Option<String> },
    Skip,
}

/// Interprets the shared discovery marker value: `"false"` opts the
/// candidate out, `"true"` opts it in, and any other value opts it in with
/// that value as its description. The true/false comparison is ASCII
/// case-insensitive.
pub fn classify_marker(value: &str) -> CandidateDecision {
    if value.eq_ignore_ascii_case("false") {
        return CandidateDecision::Skip;
    }
    if value.eq_ignore_ascii_case("true") {
        return CandidateDecision::Keep { description: None };
    }
    CandidateDecision::Keep {
        description: Some(value.to_string()),
    }
}
