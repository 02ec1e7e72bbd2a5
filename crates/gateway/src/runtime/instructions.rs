//! Per-turn instruction rendering.
//!
//! The request's optional `context` field selects one of a closed set of
//! coaching modes; each mode renders to the instruction text sent with the
//! job. Unrecognized values fall back to free-form rather than erroring,
//! so old clients keep working when the set grows.

/// Closed set of conversation contexts a client can request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextKind {
    /// Client is working through the guided exercise sequence.
    StructuredSequence,
    /// Client is on a specific named path; the payload is the path name.
    PathContext(String),
    /// No particular structure — open-ended coaching.
    FreeForm,
}

impl ContextKind {
    /// Parse the raw request field. Absent, empty, and unrecognized values
    /// all map to [`ContextKind::FreeForm`].
    pub fn from_request_field(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::FreeForm,
            Some("sequence") => Self::StructuredSequence,
            Some(other) => match other.strip_prefix("path:") {
                Some(path) if !path.trim().is_empty() => {
                    Self::PathContext(path.trim().to_owned())
                }
                _ => Self::FreeForm,
            },
        }
    }
}

/// Render the instruction text for a turn. The match is exhaustive on
/// purpose: adding a variant must force a rendering decision here.
pub fn render_instructions(kind: &ContextKind) -> String {
    match kind {
        ContextKind::StructuredSequence => {
            "The user is progressing through the structured exercise sequence. \
             Keep the reply focused on the current step, acknowledge what they \
             just shared, and guide them to the next step when they are ready."
                .to_owned()
        }
        ContextKind::PathContext(path) => format!(
            "The user is working on the \"{path}\" path. Anchor the reply in \
             that path's themes and refer back to it where it helps."
        ),
        ContextKind::FreeForm => {
            "Respond as a supportive coach. Meet the user where they are and \
             keep the reply conversational and concrete."
                .to_owned()
        }
    }
}
