/// Which channel a streamed fragment belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FragmentKind {
    /// Answer text; becomes part of the returned summary.
    MainContent,
    /// Extended-reasoning text; shown live but never returned.
    ReasoningContent,
}

/// One piece of generated text taken from a single SSE event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeltaFragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl DeltaFragment {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::MainContent,
            text: text.into(),
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::ReasoningContent,
            text: text.into(),
        }
    }

    pub fn is_reasoning(&self) -> bool {
        self.kind == FragmentKind::ReasoningContent
    }
}
