/// Per-call options for [`BuzzApi::post_with`](crate::BuzzApi::post_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct PostOptions {
    /// Follow paging cursors and return every page's data concatenated.
    pub paged: bool,
}

impl PostOptions {
    /// Options for a paged call.
    pub fn paged() -> Self {
        Self { paged: true }
    }
}
