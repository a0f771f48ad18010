use tracing::debug;

use super::media_type::{MediaType, MediaTypeParseError};

/// Parsed `Accept` header sorted into client preference order.
///
/// Entries are ordered by descending quality, then by descending
/// specificity; entries that tie on both keep their header order.
/// Entries with `q=0` are retained (they act as explicit exclusions).
#[derive(Debug, Clone, PartialEq)]
pub struct Accept {
    entries: Vec<MediaType>,
    explicit: bool,
}

impl Accept {
    /// Parse one or more `Accept` header values. A missing or blank header
    /// means `*/*`.
    pub fn parse<'a, I>(values: I) -> Result<Self, MediaTypeParseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut entries = Vec::new();
        for value in values {
            for item in value.split(',') {
                if item.trim().is_empty() {
                    continue;
                }
                entries.push(MediaType::parse(item)?);
            }
        }
        if entries.is_empty() {
            return Ok(Self::any());
        }
        entries.sort_by(|a, b| {
            b.quality()
                .partial_cmp(&a.quality())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.compare_specificity(a))
        });
        debug!(accept = ?entries, "Parsed Accept header");
        Ok(Self {
            entries,
            explicit: true,
        })
    }

    /// `*/*`, the value of an absent header.
    #[must_use]
    pub fn any() -> Self {
        Self {
            entries: vec![MediaType::wildcard()],
            explicit: false,
        }
    }

    /// All entries in preference order, including `q=0` exclusions.
    #[must_use]
    pub fn media_types(&self) -> &[MediaType] {
        &self.entries
    }

    /// True when the header was sent and says more than `*/*`.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.explicit && !(self.entries.len() == 1 && self.entries[0].is_wildcard_type())
    }

    /// Split into (`q=0` exclusions, acceptable entries).
    #[must_use]
    pub fn partition(&self) -> (Vec<&MediaType>, Vec<&MediaType>) {
        self.entries.iter().partition(|m| is_denied(m))
    }
}

/// An entry is a hard exclusion when it carries an explicit `q` of zero.
fn is_denied(media_type: &MediaType) -> bool {
    media_type
        .param("q")
        .and_then(|q| q.trim().parse::<f64>().ok())
        .map(|q| q == 0.0)
        .unwrap_or(false)
}
