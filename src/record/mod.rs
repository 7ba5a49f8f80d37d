//! Record types produced by the harvest
//!
//! - [`StubRecord`]: what a listing page says about a book
//! - [`DetailFields`]: what the book's own page adds
//! - [`EnrichedRecord`]: the two merged, additively
//! - [`CommittedRecord`]: an enriched record with its global sequence number

mod field;
mod identity;

pub use field::{Field, UNSET_SENTINEL};
pub use identity::{normalize, IdentityKey};

use serde::{Deserialize, Serialize};

/// Partial record extracted from a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubRecord {
    pub title: String,
    pub subtitle: Field,
    pub author: Field,
    pub category: String,
    pub rating: Field,
    pub rating_count: Field,
    pub published: Field,
    pub url: Field,
}

impl StubRecord {
    /// Creates a stub with every optional field unset
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: Field::Unset,
            author: Field::Unset,
            category: category.into(),
            rating: Field::Unset,
            rating_count: Field::Unset,
            published: Field::Unset,
            url: Field::Unset,
        }
    }

    pub fn identity(&self) -> IdentityKey {
        IdentityKey::from_stub(self)
    }
}

/// Fields read from a record's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub synopsis: Field,
    pub image: Field,
    pub genres: Vec<String>,
    pub author_bio: Field,
    /// Only used when the listing did not carry a rating
    pub rating: Field,
}

/// A stub with its detail fields merged in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub stub: StubRecord,
    pub synopsis: Field,
    pub image: Field,
    pub genres: Vec<String>,
    pub author_bio: Field,
}

impl From<StubRecord> for EnrichedRecord {
    fn from(stub: StubRecord) -> Self {
        Self {
            stub,
            synopsis: Field::Unset,
            image: Field::Unset,
            genres: Vec::new(),
            author_bio: Field::Unset,
        }
    }
}

impl EnrichedRecord {
    /// Merges detail fields without replacing anything already known
    ///
    /// Returns the number of fields that were filled.
    pub fn merge_details(&mut self, details: DetailFields) -> usize {
        let mut filled = 0;
        filled += self.synopsis.fill_from(details.synopsis) as usize;
        filled += self.image.fill_from(details.image) as usize;
        filled += self.author_bio.fill_from(details.author_bio) as usize;
        filled += self.stub.rating.fill_from(details.rating) as usize;
        if self.genres.is_empty() && !details.genres.is_empty() {
            self.genres = details.genres;
            filled += 1;
        }
        filled
    }

    pub fn identity(&self) -> IdentityKey {
        self.stub.identity()
    }
}

/// An enriched record as written to checkpoints and the final artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedRecord {
    /// Global sequence number, 0-based, assigned at commit time
    pub index: u64,
    pub unique_id: String,
    pub identity: IdentityKey,
    #[serde(flatten)]
    pub record: EnrichedRecord,
}

impl CommittedRecord {
    pub fn new(index: u64, identity: IdentityKey, record: EnrichedRecord) -> Self {
        Self {
            index,
            unique_id: identity.unique_id(),
            identity,
            record,
        }
    }
}
