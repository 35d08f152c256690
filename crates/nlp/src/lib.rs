pub mod clean;
pub mod entities;
pub mod error;
pub mod fields;
pub mod fuzzy;
pub mod normalize;
pub mod spelling;
pub mod validate;

pub use clean::clean_text;
pub use entities::{Entity, EntityLabel, EntityRecognizer, MockEntityRecognizer, RuleBasedRecognizer};
pub use error::NlpError;
pub use fields::FieldExtractor;
pub use fuzzy::{FuzzyMatcher, IndelMatcher};
pub use normalize::{normalize_organization, NormalizedOrganization, Vocabulary};
pub use spelling::{CachedCorrector, IdentityCorrector, SpellingCorrector, VocabularyCorrector};
pub use validate::FieldValidator;
