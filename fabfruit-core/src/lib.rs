pub mod error;
pub mod phase;
pub mod response;
pub mod roster;
pub mod score;
pub mod stimulus;
pub mod trial;

pub use error::CoreError;
pub use phase::Phase;
pub use response::{KeyMap, first_key};
pub use roster::{BoxId, BoxLine, DevalMap, DevaluationTable, FruitBox, Roster};
pub use score::{Score, score, score_raw};
pub use stimulus::{Direction, Fruit, Role};
pub use trial::{TrialKind, TrialRecord};
