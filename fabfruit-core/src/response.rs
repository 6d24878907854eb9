use std::collections::HashMap;

use tracing::warn;

use crate::stimulus::Direction;

/// The single key pressed, or `None` when nothing or more than one key came
/// back. Simultaneous presses count as no response.
pub fn first_key<S: AsRef<str>>(keys: &[S]) -> Option<&str> {
    match keys {
        [] => None,
        [only] => Some(only.as_ref()),
        many => {
            let pressed: Vec<&str> = many.iter().map(AsRef::as_ref).collect();
            warn!(?pressed, "more than one key pushed, considering no push");
            None
        }
    }
}

/// Which keys open a box to which side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    keys: HashMap<String, Direction>,
}

impl Default for KeyMap {
    /// Arrow keys on a keyboard, thumb/index fingers on a button glove.
    fn default() -> Self {
        Self::new([
            ("left", Direction::Left),
            ("right", Direction::Right),
            ("1", Direction::Left),
            ("2", Direction::Right),
        ])
    }
}

impl KeyMap {
    pub fn new<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Direction)>) -> Self {
        Self {
            keys: pairs.into_iter().map(|(k, d)| (k.into(), d)).collect(),
        }
    }

    pub fn direction(&self, key: &str) -> Option<Direction> {
        self.keys.get(key).copied()
    }

    /// Reduce a key list to a choice. Ambiguous and unmapped keys are no
    /// choice.
    pub fn choice<S: AsRef<str>>(&self, keys: &[S]) -> Option<Direction> {
        first_key(keys).and_then(|key| self.direction(key))
    }

    /// Accepted keys, sorted for stable prompts.
    pub fn accepted(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_key_passes_through() {
        assert_eq!(first_key(&["left"]), Some("left"));
        assert_eq!(first_key::<&str>(&[]), None);
    }

    #[test]
    fn two_keys_are_no_response() {
        assert_eq!(first_key(&["left", "right"]), None);
        assert_eq!(KeyMap::default().choice(&["1", "2"]), None);
    }

    #[test]
    fn default_keys() {
        let keys = KeyMap::default();
        assert_eq!(keys.choice(&["1"]), Some(Direction::Left));
        assert_eq!(keys.choice(&["right"]), Some(Direction::Right));
        assert_eq!(keys.choice(&["space"]), None);
        assert_eq!(keys.accepted(), vec!["1", "2", "left", "right"]);
    }
}
