use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::CoreError;
use crate::roster::BoxId;

/// Side a box opens from, or the side a participant picked.
///
/// "No choice" is `Option::<Direction>::None` rather than a third variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Left, Direction::Right];

    /// Single letter used in box names (`L0`) and the `cor_side` column.
    pub fn code(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Left => "Left",
            Direction::Right => "Right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    /// Accepts `Left`, `Right` and the older `Direction.Left` spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches("Direction.") {
            "Left" => Ok(Direction::Left),
            "Right" => Ok(Direction::Right),
            other => Err(CoreError::UnknownLabel {
                kind: "direction",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether a fruit is the label on the outside of a box or the one inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Stim,
    Outcome,
}

/// A fruit (or veggie, or animal) pictured on or inside a box.
///
/// The owning box is held as an index into the [`Roster`](crate::Roster)
/// arena, never as a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fruit {
    pub name: String,
    pub image: PathBuf,
    pub role: Role,
    pub owner: BoxId,
}

impl Fruit {
    pub fn new(name: impl Into<String>, role: Role, owner: BoxId) -> Self {
        let name = name.into();
        let image = PathBuf::from(format!("{name}.png"));
        Self {
            name,
            image,
            role,
            owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for dir in Direction::ALL {
            assert_eq!(Direction::from_code(dir.code()), Some(dir));
        }
        assert_eq!(Direction::from_code('X'), None);
    }

    #[test]
    fn parses_old_enum_spelling() {
        assert_eq!("Direction.Left".parse::<Direction>().unwrap(), Direction::Left);
        assert_eq!("Right".parse::<Direction>().unwrap(), Direction::Right);
        assert!("None".parse::<Direction>().is_err());
    }

    #[test]
    fn fruit_image_follows_name() {
        let fruit = Fruit::new("apple", Role::Stim, BoxId(0));
        assert_eq!(fruit.image, PathBuf::from("apple.png"));
    }
}
