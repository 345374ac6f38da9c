//! Typed atoms and positional tuples.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::schema::ColumnType;

/// Field separator used by relation files and [`Tuple::to_delimited_string`].
pub const FIELD_DELIMITER: char = '\t';

/// Single typed value stored in a tuple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Atom {
    /// Signed 64-bit integer.
    Int(i64),
    /// UTF-8 string.
    String(String),
}

impl Atom {
    /// Returns the column type this atom satisfies.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Atom::Int(_) => ColumnType::Int,
            Atom::String(_) => ColumnType::String,
        }
    }

    fn write_delimited(&self, out: &mut String) {
        match self {
            Atom::Int(v) => out.push_str(&v.to_string()),
            Atom::String(s) => {
                for c in s.chars() {
                    match c {
                        '\\' => out.push_str("\\\\"),
                        '\t' => out.push_str("\\t"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        c => out.push(c),
                    }
                }
            }
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Int(v) => write!(f, "{v}"),
            Atom::String(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<i64> for Atom {
    fn from(value: i64) -> Self {
        Atom::Int(value)
    }
}

impl From<i32> for Atom {
    fn from(value: i32) -> Self {
        Atom::Int(i64::from(value))
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::String(value.to_owned())
    }
}

impl From<String> for Atom {
    fn from(value: String) -> Self {
        Atom::String(value)
    }
}

/// Ordered sequence of atoms aligned positionally with a schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuple(Vec<Atom>);

impl Tuple {
    /// Wraps a vector of atoms.
    pub fn new(atoms: Vec<Atom>) -> Self {
        Self(atoms)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tuple has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field at `index`, if present.
    pub fn get(&self, index: usize) -> Option<&Atom> {
        self.0.get(index)
    }

    /// All fields in order.
    pub fn atoms(&self) -> &[Atom] {
        &self.0
    }

    /// Concatenates `self` followed by `other`.
    pub fn concat(&self, other: &Tuple) -> Tuple {
        let mut atoms = Vec::with_capacity(self.len() + other.len());
        atoms.extend_from_slice(&self.0);
        atoms.extend_from_slice(&other.0);
        Tuple(atoms)
    }

    /// Builds a tuple from the fields at `indexes`, in that order.
    ///
    /// Returns `None` when any index is out of range.
    pub fn select(&self, indexes: &[usize]) -> Option<Tuple> {
        indexes
            .iter()
            .map(|&idx| self.0.get(idx).cloned())
            .collect::<Option<Vec<_>>>()
            .map(Tuple)
    }

    /// Renders the tuple as tab-separated text, the inverse of
    /// [`Schema::tuple_from_string`](super::Schema::tuple_from_string).
    ///
    /// Backslashes, tabs, and line breaks inside strings are written as
    /// `\\`, `\t`, `\n`, and `\r`.
    pub fn to_delimited_string(&self) -> String {
        let mut out = String::new();
        for (idx, atom) in self.0.iter().enumerate() {
            if idx > 0 {
                out.push(FIELD_DELIMITER);
            }
            atom.write_delimited(&mut out);
        }
        out
    }
}

impl From<Vec<Atom>> for Tuple {
    fn from(atoms: Vec<Atom>) -> Self {
        Tuple(atoms)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, atom) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{atom}")?;
        }
        f.write_str(")")
    }
}

/// Builds a [`Tuple`] from values convertible into [`Atom`].
///
/// ```
/// let t = myrial::tuple![1, "Bill Howe", 25000];
/// assert_eq!(t.len(), 3);
/// ```
#[macro_export]
macro_rules! tuple {
    ($($value:expr),* $(,)?) => {
        $crate::relation::Tuple::new(vec![$($crate::relation::Atom::from($value)),*])
    };
}
