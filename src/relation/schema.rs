//! Column types, schemas, and the compatibility rules between them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::tuple::{Atom, Tuple, FIELD_DELIMITER};
use crate::error::{MyrialError, Result};

/// Primitive column types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Signed 64-bit integer column.
    Int,
    /// UTF-8 string column.
    String,
}

impl ColumnType {
    fn parse_field(self, field: &str) -> Option<Atom> {
        match self {
            ColumnType::Int => field.trim().parse::<i64>().ok().map(Atom::Int),
            ColumnType::String => unescape_field(field).map(Atom::String),
        }
    }
}

/// Reverses the escaping applied by [`Tuple::to_delimited_string`].
fn unescape_field(field: &str) -> Option<String> {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            _ => return None,
        }
    }
    Some(out)
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => f.write_str("int"),
            ColumnType::String => f.write_str("string"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = MyrialError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int" => Ok(ColumnType::Int),
            "string" => Ok(ColumnType::String),
            other => Err(MyrialError::ColumnDefinition(format!(
                "unknown column type '{other}'"
            ))),
        }
    }
}

/// Named, typed column.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name; dotted when produced by a join (`Emp.name`).
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub ty: ColumnType,
}

impl Column {
    /// Creates a column.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.ty)
    }
}

impl FromStr for Column {
    type Err = MyrialError;

    /// Parses `name:type`.
    fn from_str(s: &str) -> Result<Self> {
        let Some((name, ty)) = s.rsplit_once(':') else {
            return Err(MyrialError::ColumnDefinition(format!(
                "'{s}' must be name:type"
            )));
        };
        Ok(Column::new(name.trim(), ty.trim().parse()?))
    }
}

/// Ordered list of uniquely named columns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema, rejecting repeated column names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(MyrialError::DuplicateColumn {
                    column: column.name.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Schema with no columns, carried by store mutations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a list of `name:type` strings.
    pub fn from_strings<S: AsRef<str>>(defs: &[S]) -> Result<Self> {
        let columns = defs
            .iter()
            .map(|def| def.as_ref().parse())
            .collect::<Result<Vec<Column>>>()?;
        Self::new(columns)
    }

    /// Columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Type of the column at `index`.
    pub fn column_type(&self, index: usize) -> Option<ColumnType> {
        self.columns.get(index).map(|c| c.ty)
    }

    /// Column types in order.
    pub fn types(&self) -> impl Iterator<Item = ColumnType> + '_ {
        self.columns.iter().map(|c| c.ty)
    }

    /// Equal arity and pairwise equal types; names are ignored.
    pub fn compatible(&self, other: &Schema) -> bool {
        self.len() == other.len() && self.types().eq(other.types())
    }

    /// Same check as [`Schema::compatible`], reported as an error.
    pub fn check_compatible(&self, other: &Schema) -> Result<()> {
        if self.compatible(other) {
            Ok(())
        } else {
            Err(MyrialError::SchemaCompatibility {
                left: self.to_string(),
                right: other.to_string(),
            })
        }
    }

    /// Position of the column called `name`.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| MyrialError::NoSuchColumn {
                column: name.to_owned(),
                schema: self.to_string(),
            })
    }

    /// Subset of the schema in the order `names` lists them.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Schema> {
        let columns = names
            .iter()
            .map(|name| {
                let idx = self.column_index(name.as_ref())?;
                Ok(self.columns[idx].clone())
            })
            .collect::<Result<Vec<_>>>()?;
        Schema::new(columns)
    }

    /// Concatenates `schemas`, renaming every column to `prefix.name`.
    ///
    /// Colliding prefixes produce a [`MyrialError::DuplicateColumn`].
    pub fn join(schemas: &[&Schema], prefixes: &[&str]) -> Result<Schema> {
        if schemas.len() != prefixes.len() {
            return Err(MyrialError::InvalidPlan(
                "schema join needs one prefix per schema",
            ));
        }
        let columns = schemas
            .iter()
            .zip(prefixes)
            .flat_map(|(schema, prefix)| {
                schema
                    .columns
                    .iter()
                    .map(move |c| Column::new(format!("{prefix}.{}", c.name), c.ty))
            })
            .collect();
        Schema::new(columns)
    }

    /// Checks arity and per-position atom types.
    pub fn validate_tuple(&self, tuple: &Tuple) -> Result<()> {
        if tuple.len() != self.len() {
            return Err(MyrialError::tuple_type(format!(
                "{tuple} has {} fields, schema {self} has {}",
                tuple.len(),
                self.len()
            )));
        }
        for (idx, (atom, column)) in tuple.atoms().iter().zip(&self.columns).enumerate() {
            if atom.column_type() != column.ty {
                return Err(MyrialError::tuple_type(format!(
                    "field {idx} of {tuple} is {}, column '{}' is {}",
                    atom.column_type(),
                    column.name,
                    column.ty
                )));
            }
        }
        Ok(())
    }

    /// Converts one tab-separated record into a tuple of this schema.
    pub fn tuple_from_string(&self, line: &str) -> Result<Tuple> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if fields.len() != self.len() {
            return Err(MyrialError::tuple_type(format!(
                "record has {} fields, schema {self} has {}",
                fields.len(),
                self.len()
            )));
        }
        let atoms = fields
            .iter()
            .zip(&self.columns)
            .map(|(field, column)| {
                column.ty.parse_field(field).ok_or_else(|| {
                    MyrialError::tuple_type(format!(
                        "'{field}' is not a valid {} for column '{}'",
                        column.ty, column.name
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Tuple::new(atoms))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{column}")?;
        }
        f.write_str(")")
    }
}
