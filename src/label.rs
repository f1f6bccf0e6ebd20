use std::collections::BTreeSet;

use itertools::Itertools;

use crate::Show;

/// The label of an arc. A label either names a single symbol, a whole (natural) class of
/// symbols, or it is the fallback [`ArcLabel::Other`], which matches every symbol that no other
/// arc leaving the same state is labelled with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArcLabel {
    /// A single symbol.
    Symbol(char),
    /// A set of symbols.
    Class(BTreeSet<char>),
    /// Every symbol that is not otherwise listed.
    Other,
}

impl ArcLabel {
    /// Creates a class label from the symbols of `symbols`.
    pub fn class(symbols: &str) -> Self {
        ArcLabel::Class(symbols.chars().collect())
    }

    /// Number of symbols the label stands for, where [`ArcLabel::Other`] is counted as if it
    /// matched the whole alphabet of size `alphabet_size`.
    pub fn size(&self, alphabet_size: usize) -> usize {
        match self {
            ArcLabel::Symbol(_) => 1,
            ArcLabel::Class(class) => class.len(),
            ArcLabel::Other => alphabet_size,
        }
    }

    /// Returns a symbol matched by this label, if the label determines one on its own.
    pub fn representative(&self) -> Option<char> {
        match self {
            ArcLabel::Symbol(sym) => Some(*sym),
            ArcLabel::Class(class) => class.iter().next().copied(),
            ArcLabel::Other => None,
        }
    }

    /// Returns true if `symbol` is explicitly named by the label.
    pub fn names(&self, symbol: char) -> bool {
        match self {
            ArcLabel::Symbol(sym) => *sym == symbol,
            ArcLabel::Class(class) => class.contains(&symbol),
            ArcLabel::Other => false,
        }
    }
}

impl From<char> for ArcLabel {
    fn from(value: char) -> Self {
        ArcLabel::Symbol(value)
    }
}

impl From<BTreeSet<char>> for ArcLabel {
    fn from(value: BTreeSet<char>) -> Self {
        ArcLabel::Class(value)
    }
}

impl Show for ArcLabel {
    fn show(&self) -> String {
        match self {
            ArcLabel::Symbol(sym) => sym.to_string(),
            ArcLabel::Class(class) => format!("[{}]", class.iter().join("")),
            ArcLabel::Other => "_other".to_string(),
        }
    }
}

/// The label of an arc in a [`crate::automaton::CategoryAutomaton`]. Besides single symbols and the
/// fallback, a label may be a set of category names, which matches every alphabet symbol that
/// belongs to all of the named categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryLabel {
    /// A single symbol.
    Symbol(char),
    /// The intersection of the named categories.
    Categories(BTreeSet<String>),
    /// Every symbol that is not otherwise listed.
    Other,
}

impl CategoryLabel {
    /// Creates a label denoting the intersection of the given categories.
    pub fn categories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CategoryLabel::Categories(names.into_iter().map(Into::into).collect())
    }
}

impl From<char> for CategoryLabel {
    fn from(value: char) -> Self {
        CategoryLabel::Symbol(value)
    }
}

impl Show for CategoryLabel {
    fn show(&self) -> String {
        match self {
            CategoryLabel::Symbol(sym) => sym.to_string(),
            CategoryLabel::Categories(names) => format!("[{}]", names.iter().join(",")),
            CategoryLabel::Other => "_other".to_string(),
        }
    }
}
