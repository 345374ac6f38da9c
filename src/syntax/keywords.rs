//! Reserved words of the program language.
//!
//! Keywords are upper-case and matched exactly; `load` is an identifier.

/// Looks up an exact-case keyword.
pub fn keyword_from_str(s: &str) -> Option<Keyword> {
    KEYWORD_STRINGS
        .binary_search(&s)
        .ok()
        .map(|idx| ALL_KEYWORDS[idx])
}

macro_rules! define_keywords {
    ($($ident:ident),*) => {
        /// Reserved word.
        #[allow(missing_docs)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($ident),*
        }

        /// Every keyword, sorted by spelling.
        pub const ALL_KEYWORDS: &[Keyword] = &[
            $(Keyword::$ident),*
        ];

        const KEYWORD_STRINGS: &[&str] = &[
            $(stringify!($ident)),*
        ];

        impl Keyword {
            /// Spelling of the keyword.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Keyword::$ident => stringify!($ident)),*
                }
            }
        }
    };
}

// Must stay sorted for the binary search.
#[rustfmt::skip]
define_keywords!(
    AS,
    BY,
    DESCRIBE,
    DIFF,
    DISTINCT,
    DO,
    DUMP,
    EMIT,
    EXPLAIN,
    FOREACH,
    INTERSECT,
    JOIN,
    LIMIT,
    LOAD,
    TABLE,
    UNION,
    WHILE
);
