//! Closed value sets accepted by the NewsAPI query parameters.
//!
//! Each enum carries its wire string, so it can be sent as a query value,
//! parsed from CLI/config input, and (de)serialized with serde.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned by `FromStr` when a string is not one of the known wire values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The value as sent on the wire.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_enum! {
    /// Source category filter for `/sources`.
    Category, "category" {
        Business => "business",
        Entertainment => "entertainment",
        General => "general",
        Health => "health",
        Science => "science",
        Sports => "sports",
        Technology => "technology",
    }
}

wire_enum! {
    /// Two-letter ISO-639-1 language codes NewsAPI indexes.
    Language, "language" {
        Arabic => "ar",
        German => "de",
        English => "en",
        Spanish => "es",
        French => "fr",
        Hebrew => "he",
        Italian => "it",
        Dutch => "nl",
        Norwegian => "no",
        Portuguese => "pt",
        Russian => "ru",
        NorthernSami => "se",
        /// Urdu, as NewsAPI spells it.
        Urdu => "ud",
        Chinese => "zh",
    }
}

wire_enum! {
    /// Result ordering for `/everything`.
    SortBy, "sort order" {
        Relevancy => "relevancy",
        Popularity => "popularity",
        PublishedAt => "publishedAt",
    }
}
