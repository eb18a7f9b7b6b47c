//! Macro for strongly-typed identifier newtypes.
//!
//! Identifiers are opaque, non-empty strings. The generated type serializes
//! transparently and rejects empty strings on deserialize.

/// Define a non-empty string identifier.
///
/// Generates the struct plus `try_new`, `as_str`, `short`, `Display`,
/// `AsRef<str>`, `Borrow<str>`, `TryFrom<String>`, and `PartialEq<&str>`.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $Name::try_new(s).ok_or_else(|| {
                    serde::de::Error::custom(concat!(stringify!($Name), " must not be empty"))
                })
            }
        }

        impl $Name {
            /// Wrap a string, returning `None` if it is empty.
            pub fn try_new(id: impl Into<String>) -> Option<Self> {
                let s = id.into();
                if s.is_empty() { None } else { Some(Self(s)) }
            }

            /// Borrow the identifier text.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Leading `len` characters, for file names and log lines.
            pub fn short(&self, len: usize) -> &str {
                match self.0.char_indices().nth(len) {
                    Some((idx, _)) => &self.0[..idx],
                    None => &self.0,
                }
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str { &self.0 }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl TryFrom<String> for $Name {
            type Error = &'static str;
            fn try_from(s: String) -> Result<Self, Self::Error> {
                $Name::try_new(s).ok_or(concat!(stringify!($Name), " must not be empty"))
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool { self.0 == *other }
        }
    };
}

pub(crate) use define_id;
