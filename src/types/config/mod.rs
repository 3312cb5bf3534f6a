//! Numeric configuration newtypes

/// Declare a newtype over a `NonZero*` integer.
///
/// Serde goes through `TryFrom<$primitive>`, so a zero in a config file is
/// rejected with `"<Type> cannot be 0"` when the file is loaded.
macro_rules! nonzero_newtype {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($nonzero:ty : $primitive:ty as $serde_repr:literal);
    ) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = $serde_repr, into = $serde_repr)]
        $vis struct $name($nonzero);

        impl $name {
            /// `None` for zero
            #[must_use]
            pub const fn new(value: $primitive) -> Option<Self> {
                match <$nonzero>::new(value) {
                    Some(nz) => Some(Self(nz)),
                    None => None,
                }
            }

            #[must_use]
            #[inline]
            pub const fn get(&self) -> $primitive {
                self.0.get()
            }
        }

        impl TryFrom<$primitive> for $name {
            type Error = crate::types::ValidationError;

            fn try_from(value: $primitive) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(crate::types::ValidationError::Zero(stringify!($name)))
            }
        }

        impl From<$name> for $primitive {
            fn from(val: $name) -> Self {
                val.get()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

pub mod duration;
mod limits;
mod network;

pub use duration::duration_serde;
pub use limits::MaxConnections;
pub use network::Port;
