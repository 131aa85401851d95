//! # Scheduler Dimensions
//!
//! Every worker agent advertises its device as a flat map from dimension key
//! to an ordered list of values. This module projects a structured
//! [`DeviceRecord`] into that form, reverts a dimension map back into a
//! record, and aggregates the dimensions of several devices into the
//! dimensions of one scheduling unit.
//!
//! ## Rules shared by every projection
//!
//! - No value is the empty string and no key maps to an empty list.
//! - Values under one key are unique; the first occurrence wins.
//! - Enum values render in their canonical upper-case form, except hardware
//!   states which drop their `HARDWARE_` prefix.

use std::collections::{BTreeMap, HashSet};

pub mod convert;
pub mod labels;
pub mod state;
pub mod unit;

#[cfg(test)]
mod convert_proptest;

pub use convert::{project, revert};
pub use labels::DeviceRecord;
pub use state::DutState;
pub use unit::{scheduling_unit_dimensions, SchedulingUnit};

/// Dimension key to ordered values.
pub type Dimensions = BTreeMap<String, Vec<String>>;

/// Value used for boolean dimensions that are set.
pub const TRUE: &str = "True";

/// An enum whose values have one canonical string form.
pub trait LabelEnum: Copy + Eq + Sized + 'static {
    /// Every value, the unknown one first.
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    /// The value that means "not set" and is never projected.
    fn is_unknown(&self) -> bool;

    fn parse(text: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|value| value.as_str() == text)
    }
}

/// Declares a [`LabelEnum`] with serde support through the canonical names.
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $unknown:ident => $unknown_text:literal,
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            #[default]
            $unknown,
            $($variant),+
        }

        impl $crate::dimensions::LabelEnum for $name {
            const ALL: &'static [Self] = &[Self::$unknown, $(Self::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    Self::$unknown => $unknown_text,
                    $(Self::$variant => $text),+
                }
            }

            fn is_unknown(&self) -> bool {
                matches!(self, Self::$unknown)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::dimensions::LabelEnum::as_str(self))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::dimensions::LabelEnum::as_str(self))
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let text = <String as serde::Deserialize>::deserialize(deserializer)?;
                <Self as $crate::dimensions::LabelEnum>::parse(&text).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} value {:?}",
                        stringify!($name),
                        text
                    ))
                })
            }
        }
    };
}
pub(crate) use label_enum;

/// Drop empty values, repeated values and empty keys.
pub fn sanitize(dims: &mut Dimensions) {
    dims.retain(|key, values| {
        let mut seen = HashSet::new();
        values.retain(|value| !value.is_empty() && seen.insert(value.clone()));
        !key.is_empty() && !values.is_empty()
    });
}
