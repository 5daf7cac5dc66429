use std::fmt;

use crate::token::TYPE_NAMES;

/// The closed set of primitive types. There is no implicit conversion between
/// any two of them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// 32-bit signed integer.
    Int,
    /// 32-bit IEEE float.
    Float,
    /// 1-bit boolean.
    Bool,
}

impl Ty {
    pub const ALL: &'static [Ty] = &[Ty::Int, Ty::Float, Ty::Bool];

    pub fn from_name(name: &str) -> Option<Ty> {
        TYPE_NAMES.get(name).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Ty::Int => "int",
            Ty::Float => "float",
            Ty::Bool => "bool",
        }
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Ty::Int | Ty::Float)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_the_table() {
        for &ty in Ty::ALL {
            assert_eq!(Ty::from_name(ty.name()), Some(ty));
        }
        assert_eq!(Ty::from_name("string"), None);
    }

    #[test]
    fn test_only_int_and_float_are_numeric() {
        assert!(Ty::Int.is_numeric());
        assert!(Ty::Float.is_numeric());
        assert!(!Ty::Bool.is_numeric());
    }
}
