//! Mapping between application types and the engine's wire types.
//!
//! Every binder is generic over a [`Convert`] type and delegates all
//! wire-format decisions here. Add support for your own type by implementing
//! the trait:
//!
//! ```rust
//! use sqlite_binder::convert::Convert;
//! use sqlite_binder::DbError;
//!
//! struct Cents(i64);
//!
//! impl Convert for Cents {
//!     type Base = i64;
//!     fn from_base(base: i64) -> Result<Self, DbError> {
//!         Ok(Cents(base))
//!     }
//!     fn to_base(&self) -> i64 {
//!         self.0
//!     }
//! }
//! ```

use chrono::{DateTime, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::error::DbError;
use crate::types::{BaseType, Text16};

/// Pure, stateless mapping between `Self` and a wire type.
pub trait Convert: Sized {
    /// The wire type this application type travels as.
    type Base: BaseType;

    /// Build the application value from a column value.
    ///
    /// # Errors
    /// Returns [`DbError::Conversion`] when the wire value cannot represent `Self`.
    fn from_base(base: Self::Base) -> Result<Self, DbError>;

    /// Produce the wire value to bind for a parameter.
    fn to_base(&self) -> Self::Base;
}

macro_rules! convert_identity {
    ($($t:ty),* $(,)?) => {
        $(
            impl Convert for $t {
                type Base = $t;

                fn from_base(base: $t) -> Result<Self, DbError> {
                    Ok(base)
                }

                fn to_base(&self) -> $t {
                    self.clone()
                }
            }
        )*
    };
}

// Narrowing on the way back mirrors a plain `as` cast: values the column
// cannot hold in `$t` wrap rather than fail.
macro_rules! convert_cast {
    ($base:ty => $($t:ty),* $(,)?) => {
        $(
            impl Convert for $t {
                type Base = $base;

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                fn from_base(base: $base) -> Result<Self, DbError> {
                    Ok(base as $t)
                }

                #[allow(clippy::cast_possible_wrap, clippy::cast_lossless)]
                fn to_base(&self) -> $base {
                    *self as $base
                }
            }
        )*
    };
}

convert_identity!(i32, i64, f64, String, Text16, Vec<u8>);
convert_cast!(i32 => i8, u8, i16, u16);
convert_cast!(i64 => u32, u64, isize, usize);
convert_cast!(f64 => f32);

impl Convert for bool {
    type Base = i32;

    fn from_base(base: i32) -> Result<Self, DbError> {
        Ok(base != 0)
    }

    fn to_base(&self) -> i32 {
        i32::from(*self)
    }
}

impl Convert for char {
    type Base = i32;

    #[allow(clippy::cast_sign_loss)]
    fn from_base(base: i32) -> Result<Self, DbError> {
        char::from_u32(base as u32)
            .ok_or_else(|| DbError::Conversion(format!("{base} is not a valid char")))
    }

    #[allow(clippy::cast_possible_wrap)]
    fn to_base(&self) -> i32 {
        u32::from(*self) as i32
    }
}

/// `NULL` maps to `None`; anything else goes through `T`.
impl<T: Convert> Convert for Option<T> {
    type Base = Option<T::Base>;

    fn from_base(base: Self::Base) -> Result<Self, DbError> {
        base.map(T::from_base).transpose()
    }

    fn to_base(&self) -> Self::Base {
        self.as_ref().map(Convert::to_base)
    }
}

/// Seconds since the Unix epoch, UTC.
impl Convert for NaiveDateTime {
    type Base = i64;

    fn from_base(base: i64) -> Result<Self, DbError> {
        DateTime::from_timestamp(base, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| DbError::Conversion(format!("timestamp {base} is out of range")))
    }

    fn to_base(&self) -> i64 {
        self.and_utc().timestamp()
    }
}

/// Stored as its JSON text.
impl Convert for JsonValue {
    type Base = String;

    fn from_base(base: String) -> Result<Self, DbError> {
        serde_json::from_str(&base)
            .map_err(|e| DbError::Conversion(format!("column is not valid JSON: {e}")))
    }

    fn to_base(&self) -> String {
        self.to_string()
    }
}

// Vectors of fixed-size numbers travel as a blob of their native-endian bytes.
// A blob whose length is not a multiple of the element size is rejected.
macro_rules! convert_blob_vec {
    ($($t:ty),* $(,)?) => {
        $(
            impl Convert for Vec<$t> {
                type Base = Vec<u8>;

                fn from_base(base: Vec<u8>) -> Result<Self, DbError> {
                    const SIZE: usize = std::mem::size_of::<$t>();
                    if base.len() % SIZE != 0 {
                        return Err(DbError::Conversion(format!(
                            "blob of {} bytes is not a whole number of {}-byte {} elements",
                            base.len(),
                            SIZE,
                            stringify!($t),
                        )));
                    }
                    Ok(base
                        .chunks_exact(SIZE)
                        .map(|chunk| {
                            let mut buf = [0u8; SIZE];
                            buf.copy_from_slice(chunk);
                            <$t>::from_ne_bytes(buf)
                        })
                        .collect())
                }

                fn to_base(&self) -> Vec<u8> {
                    self.iter().flat_map(|v| v.to_ne_bytes()).collect()
                }
            }
        )*
    };
}

convert_blob_vec!(i16, i32, i64, u32, u64, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_treats_any_nonzero_as_true() {
        assert!(!bool::from_base(0).unwrap());
        assert!(bool::from_base(1).unwrap());
        assert!(bool::from_base(-7).unwrap());
        assert_eq!(true.to_base(), 1);
    }

    #[test]
    fn unsigned_64_reinterprets_bits() {
        let big = u64::MAX - 1;
        assert_eq!(big.to_base(), -2);
        assert_eq!(u64::from_base(-2).unwrap(), big);
    }

    #[test]
    fn float_narrows_through_double() {
        let v = 0.1f32;
        assert!((f32::from_base(v.to_base()).unwrap() - v).abs() < f32::EPSILON);
    }

    #[test]
    fn blob_vector_rejects_partial_elements() {
        let ok = Vec::<i32>::from_base(vec![0u8; 8]).unwrap();
        assert_eq!(ok, vec![0, 0]);
        let err = Vec::<i32>::from_base(vec![0u8; 7]).unwrap_err();
        assert!(matches!(err, DbError::Conversion(_)));
    }

    #[test]
    fn blob_vector_round_trips() {
        let data = vec![1.5f64, -2.25, 1e300];
        assert_eq!(Vec::<f64>::from_base(data.to_base()).unwrap(), data);
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<i32>::from_base(None).unwrap(), None);
        assert_eq!(Some(5i16).to_base(), Some(5));
    }

    #[test]
    fn timestamp_uses_epoch_seconds() {
        let dt = DateTime::from_timestamp(1_700_000_000, 0).unwrap().naive_utc();
        assert_eq!(dt.to_base(), 1_700_000_000);
        assert_eq!(NaiveDateTime::from_base(1_700_000_000).unwrap(), dt);
        assert!(NaiveDateTime::from_base(i64::MAX).is_err());
    }

    #[test]
    fn json_is_stored_as_text() {
        let v = serde_json::json!({"a": [1, 2]});
        let text = v.to_base();
        assert_eq!(JsonValue::from_base(text).unwrap(), v);
        assert!(JsonValue::from_base("{oops".into()).is_err());
    }

    #[test]
    fn char_rejects_surrogates() {
        assert_eq!(char::from_base('λ'.to_base()).unwrap(), 'λ');
        assert!(char::from_base(0xD800).is_err());
    }
}
