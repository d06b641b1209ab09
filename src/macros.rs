/// Declare an integer-backed enumeration that converts through `i32`.
///
/// The generated type is a newtype over `i32` with one associated constant
/// per listed value, so any integer read from the database round-trips even
/// when it matches none of the constants.
///
/// ```rust
/// use sqlite_binder::int_enum;
///
/// int_enum! {
///     pub struct Level {
///         LOW = 1,
///         HIGH = 10,
///     }
/// }
///
/// assert_eq!(Level::HIGH.0, 10);
/// assert!(Level::LOW.is_known());
/// assert!(!Level(1000).is_known());
/// ```
#[macro_export]
macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($variant:ident = $value:expr),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name(pub i32);

        impl $name {
            $(pub const $variant: $name = $name($value);)*

            /// Whether the value equals one of the declared constants.
            #[must_use]
            pub fn is_known(&self) -> bool {
                [$($value),*].contains(&self.0)
            }
        }

        impl $crate::convert::Convert for $name {
            type Base = i32;

            fn from_base(base: i32) -> ::std::result::Result<Self, $crate::error::DbError> {
                ::std::result::Result::Ok($name(base))
            }

            fn to_base(&self) -> i32 {
                self.0
            }
        }
    };
}
