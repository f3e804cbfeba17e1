//! Attribute readers
//!
//! ```ignore
//! attributes!(Job {
//!     when => "when",
//!     start_in => "start_in",
//! });
//! ```
//!
//! Each reader returns the attribute of a hash config and `None` for any other config. Declaring
//! a reader twice for one type is rejected by the compiler.

macro_rules! attributes {
    ($ty:ty { $($name:ident => $key:literal),* $(,)? }) => {
        impl $ty {
            $(
                pub fn $name(&self) -> Option<&$crate::value::Value> {
                    $crate::entry::Entry::node(self).attribute($key)
                }
            )*
        }
    };
}
pub(crate) use attributes;
