pub mod col;
pub mod constant;
pub mod error;
pub mod materialize;
mod opts;
pub mod protocol;
pub mod sync;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use opts::Opts;
pub use sync::{Conn, CursorOptions, ResultSet, ScrollType};
pub use value::Value;

#[cfg(test)]
mod constant_test;
#[cfg(test)]
mod opts_test;
#[cfg(test)]
mod value_test;
