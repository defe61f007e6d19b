pub mod command;
pub mod connection;
pub mod packet;
pub mod primitive;
pub mod response;
pub mod row;
pub mod value;

pub use row::{DecodedSlice, Located, ResumePoint, RowDecoder, RowProtocol};

#[cfg(test)]
mod row_test;
