mod conn;
mod resultset;
mod stream;

pub use conn::{Conn, ConnState};
pub use resultset::{CursorOptions, ResultSet, ScrollType};
pub use stream::{PacketStream, Transport};
