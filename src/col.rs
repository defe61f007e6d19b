use crate::constant::{BINARY_CHARSET, ColumnFlags, ColumnType};

/// Immutable metadata of one result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub schema: String,
    pub table: String,
    pub org_table: String,
    pub name: String,
    pub org_name: String,
    pub charset: u16,
    pub column_length: u32,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
}

impl ColumnDefinition {
    /// A column with only a name and wire type; the rest is defaulted
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            schema: String::new(),
            table: String::new(),
            org_table: String::new(),
            name: name.into(),
            org_name: String::new(),
            charset: 45,
            column_length: 0,
            column_type,
            flags: ColumnFlags::empty(),
            decimals: 0,
        }
    }

    pub fn with_flags(mut self, flags: ColumnFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_length(mut self, column_length: u32) -> Self {
        self.column_length = column_length;
        self
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_charset(mut self, charset: u16) -> Self {
        self.charset = charset;
        self
    }

    pub fn is_signed(&self) -> bool {
        !self.flags.contains(ColumnFlags::UNSIGNED_FLAG)
    }

    /// Binary collation: string types are surfaced as bytes
    pub fn is_binary(&self) -> bool {
        self.charset == BINARY_CHARSET
    }
}
