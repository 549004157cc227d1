pub mod url;
pub mod utf8;
