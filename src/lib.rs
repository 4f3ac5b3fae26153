mod conn;
pub mod constant;
pub mod error;
mod opts;
pub mod protocol;
mod result;
mod row;
pub mod scramble;
mod stmt;
mod stream;
pub mod value;

pub use conn::{escape, Conn};
pub use error::{Error, Result, ServerError};
pub use opts::Opts;
pub use protocol::command::Field;
pub use result::ResultSet;
pub use row::Row;
pub use stmt::Stmt;
pub use value::Value;

#[cfg(test)]
mod constant_test;
#[cfg(test)]
mod opts_test;
