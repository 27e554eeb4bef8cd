/// `decode` subcommand.
pub mod decode;
/// `encode` subcommand.
pub mod encode;
/// `hello` subcommand.
pub mod hello;
/// JSON view of value graphs.
pub mod json;
/// Text tree rendering of value graphs.
pub mod print;
/// `schema` subcommand.
pub mod schema;
/// Schema file loading.
pub mod schema_file;
/// Shared output helpers.
pub mod util;

#[cfg(test)]
mod test_support;
