pub mod classify;
pub mod error;
pub mod preprocess;
mod structural;

pub use error::ParseError;
pub(crate) use structural::parse_blocks;

use crate::Program;

/// Parser entry point for a single source file.
pub struct Parser {
    name: String,
    source: String,
}

impl Parser {
    pub fn new(name: impl Into<String>, source: String) -> Self {
        Parser {
            name: name.into(),
            source,
        }
    }

    /// Parse the source into a program holding just this file.
    pub fn parse(self) -> Result<Program, ParseError> {
        let mut program = Program::new();
        program.add_file(self.name, self.source)?;
        Ok(program)
    }
}
