mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::ParsedChatplan;

/// Parse a DSL input string into a [`ParsedChatplan`].
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid DSL syntax or an element
/// is misplaced or carries an unknown attribute.
pub fn parse(input: &str) -> Result<ParsedChatplan, ParseError> {
    use winnow::Parser;
    let elements = grammar::parse_document
        .parse(input)
        .map_err(|e| ParseError::Syntax(e.to_string()))?;
    parser::build(elements)
}
