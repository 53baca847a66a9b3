use thiserror::Error;

#[derive(Debug, Error)]
pub enum VarwalkError {
    #[error("CLI error: {0}")]
    CliError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("File IO error: {0}")]
    FileIOError(#[from] std::io::Error),

    #[error("Reference error: {0}")]
    ReferenceError(String),

    #[error("Alignment file error: {0}")]
    AlignmentFileError(String),

    #[error("Invalid alignment: {0}")]
    InvalidAlignment(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8DecodingError(#[from] std::string::FromUtf8Error),

    #[error("ParseInt error {0}")]
    ParseIntError(#[from] std::num::ParseIntError),
}
