//! Generation pipeline error types

use cardforge_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("PDF parse error: {0}")]
    PdfParse(String),

    #[error("Chunking error: {0}")]
    Chunking(String),

    #[error("Suggestion validation error: {0}")]
    Validation(String),
}

impl From<GenerationError> for AppError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::PdfParse(message) => AppError::Document { message },
            GenerationError::Chunking(message) => AppError::Configuration { message },
            GenerationError::Validation(message) => AppError::Validation {
                message,
                field: None,
            },
        }
    }
}
