use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrandPulseError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Extraction parse error: {0}")]
    ExtractionParse(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
