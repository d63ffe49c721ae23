#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("mapper is invalid: {issues:?}")]
    Invalid { issues: Vec<String> },

    #[error("malformed schema document: {0}")]
    Malformed(#[from] serde_json::Error),
}
