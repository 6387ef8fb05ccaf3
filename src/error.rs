use thiserror::Error;

/// Structural failures the batch orchestrator must see as typed values.
///
/// Row-level data-quality problems (blank cells, sentinel values, zero
/// denominators, missing identifiers) are not errors: they resolve to
/// nulls, omitted fields, or dropped-row counts and never abort a batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown source id: {0}")]
    UnknownSource(String),

    #[error("insufficient history for year-over-year: need {needed} monthly columns, found {found}")]
    InsufficientHistory { needed: usize, found: usize },

    #[error("empty input batch for source {0}")]
    EmptyBatch(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
