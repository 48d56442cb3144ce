use super::errors::SplitError;

pub type SplitResult = Result<(), SplitError>;
