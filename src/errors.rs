use std::fmt;

#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Clone)]
pub enum SplitError {
    Panic(String),
    ChannelClosed,
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitError::Panic(msg) => write!(f, "split chunk panicked: {}", msg),
            SplitError::ChannelClosed => write!(f, "completion channel closed before a result arrived"),
        }
    }
}

impl std::error::Error for SplitError {}
