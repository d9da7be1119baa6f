//! Loading state of a remotely fetched value

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Resource<T> {
    #[default]
    NotAsked,
    Loading,
    Success(T),
    Failure(String),
}

impl<T> Resource<T> {
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Failure(e.to_string()),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure(e) => Some(e),
            _ => None,
        }
    }
}
