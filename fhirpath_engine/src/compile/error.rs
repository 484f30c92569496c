//! Compile-stage errors: arity and signature violations

use std::fmt;

/// Expected-argument-count half of a signature, for error rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedArity {
    pub min: usize,
    pub max: Option<usize>,
}

impl fmt::Display for ExpectedArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("Function '{name}' expects {expected} argument(s), got {found}")]
    WrongArity {
        name: String,
        expected: ExpectedArity,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_messages() {
        let err = CompileError::WrongArity {
            name: "iif".into(),
            expected: ExpectedArity {
                min: 3,
                max: Some(3),
            },
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Function 'iif' expects 3 argument(s), got 2"
        );

        let err = CompileError::WrongArity {
            name: "substring".into(),
            expected: ExpectedArity {
                min: 1,
                max: Some(2),
            },
            found: 0,
        };
        assert!(err.to_string().contains("1 to 2"));
    }
}
