use std::borrow::Cow;
use std::io;

use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error")]
    Config(#[from] ConfigError),
    #[error("console io failed")]
    Console(#[source] io::Error),
    #[error("runtime error: {context}")]
    Runtime {
        context: Cow<'static, str>,
        #[source]
        source: AnyhowError,
    },
}

impl AppError {
    pub fn runtime<S, E>(context: S, source: E) -> Self
    where
        S: Into<Cow<'static, str>>,
        E: Into<AnyhowError>,
    {
        Self::Runtime {
            context: context.into(),
            source: source.into(),
        }
    }
}

impl From<AnyhowError> for AppError {
    fn from(source: AnyhowError) -> Self {
        AppError::Runtime {
            context: Cow::Borrowed("unexpected runtime error"),
            source,
        }
    }
}

/// Error message with its full `source` chain, for logs and console output.
pub fn render_error_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
