use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::export::ExportError;
use crate::summary::SummaryError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("invalid input: {0}")]
    Input(String),
    #[error("catalog failure: {0}")]
    Catalog(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("summary failure: {0}")]
    Summary(String),
    #[error("export failure: {0}")]
    Export(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String },
    #[error("unavailable: {message}")]
    Unavailable { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "The input could not be processed. Check it and try again.",
            Self::Unavailable { .. } => {
                "A required file or service is unavailable. Check paths and settings."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::BadRequest { .. } => 2,
            Self::Unavailable { .. } => 3,
            Self::Internal { .. } => 1,
        }
    }
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Catalog(_) => "catalog",
            Self::Configuration(_) => "configuration",
            Self::Summary(_) => "summary",
            Self::Export(_) => "export",
        }
    }

    pub fn into_interface(self) -> InterfaceError {
        InterfaceError::from(self)
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Input(message) | ApplicationError::Configuration(message) => {
                Self::BadRequest { message }
            }
            ApplicationError::Catalog(message) | ApplicationError::Export(message) => {
                Self::Unavailable { message }
            }
            ApplicationError::Summary(message) => Self::Internal { message },
        }
    }
}

impl From<CatalogError> for ApplicationError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value.to_string())
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl From<SummaryError> for ApplicationError {
    fn from(value: SummaryError) -> Self {
        Self::Summary(value.to_string())
    }
}

impl From<ExportError> for ApplicationError {
    fn from(value: ExportError) -> Self {
        Self::Export(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::catalog::CatalogError;
    use crate::config::ConfigError;
    use crate::errors::{ApplicationError, InterfaceError};

    #[test]
    fn configuration_error_maps_to_bad_request() {
        let interface = ApplicationError::from(ConfigError::Validation(
            "matching.threshold must be in range 0.0..=1.0".to_owned(),
        ))
        .into_interface();

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref message } if message.contains("matching.threshold")
        ));
        assert_eq!(interface.exit_code(), 2);
    }

    #[test]
    fn bad_request_has_user_safe_message() {
        let interface = ApplicationError::Input("empty shopping list".to_owned()).into_interface();

        assert_eq!(
            interface.user_message(),
            "The input could not be processed. Check it and try again."
        );
    }

    #[test]
    fn catalog_error_maps_to_unavailable() {
        let error = ApplicationError::from(CatalogError::MissingProducts {
            origin: PathBuf::from("prices.json").display().to_string(),
        });

        assert_eq!(error.error_class(), "catalog");
        let interface = error.into_interface();
        assert!(matches!(interface, InterfaceError::Unavailable { .. }));
        assert_eq!(interface.exit_code(), 3);
    }

    #[test]
    fn summary_error_maps_to_internal() {
        let interface =
            ApplicationError::Summary("template render failed".to_owned()).into_interface();

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
