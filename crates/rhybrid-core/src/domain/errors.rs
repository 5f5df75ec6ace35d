use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HybridResult<T> = Result<T, HybridError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HybridErrorCategory {
    Success,
    ConfigurationError,
    IoSystemError,
    AllocationError,
    ProtocolError,
    ConsistencyError,
    InternalError,
}

impl HybridErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::ConfigurationError => 2,
            Self::IoSystemError => 3,
            Self::AllocationError => 4,
            Self::ProtocolError => 5,
            Self::ConsistencyError => 6,
            Self::InternalError => 7,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::ConfigurationError => "ConfigurationError",
            Self::IoSystemError => "IoSystemError",
            Self::AllocationError => "AllocationError",
            Self::ProtocolError => "ProtocolError",
            Self::ConsistencyError => "ConsistencyError",
            Self::InternalError => "InternalError",
        }
    }

    /// Prefix used by the solver log for this class of failure.
    pub const fn log_tag(self) -> &'static str {
        match self {
            Self::AllocationError => "(USER)",
            _ => "(HYBRID)",
        }
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HybridError {
    category: HybridErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl HybridError {
    pub fn new(
        category: HybridErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HybridErrorCategory::ConfigurationError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HybridErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn allocation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HybridErrorCategory::AllocationError, placeholder, message)
    }

    pub fn protocol(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HybridErrorCategory::ProtocolError, placeholder, message)
    }

    pub fn consistency(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HybridErrorCategory::ConsistencyError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(HybridErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> HybridErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }

    /// Line in the format of the solver log, e.g. `(USER) ERROR: failed to add faceB array`.
    pub fn log_line(&self) -> String {
        format!("{} ERROR: {}", self.category.log_tag(), self.message)
    }
}

impl Display for HybridError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for HybridError {}

#[cfg(test)]
mod tests {
    use super::{HybridError, HybridErrorCategory};

    #[test]
    fn exit_mapping_is_stable() {
        let cases = [
            (HybridErrorCategory::Success, 0, "Success"),
            (HybridErrorCategory::ConfigurationError, 2, "ConfigurationError"),
            (HybridErrorCategory::IoSystemError, 3, "IoSystemError"),
            (HybridErrorCategory::AllocationError, 4, "AllocationError"),
            (HybridErrorCategory::ProtocolError, 5, "ProtocolError"),
            (HybridErrorCategory::ConsistencyError, 6, "ConsistencyError"),
            (HybridErrorCategory::InternalError, 7, "InternalError"),
        ];

        for (category, exit_code, name) in cases {
            assert_eq!(category.exit_code(), exit_code);
            assert_eq!(category.as_str(), name);
        }
    }

    #[test]
    fn fatal_error_renders_diagnostic_lines() {
        let error = HybridError::allocation("ALLOC.FIELD", "failed to add faceB array to grid");

        assert_eq!(error.exit_code(), 4);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [ALLOC.FIELD] failed to add faceB array to grid"
        );
        assert_eq!(
            error.fatal_exit_line().as_deref(),
            Some("FATAL EXIT CODE: 4")
        );
        assert_eq!(
            error.log_line(),
            "(USER) ERROR: failed to add faceB array to grid"
        );
    }

    #[test]
    fn configuration_errors_use_the_hybrid_log_tag() {
        let error = HybridError::configuration("CONFIG.CELL_SHAPE", "only cube shaped cells allowed");
        assert_eq!(error.category(), HybridErrorCategory::ConfigurationError);
        assert!(error.log_line().starts_with("(HYBRID) ERROR:"));
        assert_eq!(
            error.to_string(),
            "ConfigurationError [CONFIG.CELL_SHAPE] only cube shaped cells allowed"
        );
    }
}
