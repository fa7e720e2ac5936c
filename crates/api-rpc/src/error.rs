//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use fleet_core::error::AppError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SYSTEM_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Validation(_)
        | AppError::Domain(_)
        | AppError::Serialization(_)
        | AppError::Yaml(_) => code::VALIDATION_ERROR,
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Conflict(_) | AppError::InvalidState(_) => code::CONFLICT,
        AppError::Io(_) | AppError::Launch(_) => code::SYSTEM_ERROR,
        AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };
    let message = match err {
        AppError::Validation(msg)
        | AppError::NotFound(msg)
        | AppError::Conflict(msg)
        | AppError::InvalidState(msg)
        | AppError::Config(msg)
        | AppError::Internal(msg) => msg,
        other => other.to_string(),
    };
    ErrorObjectOwned::owned(code, message, None::<()>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::domain::DomainError;
    use fleet_core::port::LaunchError;

    #[test]
    fn test_error_codes() {
        let err = to_rpc_error(AppError::NotFound("process 'x'".to_string()));
        assert_eq!(err.code(), code::NOT_FOUND);
        assert_eq!(err.message(), "process 'x'");

        let err = to_rpc_error(AppError::Domain(DomainError::DuplicateName("a".to_string())));
        assert_eq!(err.code(), code::VALIDATION_ERROR);

        let err = to_rpc_error(AppError::InvalidState("gone".to_string()));
        assert_eq!(err.code(), code::CONFLICT);

        let err = to_rpc_error(AppError::Launch(LaunchError::SpawnFailed("x".to_string())));
        assert_eq!(err.code(), code::SYSTEM_ERROR);
    }
}
