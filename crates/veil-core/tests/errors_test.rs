use veil_core::errors::*;

#[test]
fn category_not_supported_carries_name() {
    let err = VeilError::CategoryNotSupported {
        category: "EMPLOYEE_BADGE".into(),
    };
    assert!(err.to_string().contains("EMPLOYEE_BADGE"));
}

#[test]
fn allocation_exhausted_carries_category_and_attempts() {
    let err = VeilError::AllocationExhausted {
        category: "PERSON_NAME".into(),
        attempts: 10,
    };
    let msg = err.to_string();
    assert!(msg.contains("PERSON_NAME"));
    assert!(msg.contains("10"));
}

#[test]
fn always_fatal_errors_are_never_recoverable() {
    let fatal = [
        VeilError::config("missing"),
        VeilError::AllocationExhausted {
            category: "EMAIL_ADDRESS".into(),
            attempts: 3,
        },
        VeilError::DecryptionError {
            reason: "bad tag".into(),
        },
    ];
    for err in &fatal {
        assert!(err.is_always_fatal(), "{} should be fatal", err.kind());
        assert!(!err.is_recoverable());
    }
}

#[test]
fn backend_errors_are_recoverable() {
    let recoverable = [
        VeilError::ServiceUnavailable {
            service: "classifier".into(),
            reason: "connection refused".into(),
        },
        VeilError::CategoryNotSupported {
            category: "X".into(),
        },
        StorageError::Timeout {
            operation: "find".into(),
            millis: 5000,
        }
        .into(),
        CacheError::Unavailable {
            reason: "down".into(),
        }
        .into(),
    ];
    for err in &recoverable {
        assert!(err.is_recoverable(), "{} should be recoverable", err.kind());
    }
}

// --- From impls ---

#[test]
fn storage_error_converts_to_veil_error() {
    let storage_err = StorageError::SqliteError {
        message: "disk full".into(),
    };
    let err: VeilError = storage_err.into();
    assert!(matches!(err, VeilError::StorageError(_)));
    assert!(err.to_string().contains("disk full"));
}

#[test]
fn crypto_failures_become_decryption_errors() {
    let err: VeilError = CryptoError::MissingKey.into();
    assert!(matches!(err, VeilError::DecryptionError { .. }));
    assert!(err.is_always_fatal());

    let err: VeilError = CryptoError::DecryptionFailed {
        reason: "tag mismatch".into(),
    }
    .into();
    assert!(err.to_string().contains("tag mismatch"));
}

#[test]
fn invalid_key_becomes_configuration_error() {
    let err: VeilError = CryptoError::InvalidKey {
        reason: "empty".into(),
    }
    .into();
    assert!(matches!(err, VeilError::ConfigurationError { .. }));
}

#[test]
fn serde_json_error_becomes_serialization_error() {
    let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
    let err: VeilError = json_err.into();
    assert_eq!(err.kind(), "serialization_error");
    assert!(err.is_recoverable());
}
