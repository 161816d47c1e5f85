//! Composable error kinds and the error type returned by every K8055 operation.
//!
//! The numeric values match the return codes of the legacy K8055DD device
//! library, so a [`K8055Error::code`] can be compared with existing tooling and
//! documentation. Several kinds can be reported by one call, e.g. a fresh input
//! read whose reply length was wrong (`BYTE_NUMBER`) or a bootstrap with a
//! failed length check (`BUFFER | INIT`).

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// Set of error kinds reported by a single operation.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorKinds: u32 {
        /// Initialisation (bootstrap) was not successful.
        const INIT        = 0x001;
        /// Invalid argument. Kept for code compatibility; safe Rust callers
        /// cannot pass null pointers.
        const POINTER     = 0x002;
        /// Internal error.
        const INTERN      = 0x004;
        /// A bootstrap reply length did not match, or a raw transfer exceeded
        /// the 8-byte payload limit.
        const BUFFER      = 0x010;
        /// The input transfer did not report 8 bytes.
        const BYTE_NUMBER = 0x020;
        /// The toggle bit did not flip: stale data, device unresponsive or unplugged.
        const TOGGLE_BIT  = 0x040;
        /// Value or index out of range.
        const RANGE       = 0x080;
        /// The underlying transport call failed.
        const FROM_CALL   = 0x100;
        /// Development-only sentinel.
        const TEST        = 0x200;
        /// The handle is not in a state that allows the operation
        /// (data exchange before a successful bootstrap, or a second bootstrap).
        const NOT_READY   = 0x400;
    }
}

impl ErrorKinds {
    /// Short description of a single kind.
    pub fn describe(self) -> &'static str {
        match self {
            Self::INIT => "initialisation failed",
            Self::POINTER => "invalid argument",
            Self::INTERN => "internal error",
            Self::BUFFER => "buffer content mismatch",
            Self::BYTE_NUMBER => "byte count mismatch",
            Self::TOGGLE_BIT => "stale data (toggle bit unchanged)",
            Self::RANGE => "value or index out of range",
            Self::FROM_CALL => "transport call failed",
            Self::TEST => "test error",
            Self::NOT_READY => "device not ready",
            _ => "multiple errors",
        }
    }

    /// `Ok(())` for an empty set, otherwise the set wrapped in a [`K8055Error`].
    ///
    /// # Errors
    ///
    /// Returns an error when at least one kind is set.
    pub fn into_result(self) -> K8055Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(K8055Error::new(self))
        }
    }
}

impl fmt::Display for ErrorKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no error");
        }
        let mut first = true;
        for (_, kind) in self.iter_names() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(kind.describe())?;
            first = false;
        }
        Ok(())
    }
}

/// Error returned by K8055 operations: a non-empty set of [`ErrorKinds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("k8055 error {code:#05x}: {kinds}", code = .kinds.bits())]
pub struct K8055Error {
    kinds: ErrorKinds,
}

impl K8055Error {
    /// Wrap a set of kinds. An empty set is stored as `INTERN`, an error
    /// without a cause is itself an internal fault.
    pub fn new(kinds: ErrorKinds) -> Self {
        if kinds.is_empty() {
            Self {
                kinds: ErrorKinds::INTERN,
            }
        } else {
            Self { kinds }
        }
    }

    /// Value or index out of range.
    pub fn range() -> Self {
        Self::new(ErrorKinds::RANGE)
    }

    /// Transport call failed.
    pub fn from_call() -> Self {
        Self::new(ErrorKinds::FROM_CALL)
    }

    /// Operation not allowed in the current device state.
    pub fn not_ready() -> Self {
        Self::new(ErrorKinds::NOT_READY)
    }

    /// Payload larger than the transfer buffer.
    pub fn buffer() -> Self {
        Self::new(ErrorKinds::BUFFER)
    }

    /// The kinds carried by this error.
    pub fn kinds(&self) -> ErrorKinds {
        self.kinds
    }

    /// Numeric return code, as returned by the legacy C library.
    pub fn code(&self) -> u32 {
        self.kinds.bits()
    }

    /// Returns `true` if `kind` is part of this error.
    pub fn contains(&self, kind: ErrorKinds) -> bool {
        self.kinds.contains(kind)
    }
}

impl From<K8055Error> for ErrorKinds {
    fn from(err: K8055Error) -> Self {
        err.kinds
    }
}

/// Result alias for K8055 operations.
pub type K8055Result<T> = Result<T, K8055Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_library_values() {
        assert_eq!(ErrorKinds::INIT.bits(), 0x001);
        assert_eq!(ErrorKinds::POINTER.bits(), 0x002);
        assert_eq!(ErrorKinds::INTERN.bits(), 0x004);
        assert_eq!(ErrorKinds::BUFFER.bits(), 0x010);
        assert_eq!(ErrorKinds::BYTE_NUMBER.bits(), 0x020);
        assert_eq!(ErrorKinds::TOGGLE_BIT.bits(), 0x040);
        assert_eq!(ErrorKinds::RANGE.bits(), 0x080);
        assert_eq!(ErrorKinds::FROM_CALL.bits(), 0x100);
        assert_eq!(ErrorKinds::TEST.bits(), 0x200);
    }

    #[test]
    fn kinds_compose() {
        let err = K8055Error::new(ErrorKinds::BUFFER | ErrorKinds::INIT);
        assert!(err.contains(ErrorKinds::BUFFER));
        assert!(err.contains(ErrorKinds::INIT));
        assert!(!err.contains(ErrorKinds::RANGE));
        assert_eq!(err.code(), 0x011);
    }

    #[test]
    fn empty_set_is_ok() {
        assert_eq!(ErrorKinds::empty().into_result(), Ok(()));
        assert_eq!(
            ErrorKinds::RANGE.into_result(),
            Err(K8055Error::range())
        );
    }

    #[test]
    fn empty_error_becomes_intern() {
        assert_eq!(
            K8055Error::new(ErrorKinds::empty()).kinds(),
            ErrorKinds::INTERN
        );
    }

    #[test]
    fn display_lists_every_kind() {
        let err = K8055Error::new(ErrorKinds::TOGGLE_BIT | ErrorKinds::BYTE_NUMBER);
        let msg = err.to_string();
        assert!(msg.contains("0x060"), "{msg}");
        assert!(msg.contains("byte count mismatch"), "{msg}");
        assert!(msg.contains("toggle bit"), "{msg}");
    }

    #[test]
    fn error_is_std_error() {
        let err = K8055Error::range();
        let _: &dyn std::error::Error = &err;
    }
}
