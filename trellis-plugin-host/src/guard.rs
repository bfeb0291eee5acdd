//! Panic containment around extension code.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Extract a human-readable message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

/// Runs `f`, turning a panic into `Err(message)`.
pub(crate) fn contain<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_and_string_payloads() {
        assert_eq!(contain(|| panic!("static")), Err::<(), _>("static".to_string()));
        let n = 3;
        assert_eq!(contain(|| panic!("formatted {n}")), Err::<(), _>("formatted 3".to_string()));
    }

    #[test]
    fn other_payloads() {
        let err = contain(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(err, "non-string panic payload");
    }

    #[test]
    fn passes_values_through() {
        assert_eq!(contain(|| 5), Ok(5));
    }
}
