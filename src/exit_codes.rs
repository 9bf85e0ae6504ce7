//! Exit code constants for the tablock binary.
//!
//! - 0: Success
//! - 1: User error (bad args, bad data file, refused action)
//! - 2: I/O failure while creating or opening lock artifacts
//! - 3: Lock acquisition timed out (possible stale lock)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid data file, or refused operator action.
pub const USER_ERROR: i32 = 1;

/// OS failure: permission denied, no space, descriptor exhaustion, other I/O.
pub const IO_FAILURE: i32 = 2;

/// The lock could not be acquired before the deadline.
pub const LOCK_TIMEOUT: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, IO_FAILURE, LOCK_TIMEOUT];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn success_is_zero() {
        assert_eq!(SUCCESS, 0);
    }
}
