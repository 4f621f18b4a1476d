use std::backtrace::Backtrace;
use std::backtrace::BacktraceStatus;
use std::error::Error;
use std::fmt;

/// The catch all error type of the workspace.
///
/// Every error that implements [`Error`], as well as `&str` and `String`,
/// converts into a `MercError`, such that `?` can be used on any of them. In
/// debug builds the error records a backtrace of the place where it was
/// created, which is printed by its [`fmt::Debug`] implementation.
pub struct MercError {
    inner: Box<Inner>,
}

/// Boxed once more such that a `Result<T, MercError>` is only a pointer larger than `T`.
struct Inner {
    error: Box<dyn Error + Send + Sync + 'static>,

    #[cfg(debug_assertions)]
    backtrace: Backtrace,
}

impl MercError {
    /// Returns the underlying error if it has the given type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.inner.error.downcast_ref::<E>()
    }

    /// Returns true iff the underlying error has the given type.
    pub fn is<E: Error + 'static>(&self) -> bool {
        self.inner.error.is::<E>()
    }

    /// Returns the backtrace of the place where the error was created, if it was captured.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        #[cfg(debug_assertions)]
        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            return Some(&self.inner.backtrace);
        }

        None
    }
}

// Implementing From for everything that converts into a boxed error also covers &str and String.
impl<E> From<E> for MercError
where
    Box<dyn Error + Send + Sync + 'static>: From<E>,
{
    #[cold]
    fn from(error: E) -> Self {
        MercError {
            inner: Box::new(Inner {
                error: error.into(),
                #[cfg(debug_assertions)]
                backtrace: Backtrace::capture(),
            }),
        }
    }
}

impl fmt::Display for MercError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.error)
    }
}

impl fmt::Debug for MercError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?}", self.inner.error)?;
        if let Some(backtrace) = self.backtrace() {
            writeln!(f, "{backtrace}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn read_failure() -> Result<(), MercError> {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended"))?;
        Ok(())
    }

    #[test]
    fn test_conversions() {
        let error = read_failure().unwrap_err();
        assert!(error.is::<io::Error>());
        assert_eq!(
            error.downcast_ref::<io::Error>().map(|e| e.kind()),
            Some(io::ErrorKind::UnexpectedEof)
        );
        assert_eq!(error.to_string(), "stream ended");

        let error = MercError::from("invalid term");
        assert!(!error.is::<io::Error>());
        assert_eq!(error.to_string(), "invalid term");

        let error = MercError::from(format!("symbol {} is unknown", "f"));
        assert_eq!(error.to_string(), "symbol f is unknown");
    }
}
