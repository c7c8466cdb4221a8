//! Pluggable logging sink for the filter's informational output.

/// Sink for the filter's info-level messages. Implementations must be
/// thread-safe; the filter itself holds no other state between calls.
///
/// Any `Fn(&str) + Send + Sync` closure is a valid sink.
pub trait FilterLog: Send + Sync {
    fn info(&self, message: &str);
}

/// Discards every message. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLog;

impl FilterLog for NullLog {
    fn info(&self, _message: &str) {}
}

/// Forwards messages to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl FilterLog for TracingLog {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }
}

impl<F> FilterLog for F
where
    F: Fn(&str) + Send + Sync,
{
    fn info(&self, message: &str) {
        self(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_sink() {
        let lines = Mutex::new(Vec::new());
        let sink = |message: &str| lines.lock().unwrap().push(message.to_string());
        let log: &dyn FilterLog = &sink;
        log.info("hello");
        assert_eq!(lines.into_inner().unwrap(), vec!["hello"]);
    }

    #[test]
    fn test_null_sink() {
        NullLog.info("dropped");
    }
}
