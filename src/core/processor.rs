//! Processor contract: what a writer's consumer thread does with an event

use super::{
    appender::Appender,
    error::{LoggerError, Result},
    event::Event,
};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Caller-supplied handling of one event, run on a writer's consumer thread.
///
/// Any `Fn(&Event) -> Result<()>` closure is a processor:
///
/// ```
/// use log_distributor::{Event, Processor, Result};
/// use std::sync::Arc;
///
/// let processor: Arc<dyn Processor> = Arc::new(|event: &Event| -> Result<()> {
///     println!("{}", event.message);
///     Ok(())
/// });
/// ```
pub trait Processor: Send + Sync {
    fn process(&self, event: &Event) -> Result<()>;

    /// Called when the writer's queue has been drained
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "processor"
    }
}

impl<F> Processor for F
where
    F: Fn(&Event) -> Result<()> + Send + Sync,
{
    fn process(&self, event: &Event) -> Result<()> {
        self(event)
    }
}

/// Extract a readable message from a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Run `f`, turning a panic into a processor error
pub(crate) fn guard_panic<T>(name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(LoggerError::processor(
            name,
            format!("panicked: {}", panic_message(payload.as_ref())),
        )),
    }
}

/// Fan an event out to a list of appenders.
///
/// **Per-appender isolation**: each appender call is wrapped in
/// `catch_unwind`, so one failing or panicking appender doesn't keep the
/// event from the others. The event is reported as failed if any appender
/// failed.
pub struct AppenderSet {
    name: String,
    appenders: Mutex<Vec<Box<dyn Appender>>>,
}

impl AppenderSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            appenders: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_appender<A: Appender + 'static>(self, appender: A) -> Self {
        self.add_appender(Box::new(appender));
        self
    }

    pub fn add_appender(&self, appender: Box<dyn Appender>) {
        self.appenders.lock().push(appender);
    }

    pub fn len(&self) -> usize {
        self.appenders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.appenders.lock().is_empty()
    }
}

impl Processor for AppenderSet {
    fn process(&self, event: &Event) -> Result<()> {
        let mut appenders = self.appenders.lock();
        let mut failures = Vec::new();

        for appender in appenders.iter_mut() {
            let name = appender.name().to_string();
            if let Err(e) = guard_panic(&name, || appender.append(event)) {
                failures.push(format!("{}: {}", name, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LoggerError::processor(&self.name, failures.join("; ")))
        }
    }

    fn flush(&self) -> Result<()> {
        let mut appenders = self.appenders.lock();
        for appender in appenders.iter_mut() {
            let name = appender.name().to_string();
            if let Err(e) = guard_panic(&name, || appender.flush()) {
                tracing::error!(appender = %name, error = %e, "appender flush failed");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingAppender {
        count: Arc<AtomicUsize>,
    }

    impl Appender for CountingAppender {
        fn append(&mut self, _event: &Event) -> Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    struct PanickingAppender;

    impl Appender for PanickingAppender {
        fn append(&mut self, _event: &Event) -> Result<()> {
            panic!("appender exploded");
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[test]
    fn test_closure_is_processor() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let processor: Arc<dyn Processor> = Arc::new(move |_event: &Event| -> Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        processor.process(&Event::new(LogLevel::Info, "hi")).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(processor.name(), "processor");
    }

    #[test]
    fn test_panicking_appender_is_isolated() {
        let count = Arc::new(AtomicUsize::new(0));
        let set = AppenderSet::new("outputs")
            .with_appender(PanickingAppender)
            .with_appender(CountingAppender {
                count: Arc::clone(&count),
            });

        let err = set.process(&Event::new(LogLevel::Warn, "x")).unwrap_err();
        assert!(err.to_string().contains("appender exploded"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_guard_panic_passes_through_results() {
        assert_eq!(guard_panic("ok", || Ok(5)).unwrap(), 5);
        let err = guard_panic::<()>("boom", || panic!("bad")).unwrap_err();
        assert!(matches!(err, LoggerError::Processor { .. }));
    }
}
