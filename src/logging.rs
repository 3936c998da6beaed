//! Injected logging.
//!
//! Components never reach for the process-wide logger on their own. They are
//! handed a [`LogSink`] when built, which forwards records to a chosen
//! [`log::Log`] implementation under a fixed target. Binaries pass
//! [`LogSink::global`] after installing `env_logger`; tests pass a capturing
//! logger.
use std::fmt;

use log::{Level, Log, Metadata, Record};

#[derive(Clone, Copy)]
pub struct LogSink {
    logger: &'static dyn Log,
    target: &'static str,
}

impl LogSink {
    pub fn new(logger: &'static dyn Log, target: &'static str) -> Self {
        Self { logger, target }
    }

    /// Sink that forwards to the logger installed through the `log` facade.
    pub fn global(target: &'static str) -> Self {
        Self::new(log::logger(), target)
    }

    /// Same destination, different target.
    pub fn with_target(self, target: &'static str) -> Self {
        Self { target, ..self }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(self.target).build();
        if !self.logger.enabled(&metadata) {
            return;
        }

        self.logger
            .log(&Record::builder().metadata(metadata).args(args).build());
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args)
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args)
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args)
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, args)
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
