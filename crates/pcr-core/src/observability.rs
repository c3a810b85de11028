// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Receiver for debug trace lines emitted by the solvers.
///
/// The engine treats an absent sink as "discard"; installing one is how the
/// CLI surfaces `--debug` output without the core crates touching stderr.
pub trait TraceSink {
    fn debug(&self, message: &str);
}

/// Sink that collects messages in memory, mainly for tests.
#[derive(Debug, Default)]
pub struct BufferedTrace {
    messages: std::cell::RefCell<Vec<String>>,
}

impl BufferedTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl TraceSink for BufferedTrace {
    fn debug(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
