//! Capability interface the interpreter exposes to the bridge.

use crate::sample::SampleRecord;
use bridge_common::WordId;

/// The two entry points the bridge calls into the interpreter.
///
/// Both are invoked on the interpreter's own thread from within a
/// [`Bridge`](crate::bridge::Bridge) cycle. Nothing flows back: a word the
/// interpreter no longer recognizes is the interpreter's to reject.
pub trait Interpreter {
    /// Run the interrupt service word `word`.
    fn on_interrupt_fired(&mut self, word: WordId);

    /// Consume drained sample records, oldest first.
    fn on_samples_ready(&mut self, records: &[SampleRecord]);
}

impl<T: Interpreter + ?Sized> Interpreter for &mut T {
    fn on_interrupt_fired(&mut self, word: WordId) {
        (**self).on_interrupt_fired(word);
    }

    fn on_samples_ready(&mut self, records: &[SampleRecord]) {
        (**self).on_samples_ready(records);
    }
}

impl<T: Interpreter + ?Sized> Interpreter for Box<T> {
    fn on_interrupt_fired(&mut self, word: WordId) {
        (**self).on_interrupt_fired(word);
    }

    fn on_samples_ready(&mut self, records: &[SampleRecord]) {
        (**self).on_samples_ready(records);
    }
}
