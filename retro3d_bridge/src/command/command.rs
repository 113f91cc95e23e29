/// Command trait - deferred unit of work for the driver thread

use crate::driver::Driver;

/// A unit of deferred work executed on the queue's worker thread
///
/// Commands carry everything they need by value (or behind `Arc`); the queue
/// owns them until they run and drops them right after. A command must report
/// its own driver failures (log and continue) rather than panic.
pub trait Command: Send {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// Run the command against the driver and return its cost
    ///
    /// The cost is an instrumentation figure (bytes moved or the size of the
    /// command itself), accumulated in the queue statistics.
    fn execute(self: Box<Self>, driver: &mut dyn Driver) -> usize;
}

/// Closure-backed command for ad-hoc work
pub struct FnCommand<F> {
    name: &'static str,
    func: F,
}

impl<F> FnCommand<F>
where
    F: FnOnce(&mut dyn Driver) + Send,
{
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Command for FnCommand<F>
where
    F: FnOnce(&mut dyn Driver) + Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(self: Box<Self>, driver: &mut dyn Driver) -> usize {
        (self.func)(driver);
        std::mem::size_of::<Self>()
    }
}
