use core::cell::Cell;

use thingbuf::ThingBuf;
use tracing::{trace, warn};

use crate::constants::REPORTING_QUEUE_DEPTH;

use super::AttributePath;

/// Receives attribute change notifications so that subscriptions covering
/// the path get a fresh report.
pub trait AttributeReporter {
    fn attribute_changed(&self, path: AttributePath);
}

impl<T> AttributeReporter for &T
where
    T: AttributeReporter,
{
    fn attribute_changed(&self, path: AttributePath) {
        (**self).attribute_changed(path)
    }
}

/// Bounded queue of dirty attribute paths, drained by the reporting engine.
///
/// When the queue overflows, individual paths are lost and the engine has
/// to treat every attribute as dirty on its next run.
pub struct ReportingQueue {
    dirty: ThingBuf<AttributePath>,
    overflowed: Cell<bool>,
}

impl Default for ReportingQueue {
    fn default() -> Self {
        Self::new(REPORTING_QUEUE_DEPTH)
    }
}

impl ReportingQueue {
    pub fn new(depth: usize) -> Self {
        Self {
            dirty: ThingBuf::new(depth),
            overflowed: Cell::new(false),
        }
    }

    /// Take all pending paths. Returns `None` if paths were dropped since the
    /// last drain, meaning everything must be reported.
    pub fn drain(&self) -> Option<Vec<AttributePath>> {
        let mut paths = Vec::with_capacity(self.dirty.len());
        while let Some(path) = self.dirty.pop() {
            paths.push(path);
        }
        if self.overflowed.replace(false) {
            None
        } else {
            Some(paths)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty() && !self.overflowed.get()
    }
}

impl AttributeReporter for ReportingQueue {
    fn attribute_changed(&self, path: AttributePath) {
        trace!(?path, "Attribute changed");
        if self.dirty.push(path).is_err() {
            warn!(?path, "Reporting queue full, falling back to a full report");
            self.overflowed.set(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_order() {
        let queue = ReportingQueue::new(4);
        queue.attribute_changed(AttributePath::new(0, 0x3E, 1));
        queue.attribute_changed(AttributePath::new(0, 0x3E, 3));
        assert_eq!(
            queue.drain(),
            Some(vec![
                AttributePath::new(0, 0x3E, 1),
                AttributePath::new(0, 0x3E, 3)
            ])
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_overflow_requests_full_report() {
        let queue = ReportingQueue::new(1);
        queue.attribute_changed(AttributePath::new(0, 0x3E, 1));
        queue.attribute_changed(AttributePath::new(0, 0x3E, 3));
        assert!(!queue.is_empty());
        assert_eq!(queue.drain(), None);
        assert_eq!(queue.drain(), Some(vec![]));
    }
}
