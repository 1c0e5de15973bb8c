use dvrp_core::SimTime;

use crate::{Acquire, EventQueue, Resource, Signal, Wait};

mod queue_tests {
    use super::*;

    #[test]
    fn pops_in_time_order() {
        let mut q = EventQueue::new();
        q.push(SimTime::from(5), "b");
        q.push(SimTime::from(1), "a");
        q.push(SimTime::from(9), "c");
        assert_eq!(q.pop(), Some((SimTime::from(1), "a")));
        assert_eq!(q.pop(), Some((SimTime::from(5), "b")));
        assert_eq!(q.pop(), Some((SimTime::from(9), "c")));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn equal_time_is_fifo() {
        let mut q = EventQueue::new();
        let t = SimTime::from(3);
        for i in 0..10 {
            q.push(t, i);
        }
        for i in 0..10 {
            assert_eq!(q.pop(), Some((t, i)));
        }
    }

    #[test]
    fn canceled_entries_never_pop() {
        let mut q = EventQueue::new();
        q.push(SimTime::from(1), "keep");
        let dead = q.push(SimTime::from(2), "dead");
        q.push(SimTime::from(3), "keep2");
        assert!(q.cancel(dead));
        assert!(!q.cancel(dead), "double cancel is a no-op");
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(), Some((SimTime::from(1), "keep")));
        assert_eq!(q.pop(), Some((SimTime::from(3), "keep2")));
        assert!(q.is_empty());
    }

    #[test]
    fn peek_time_skips_canceled_head() {
        let mut q = EventQueue::new();
        let dead = q.push(SimTime::from(1), "dead");
        q.push(SimTime::from(4), "live");
        q.cancel(dead);
        assert_eq!(q.peek_time(), Some(SimTime::from(4)));
    }

    #[test]
    fn cancel_after_pop_is_noop() {
        let mut q = EventQueue::new();
        let t = q.push(SimTime::from(1), "x");
        q.pop();
        assert!(!q.cancel(t));
        assert!(q.is_empty());
    }

    #[test]
    fn zero_delay_entries_keep_fifo_with_existing() {
        // A wake pushed "now" at the same instant as pending wakes must run
        // after them — this is what the coordinator's quiesce relies on.
        let mut q = EventQueue::new();
        let t = SimTime::from(8);
        q.push(t, "order-release");
        q.push(t, "vehicle-step");
        q.push(t, "coordinator");
        assert_eq!(q.pop().unwrap().1, "order-release");
        assert_eq!(q.pop().unwrap().1, "vehicle-step");
        assert_eq!(q.pop().unwrap().1, "coordinator");
    }
}

mod signal_tests {
    use super::*;

    #[test]
    fn trigger_drains_waiters_fifo() {
        let mut s = Signal::new();
        assert_eq!(s.wait(1), Wait::Queued);
        assert_eq!(s.wait(2), Wait::Queued);
        assert_eq!(s.wait(3), Wait::Queued);
        assert_eq!(s.trigger(), vec![1, 2, 3]);
        assert!(s.is_triggered());
    }

    #[test]
    fn late_waiter_is_not_queued() {
        let mut s: Signal<u32> = Signal::new();
        s.trigger();
        assert_eq!(s.wait(7), Wait::AlreadyTriggered);
    }

    #[test]
    fn cancel_removes_one_waiter() {
        let mut s = Signal::new();
        s.wait("a");
        s.wait("b");
        assert!(s.cancel(&"a"));
        assert!(!s.cancel(&"a"));
        assert_eq!(s.trigger(), vec!["b"]);
    }
}

mod resource_tests {
    use super::*;

    #[test]
    fn grants_up_to_capacity_then_queues() {
        let mut r = Resource::new(2);
        assert_eq!(r.acquire("v1"), Acquire::Granted);
        assert_eq!(r.acquire("v2"), Acquire::Granted);
        assert_eq!(r.acquire("v3"), Acquire::Queued);
        assert_eq!(r.in_use(), 2);
        assert_eq!(r.queued(), 1);
    }

    #[test]
    fn release_hands_off_to_queue_head() {
        let mut r = Resource::new(1);
        assert_eq!(r.acquire("v1"), Acquire::Granted);
        assert_eq!(r.acquire("v2"), Acquire::Queued);
        assert_eq!(r.acquire("v3"), Acquire::Queued);
        // Slot passes straight to v2; count stays at capacity.
        assert_eq!(r.release(), Some("v2"));
        assert_eq!(r.in_use(), 1);
        assert_eq!(r.release(), Some("v3"));
        assert_eq!(r.release(), None);
        assert_eq!(r.in_use(), 0);
    }

    #[test]
    fn strict_fifo_no_overtaking() {
        // Even with a free slot, a newcomer must queue behind earlier waiters.
        let mut r = Resource::new(1);
        r.acquire("v1");
        r.acquire("v2");
        // v1 releases: slot goes to v2, not to the newly arriving v3.
        assert_eq!(r.release(), Some("v2"));
        assert_eq!(r.acquire("v3"), Acquire::Queued);
        assert_eq!(r.release(), Some("v3"));
    }

    #[test]
    fn cancel_dequeues_without_disturbing_others() {
        let mut r = Resource::new(1);
        r.acquire("v1");
        r.acquire("v2");
        r.acquire("v3");
        assert!(r.cancel(&"v2"));
        assert_eq!(r.release(), Some("v3"));
    }
}
