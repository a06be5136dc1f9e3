use std::time::{Duration, Instant};

use crate::error::DeviceFault;

type Callback<C> = Box<dyn FnMut(&mut C) -> Result<(), DeviceFault>>;

enum Trigger<C> {
    /// Rearming deadline: fires when due, then schedules `period` ahead.
    Every { period: Duration, next: Instant },
    /// Polled condition; fires on every check that observes it true. The
    /// condition itself is expected to encode its own rearming (for
    /// example by reading a clock the callback resets).
    When(Box<dyn Fn(&C) -> bool>),
}

pub struct Task<C> {
    trigger: Trigger<C>,
    callback: Callback<C>,
}

impl<C> Task<C> {
    pub fn every(
        period: Duration,
        callback: impl FnMut(&mut C) -> Result<(), DeviceFault> + 'static,
    ) -> Self {
        Self {
            trigger: Trigger::Every {
                period,
                next: Instant::now() + period,
            },
            callback: Box::new(callback),
        }
    }

    pub fn when(
        predicate: impl Fn(&C) -> bool + 'static,
        callback: impl FnMut(&mut C) -> Result<(), DeviceFault> + 'static,
    ) -> Self {
        Self {
            trigger: Trigger::When(Box::new(predicate)),
            callback: Box::new(callback),
        }
    }
}

/// Poll-driven dispatcher for the fixed set of background behaviors.
/// Appropriate for synchronous code where high precision is not needed:
/// any loop that can otherwise block for a long stretch (the network
/// retry loop) calls `check` between attempts, and that is the only
/// time tasks run.
pub struct Scheduler<C> {
    tasks: Vec<Task<C>>,
}

impl<C> Scheduler<C> {
    /// The task set is fixed for the scheduler's lifetime.
    pub fn new(tasks: Vec<Task<C>>) -> Self {
        Self { tasks }
    }

    /// Runs every due task once, in registration order. Never blocks on
    /// its own; a callback error (a device fault inside a scheduled
    /// playback) aborts the sweep and propagates.
    pub fn check(&mut self, ctx: &mut C) -> Result<(), DeviceFault> {
        let now = Instant::now();
        for task in &mut self.tasks {
            match &mut task.trigger {
                Trigger::Every { period, next } => {
                    if now >= *next {
                        (task.callback)(ctx)?;
                        *next = now + *period;
                    }
                }
                Trigger::When(predicate) => {
                    if predicate(ctx) {
                        (task.callback)(ctx)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;

    struct Counters {
        periodic: u32,
        predicate: u32,
        ready: bool,
    }

    fn counters() -> Counters {
        Counters {
            periodic: 0,
            predicate: 0,
            ready: false,
        }
    }

    #[test]
    fn periodic_task_waits_out_its_period() {
        let mut scheduler = Scheduler::new(vec![Task::every(
            Duration::from_millis(40),
            |c: &mut Counters| {
                c.periodic += 1;
                Ok(())
            },
        )]);
        let mut ctx = counters();

        scheduler.check(&mut ctx).unwrap();
        assert_eq!(ctx.periodic, 0);

        std::thread::sleep(Duration::from_millis(50));
        scheduler.check(&mut ctx).unwrap();
        assert_eq!(ctx.periodic, 1);

        // Rearmed: not due again right away.
        scheduler.check(&mut ctx).unwrap();
        assert_eq!(ctx.periodic, 1);
    }

    #[test]
    fn periodic_task_rearms_and_fires_again() {
        let mut scheduler = Scheduler::new(vec![Task::every(
            Duration::from_millis(25),
            |c: &mut Counters| {
                c.periodic += 1;
                Ok(())
            },
        )]);
        let mut ctx = counters();

        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(90) {
            scheduler.check(&mut ctx).unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(
            (2..=4).contains(&ctx.periodic),
            "fired {} times",
            ctx.periodic
        );
    }

    #[test]
    fn predicate_task_fires_on_every_true_check() {
        let mut scheduler = Scheduler::new(vec![Task::when(
            |c: &Counters| c.ready,
            |c: &mut Counters| {
                c.predicate += 1;
                Ok(())
            },
        )]);
        let mut ctx = counters();

        scheduler.check(&mut ctx).unwrap();
        assert_eq!(ctx.predicate, 0);

        ctx.ready = true;
        scheduler.check(&mut ctx).unwrap();
        scheduler.check(&mut ctx).unwrap();
        assert_eq!(ctx.predicate, 2);

        ctx.ready = false;
        scheduler.check(&mut ctx).unwrap();
        assert_eq!(ctx.predicate, 2);
    }

    #[test]
    fn tasks_run_in_registration_order() {
        let order: std::rc::Rc<std::cell::RefCell<Vec<u8>>> = Default::default();
        let a = order.clone();
        let b = order.clone();
        let mut scheduler = Scheduler::new(vec![
            Task::when(
                |_: &Counters| true,
                move |_| {
                    a.borrow_mut().push(1);
                    Ok(())
                },
            ),
            Task::when(
                |_: &Counters| true,
                move |_| {
                    b.borrow_mut().push(2);
                    Ok(())
                },
            ),
        ]);
        scheduler.check(&mut counters()).unwrap();
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn callback_errors_propagate() {
        let mut scheduler = Scheduler::new(vec![Task::when(
            |_: &Counters| true,
            |_| Err(DeviceFault::new("drone on", FaultKind::NoHandshake)),
        )]);
        let fault = scheduler.check(&mut counters()).unwrap_err();
        assert_eq!(fault.op, "drone on");
    }
}
