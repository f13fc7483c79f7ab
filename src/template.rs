//! Self-clocking periodic simulation objects.
//!
//! A [`PeriodicObject`] is activated at `0, period, 2·period, …`. Each
//! activation runs its [`PeriodicAction`] and then schedules the next
//! activation. Activation times are computed as `period_count × period`
//! so long runs do not accumulate rounding error.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::event::Event;
use crate::message::{Message, MessageType};
use crate::object::{ObjectCore, ObjectId, Registration, SimContext, SimulationObject};
use crate::time::SimTime;

/// The message a periodic object sends itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NextEvent;

impl NextEvent {
    pub const TYPE: MessageType = MessageType::new("NextEvent");
}

impl Message for NextEvent {
    fn message_type(&self) -> MessageType {
        Self::TYPE
    }
}

// ── PeriodicAction ────────────────────────────────────────────────────

/// The application work done on each activation of a [`PeriodicObject`].
pub trait PeriodicAction<M: Message>: 'static {
    /// Type name used in the object's registration.
    const TYPE_NAME: &'static str = "PeriodicObject";

    /// Called once per period with the current simulated time.
    fn on_period(&mut self, now: SimTime, ctx: &mut SimContext<'_, M>) -> SimResult<()>;

    fn state(&self) -> String {
        String::new()
    }
}

/// A bare clock with no application work.
impl<M: Message> PeriodicAction<M> for () {
    fn on_period(&mut self, _now: SimTime, _ctx: &mut SimContext<'_, M>) -> SimResult<()> {
        Ok(())
    }
}

// ── PeriodicObject ────────────────────────────────────────────────────

/// A simulation object that reschedules itself every `period`.
///
/// `M` must be able to carry a [`NextEvent`].
pub struct PeriodicObject<A, M> {
    core: ObjectCore,
    period: f64,
    period_count: u64,
    action: A,
    registration: Registration<PeriodicObject<A, M>, M>,
}

impl<A, M> PeriodicObject<A, M>
where
    A: PeriodicAction<M>,
    M: Message + From<NextEvent>,
{
    /// Fails with `InvalidPeriod` unless `period` is finite and positive.
    pub fn new(name: impl Into<ObjectId>, period: f64, action: A) -> SimResult<Self> {
        Self::with_registration(name, period, action, Self::base_registration()?)
    }

    /// Like [`new`](Self::new), with a registration that extends
    /// [`base_registration`](Self::base_registration).
    pub fn with_registration(
        name: impl Into<ObjectId>,
        period: f64,
        action: A,
        registration: Registration<Self, M>,
    ) -> SimResult<Self> {
        if period <= 0.0 || !period.is_finite() {
            return Err(SimError::InvalidPeriod(period));
        }
        Ok(PeriodicObject {
            core: ObjectCore::new(name),
            period,
            period_count: 0,
            action,
            registration,
        })
    }

    /// Handles and sends the `NextEvent` message.
    pub fn base_registration() -> SimResult<Registration<Self, M>> {
        let next = M::from(NextEvent).message_type();
        Registration::builder(A::TYPE_NAME)
            .handler(next, Self::handle_next_event)
            .sends(next)
            .build()
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Number of the next activation to be scheduled.
    pub fn period_count(&self) -> u64 {
        self.period_count
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn action_mut(&mut self) -> &mut A {
        &mut self.action
    }

    /// Continue a restored schedule: the first activation will be at
    /// `period_count × period` instead of 0.
    pub fn resume_at(mut self, period_count: u64) -> Self {
        self.period_count = period_count;
        self
    }

    /// Schedule activation number `period_count`, then count it.
    pub fn schedule_next_event(&mut self, ctx: &mut SimContext<'_, M>) -> SimResult<()> {
        let at = SimTime::of_period(self.period_count, self.period)?;
        let me = ctx.id().clone();
        ctx.send_event_absolute_owned(at.value(), &me, M::from(NextEvent))?;
        self.period_count += 1;
        Ok(())
    }

    fn handle_next_event(&mut self, ctx: &mut SimContext<'_, M>, _event: &Event<M>) -> SimResult<()> {
        let now = ctx.now();
        self.action.on_period(now, ctx)?;
        self.schedule_next_event(ctx)
    }
}

impl<A, M> SimulationObject<M> for PeriodicObject<A, M>
where
    A: PeriodicAction<M>,
    M: Message + From<NextEvent>,
{
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn registration(&self) -> &Registration<Self, M> {
        &self.registration
    }

    fn send_initial_events(&mut self, ctx: &mut SimContext<'_, M>) -> SimResult<()> {
        self.schedule_next_event(ctx)
    }

    fn get_state(&self) -> String {
        self.action.state()
    }
}

impl<A: std::fmt::Debug, M> std::fmt::Debug for PeriodicObject<A, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicObject")
            .field("core", &self.core)
            .field("period", &self.period)
            .field("period_count", &self.period_count)
            .field("action", &self.action)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SimulationEngine;
    use crate::message::testing::TestMsg;

    /// Records the times it was activated.
    #[derive(Debug, Default)]
    struct Stamps(Vec<f64>);

    impl<M: Message> PeriodicAction<M> for Stamps {
        fn on_period(&mut self, now: SimTime, _ctx: &mut SimContext<'_, M>) -> SimResult<()> {
            self.0.push(now.value());
            Ok(())
        }

        fn state(&self) -> String {
            format!("{} stamps", self.0.len())
        }
    }

    #[test]
    fn test_invalid_period() {
        for period in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = PeriodicObject::<(), TestMsg>::new("p", period, ());
            assert!(matches!(result, Err(SimError::InvalidPeriod(_))));
        }
    }

    #[test]
    fn test_activation_times() {
        let mut engine = SimulationEngine::<TestMsg>::new();
        engine
            .add_object(PeriodicObject::new("p", 2.5, Stamps::default()).unwrap())
            .unwrap();
        engine.initialize().unwrap();
        let count = engine.run(10.0).unwrap();

        let p = engine.object::<PeriodicObject<Stamps, TestMsg>>(&"p".into()).unwrap();
        assert_eq!(count, 5);
        assert_eq!(p.action().0, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
        assert_eq!(p.period_count(), 6);
        assert_eq!(p.num_events(), 5);
        assert_eq!(p.get_state(), "5 stamps");
        assert_eq!(engine.pending_events(), 1);
    }

    #[test]
    fn test_no_drift_over_long_runs() {
        let mut engine = SimulationEngine::<NextEvent>::new();
        engine
            .add_object(PeriodicObject::new("p", 0.1, Stamps::default()).unwrap())
            .unwrap();
        engine.initialize().unwrap();
        engine.run(1000.0).unwrap();

        let p = engine.object::<PeriodicObject<Stamps, NextEvent>>(&"p".into()).unwrap();
        let stamps = &p.action().0;
        assert!(stamps.len() >= 10_000);
        for (i, t) in stamps.iter().enumerate() {
            assert_eq!(*t, i as f64 * 0.1);
        }
    }

    #[test]
    fn test_resume_at() {
        let mut engine = SimulationEngine::<TestMsg>::new();
        let p = PeriodicObject::new("p", 3.0, Stamps::default()).unwrap().resume_at(4);
        engine.add_object(p).unwrap();
        engine.initialize().unwrap();
        engine.run(20.0).unwrap();

        let p = engine.object::<PeriodicObject<Stamps, TestMsg>>(&"p".into()).unwrap();
        assert_eq!(p.action().0, vec![12.0, 15.0, 18.0]);
    }

    #[test]
    fn test_registration_handles_next_event() {
        let reg = PeriodicObject::<(), TestMsg>::base_registration().unwrap();
        assert_eq!(reg.type_name(), "PeriodicObject");
        assert!(reg.info().handles(NextEvent::TYPE));
        assert!(reg.info().sends(NextEvent::TYPE));
    }
}
