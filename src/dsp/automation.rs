//! Parameter automation — a timeline of value changes and ramps, modeled on
//! the Web Audio `AudioParam` scheduling methods.
//!
//! Gain envelopes and pitch glides are both expressed as a `ParamTimeline`,
//! so "short linear attack, long exponential decay" is just two ramps.

/// One scheduled change.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    /// Jump to `value` at `time`.
    Set { time: f64, value: f64 },
    /// Ramp linearly from the previous point, reaching `value` at `time`.
    Linear { time: f64, value: f64 },
    /// Ramp exponentially from the previous point, reaching `value` at `time`.
    Exponential { time: f64, value: f64 },
}

impl Event {
    fn time(&self) -> f64 {
        match *self {
            Event::Set { time, .. } | Event::Linear { time, .. } | Event::Exponential { time, .. } => time,
        }
    }

    fn value(&self) -> f64 {
        match *self {
            Event::Set { value, .. }
            | Event::Linear { value, .. }
            | Event::Exponential { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamTimeline {
    default_value: f64,
    events: Vec<Event>,
}

impl ParamTimeline {
    pub fn new(default_value: f64) -> Self {
        ParamTimeline {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn set_value_at(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(Event::Set { time, value })
    }

    pub fn linear_ramp_to(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(Event::Linear { time, value })
    }

    /// Exponential ramps cannot cross or touch zero; such a ramp holds the
    /// starting value instead, as a Web Audio param would reject it.
    pub fn exponential_ramp_to(&mut self, value: f64, time: f64) -> &mut Self {
        self.insert(Event::Exponential { time, value })
    }

    fn insert(&mut self, event: Event) -> &mut Self {
        // Stable: equal times keep insertion order.
        let at = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(at, event);
        self
    }

    /// Evaluate the parameter at `t` (seconds, same clock as the events).
    pub fn value_at(&self, t: f64) -> f64 {
        let next = self.events.partition_point(|e| e.time() <= t);

        let (t0, v0) = match next {
            0 => (0.0, self.default_value),
            i => {
                let prev = self.events[i - 1];
                (prev.time(), prev.value())
            }
        };

        let Some(upcoming) = self.events.get(next) else {
            return v0;
        };

        let t1 = upcoming.time();
        let span = t1 - t0;
        if span <= 0.0 {
            return v0;
        }
        let progress = ((t - t0) / span).clamp(0.0, 1.0);

        match *upcoming {
            Event::Set { .. } => v0,
            Event::Linear { value, .. } => v0 + (value - v0) * progress,
            Event::Exponential { value, .. } => {
                if v0 == 0.0 || value == 0.0 || v0.signum() != value.signum() {
                    v0
                } else {
                    v0 * (value / v0).powf(progress)
                }
            }
        }
    }
}
