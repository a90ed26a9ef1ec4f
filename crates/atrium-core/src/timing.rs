//! Frame-polled timers
//!
//! Nothing here sleeps or spawns. Callers pass the current time in
//! milliseconds and poll once per frame, so dropping or clearing a timer
//! cancels it synchronously.

/// Coalesces bursts of values into the last one, released after a quiet period
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay_ms: f64,
    pending: Option<(T, f64)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Record a value, restarting the quiet period
    pub fn push(&mut self, value: T, now_ms: f64) {
        self.pending = Some((value, now_ms + self.delay_ms));
    }

    /// Take the value once its quiet period has elapsed
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        match self.pending {
            Some((_, due)) if now_ms >= due => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Accepts at most one event per interval
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: f64,
    last: Option<f64>,
}

impl Throttle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last: None,
        }
    }

    /// Whether an event at `now_ms` is admitted; admitted events restart the interval
    pub fn admit(&mut self, now_ms: f64) -> bool {
        match self.last {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Fixed-length animation clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    start_ms: f64,
    duration_ms: f64,
}

impl Tween {
    pub fn new(start_ms: f64, duration_ms: f64) -> Self {
        Self {
            start_ms,
            duration_ms,
        }
    }

    /// Linear progress clamped to 0..=1
    pub fn progress(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0) as f32
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }
}

pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debouncer_coalesces_burst() {
        let mut resize = Debouncer::new(100.0);
        resize.push((800, 600), 0.0);
        resize.push((810, 600), 30.0);
        resize.push((820, 610), 60.0);
        assert_eq!(resize.poll(120.0), None);
        assert_eq!(resize.poll(160.0), Some((820, 610)));
        assert_eq!(resize.poll(500.0), None);
    }

    #[test]
    fn test_debouncer_cancel() {
        let mut d = Debouncer::new(300.0);
        d.push((), 0.0);
        d.cancel();
        assert!(!d.is_pending());
        assert_eq!(d.poll(1000.0), None);
    }

    #[test]
    fn test_throttle() {
        let mut t = Throttle::new(800.0);
        assert!(t.admit(0.0));
        assert!(!t.admit(500.0));
        assert!(t.admit(800.0));
        assert!(!t.admit(1599.0));
        t.reset();
        assert!(t.admit(1600.0));
    }

    #[test]
    fn test_tween_progress() {
        let tw = Tween::new(1000.0, 500.0);
        assert_eq!(tw.progress(900.0), 0.0);
        assert_eq!(tw.progress(1250.0), 0.5);
        assert!(tw.is_finished(1500.0));
        assert_eq!(Tween::new(0.0, 0.0).progress(0.0), 1.0);
    }

    #[test]
    fn test_easing_endpoints() {
        for ease in [ease_in_out_quad, ease_out_cubic] {
            assert_eq!(ease(0.0), 0.0);
            assert!((ease(1.0) - 1.0).abs() < 1e-6);
        }
        assert_eq!(ease_in_out_quad(0.25), 0.125);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-6);
    }
}
