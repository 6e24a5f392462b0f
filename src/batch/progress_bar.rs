//! Progress display for batch runs (feature `progress`).
//!
//! Units complete out of order, so the bar advances on each completion and its
//! message shows the last unit together with a smoothed completion interval
//! (exponential moving average, `ema ← α·dt + (1–α)·ema`).
use std::time::{Duration, Instant};

use camino::Utf8Path;
use indicatif::{ProgressBar, ProgressStyle};

const SMOOTHING: f64 = 0.2;

pub(crate) struct BatchProgress {
    bar: ProgressBar,
    last: Instant,
    ema_ns: f64,
    done: u64,
    failed: u64,
}

impl BatchProgress {
    pub(crate) fn new(total: usize) -> Self {
        let bar = ProgressBar::new((total as u64).max(1));
        let style = ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | ETA {eta_precise} | {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(200));

        Self {
            bar,
            last: Instant::now(),
            ema_ns: 0.0,
            done: 0,
            failed: 0,
        }
    }

    pub(crate) fn unit_done(&mut self, unit: &Utf8Path, ok: bool) {
        let now = Instant::now();
        let dt_ns = now.duration_since(self.last).as_nanos() as f64;
        self.last = now;
        self.done += 1;
        if !ok {
            self.failed += 1;
        }

        self.ema_ns = if self.done == 1 {
            dt_ns
        } else {
            SMOOTHING * dt_ns + (1.0 - SMOOTHING) * self.ema_ns
        };

        let name = unit.file_name().unwrap_or(unit.as_str());
        self.bar.set_message(format!(
            "{name} | every {} | {} failed",
            fmt_dur(Duration::from_nanos(self.ema_ns as u64)),
            self.failed
        ));
        self.bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
    }
}

/// `253µs`, `42ms` or `3.14s` depending on the scale.
fn fmt_dur(d: Duration) -> String {
    let us = d.as_micros();
    if us < 1_000 {
        format!("{us}µs")
    } else if d.as_millis() < 1_000 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.2}s", d.as_secs_f32())
    }
}

#[cfg(test)]
mod progress_bar_test {
    use super::*;

    #[test]
    fn test_fmt_dur() {
        assert_eq!(fmt_dur(Duration::from_micros(253)), "253µs");
        assert_eq!(fmt_dur(Duration::from_millis(42)), "42ms");
        assert_eq!(fmt_dur(Duration::from_millis(3140)), "3.14s");
    }
}
