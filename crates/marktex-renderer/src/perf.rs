//! Render stage timing.

use std::time::Instant;

/// Logs the stage name, input size and elapsed time at debug level when
/// dropped, including when the stage unwinds.
#[must_use = "the timer logs when it is dropped"]
#[derive(Debug)]
pub struct StageTimer {
    stage: &'static str,
    input_len: usize,
    start: Instant,
}

impl StageTimer {
    pub fn start(stage: &'static str, input_len: usize) -> Self {
        Self {
            stage,
            input_len,
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        tracing::debug!(
            stage = self.stage,
            input_len = self.input_len,
            elapsed_ms = self.elapsed_ms(),
            "render stage finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn elapsed_grows() {
        let timer = StageTimer::start("test", 3);
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.elapsed_ms() >= 2.0);
    }
}
