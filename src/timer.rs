use once_cell::sync::Lazy;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// start of the conversion being timed
pub static START_TIME: Lazy<Mutex<Option<Instant>>> = Lazy::new(|| Mutex::new(None));
pub static TOTAL_DURATION: Lazy<Mutex<Duration>> = Lazy::new(|| Mutex::new(Duration::ZERO));
/// number of timed conversions
pub static COUNT: Lazy<Mutex<u32>> = Lazy::new(|| Mutex::new(0));

pub fn start_timing() {
    if let Ok(mut start_time) = START_TIME.lock() {
        *start_time = Some(Instant::now());
    }
}

pub fn stop_timing() {
    let Ok(mut start_time) = START_TIME.lock() else { return };
    let Some(start) = start_time.take() else { return };
    if let (Ok(mut count), Ok(mut total)) = (COUNT.lock(), TOTAL_DURATION.lock()) {
        *total += start.elapsed();
        *count += 1;
    }
}

/// average duration of the timed conversions so far
pub fn get_average_time() -> Option<Duration> {
    let count = *COUNT.lock().ok()?;
    let total = *TOTAL_DURATION.lock().ok()?;
    (count > 0).then(|| total / count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_time() {
        start_timing();
        std::thread::sleep(Duration::from_millis(5));
        stop_timing();
        // a stop without a start is not counted
        stop_timing();
        let avg = get_average_time().unwrap();
        assert!(avg > Duration::ZERO);
    }
}
