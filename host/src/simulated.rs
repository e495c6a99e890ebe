use sensor_reporter_common::{DelayNs, PairedSensor};

/// A sensor that drifts slowly around a base value and fails on a fixed schedule.
pub struct SimulatedSensor {
    acquisitions: u32,
    fail_every: Option<u32>,
    base_temperature: f32,
    base_humidity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatedTimeout;

impl SimulatedSensor {
    pub fn new(base_temperature: f32, base_humidity: f32) -> Self {
        Self {
            acquisitions: 0,
            fail_every: None,
            base_temperature,
            base_humidity,
        }
    }

    /// Makes every `n`-th acquisition fail. `0` never fails.
    pub fn fail_every(mut self, n: u32) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }
}

impl PairedSensor for SimulatedSensor {
    type Error = SimulatedTimeout;

    fn acquire(&mut self) -> Result<(f32, f32), Self::Error> {
        self.acquisitions += 1;

        if self
            .fail_every
            .is_some_and(|n| self.acquisitions % n == 0)
        {
            return Err(SimulatedTimeout);
        }

        let t = self.acquisitions as f32;
        Ok((
            self.base_temperature + 1.5 * (t / 10.0).sin(),
            (self.base_humidity + 5.0 * (t / 15.0).cos()).clamp(0.0, 100.0),
        ))
    }
}

/// Blocking delay on top of `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms.into()));
    }
}

#[test]
fn test_simulated_sensor_fails_on_schedule() {
    let mut sensor = SimulatedSensor::new(22.0, 50.0).fail_every(3);

    let outcomes: Vec<bool> = (0..6).map(|_| sensor.acquire().is_ok()).collect();

    assert_eq!(outcomes, vec![true, true, false, true, true, false]);
}

#[test]
fn test_simulated_sensor_stays_near_base() {
    let mut sensor = SimulatedSensor::new(22.0, 98.0);

    for _ in 0..100 {
        let (temperature, humidity) = sensor.acquire().unwrap();
        assert!((20.5..=23.5).contains(&temperature));
        assert!((0.0..=100.0).contains(&humidity));
    }
}
