//! Seeded synthetic notification and climate records for tests and demos

use crate::data::{ClimateObservation, EventRecord};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use weekly_math::cyclical_encoding;

const DAYS_PER_YEAR: f64 = 365.25;

/// Extra notifications added on one day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spike {
    pub date: NaiveDate,
    pub cases: u32,
}

/// Generator of daily case notifications
#[derive(Debug, Clone)]
pub struct EventGenerator {
    /// Regions the notifications are spread over, round-robin
    pub regions: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Mean notifications per day; 0 disables the background
    pub daily_rate: f64,
    /// Relative seasonal swing of the daily rate, in [0, 1]
    pub seasonal_amplitude: f64,
    /// Day of year on which the seasonal rate peaks
    pub peak_day: u32,
    pub spikes: Vec<Spike>,
    pub seed: u64,
}

impl EventGenerator {
    /// Background-free generator: only the spikes are emitted
    pub fn spikes_only(regions: Vec<String>, start: NaiveDate, end: NaiveDate, spikes: Vec<Spike>) -> Self {
        Self {
            regions,
            start,
            end,
            daily_rate: 0.0,
            seasonal_amplitude: 0.0,
            peak_day: 120,
            spikes,
            seed: 0,
        }
    }

    /// Generate records ordered by date
    ///
    /// # Returns
    /// * One [`EventRecord`] per notification
    pub fn generate(&self) -> Result<Vec<EventRecord>> {
        if self.regions.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one region is required".to_string(),
            ));
        }
        if self.start > self.end {
            return Err(ForecastError::InvalidParameter(format!(
                "Start date {} is after end date {}",
                self.start, self.end
            )));
        }
        if self.daily_rate < 0.0 || !(0.0..=1.0).contains(&self.seasonal_amplitude) {
            return Err(ForecastError::InvalidParameter(
                "daily_rate must be non-negative and seasonal_amplitude in [0, 1]".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut records = Vec::new();
        let mut next_region = 0usize;
        let mut date = self.start;

        while date <= self.end {
            let mut cases = 0u64;

            let rate = self.daily_rate * seasonal_factor(date, self.peak_day, self.seasonal_amplitude);
            if rate > 0.0 {
                let poisson = Poisson::new(rate).map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
                cases += poisson.sample(&mut rng) as u64;
            }
            cases += self
                .spikes
                .iter()
                .filter(|s| s.date == date)
                .map(|s| s.cases as u64)
                .sum::<u64>();

            for _ in 0..cases {
                records.push(EventRecord::new(self.regions[next_region].clone(), date));
                next_region = (next_region + 1) % self.regions.len();
            }
            date += Duration::days(1);
        }

        Ok(records)
    }
}

/// Generator of daily sub-regional weather readings
#[derive(Debug, Clone)]
pub struct ClimateGenerator {
    pub sub_regions: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Annual mean of the daily mean temperature (°C)
    pub mean_temperature: f64,
    /// Half the annual temperature swing (°C)
    pub temperature_swing: f64,
    /// Mean daily rainfall (mm) in the rainy season peak
    pub peak_rainfall: f64,
    /// Day of year on which rainfall peaks
    pub rainy_peak_day: u32,
    /// Standard deviation of the daily noise
    pub noise: f64,
    pub seed: u64,
}

impl ClimateGenerator {
    pub fn new(sub_regions: Vec<String>, start: NaiveDate, end: NaiveDate, seed: u64) -> Self {
        Self {
            sub_regions,
            start,
            end,
            mean_temperature: 25.0,
            temperature_swing: 2.5,
            peak_rainfall: 12.0,
            rainy_peak_day: 150,
            noise: 1.0,
            seed,
        }
    }

    /// One observation per sub-region and day, ordered by date then sub-region
    pub fn generate(&self) -> Result<Vec<ClimateObservation>> {
        if self.sub_regions.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one sub-region is required".to_string(),
            ));
        }
        if self.start > self.end {
            return Err(ForecastError::InvalidParameter(format!(
                "Start date {} is after end date {}",
                self.start, self.end
            )));
        }

        let noise = Normal::new(0.0, self.noise).map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut observations = Vec::new();
        let mut date = self.start;

        while date <= self.end {
            let rain_factor = seasonal_factor(date, self.rainy_peak_day, 1.0) / 2.0;
            // Warmest half a year away from the rainy peak
            let temp_factor = 1.0 - rain_factor * 2.0;

            for sub_region in &self.sub_regions {
                let temp_mean = self.mean_temperature + self.temperature_swing * temp_factor + noise.sample(&mut rng);
                let spread = 3.0 + rng.gen::<f64>() * 2.0;
                let precipitation_mm = if rng.gen::<f64>() < 0.3 + 0.5 * rain_factor {
                    (self.peak_rainfall * rain_factor * 2.0 + noise.sample(&mut rng) * 3.0).max(0.0)
                } else {
                    0.0
                };
                let humidity = (65.0 + 20.0 * rain_factor + noise.sample(&mut rng) * 2.0).clamp(0.0, 100.0);

                observations.push(ClimateObservation {
                    sub_region_id: sub_region.clone(),
                    date,
                    temp_max: temp_mean + spread,
                    temp_min: temp_mean - spread,
                    temp_mean,
                    precipitation_mm,
                    humidity,
                });
            }
            date += Duration::days(1);
        }

        Ok(observations)
    }
}

/// `1 + amplitude * cos(angle from the peak day)`, in `[1 - a, 1 + a]`
fn seasonal_factor(date: NaiveDate, peak_day: u32, amplitude: f64) -> f64 {
    let offset = date.ordinal() as f64 - peak_day as f64;
    let (_, cos) = cyclical_encoding(offset, DAYS_PER_YEAR);
    1.0 + amplitude * cos
}
