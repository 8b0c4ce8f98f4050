//! Seven-day forecast synthesis
//!
//! Day 1 blends the model's next-day temperature with an anchor temperature;
//! days 2-7 extrapolate a decaying trend plus a periodic variation and random
//! jitter. Two parameter presets exist: [`SynthesisParams::standard`] for the
//! named-field endpoint and [`SynthesisParams::lstm`] for the array endpoint.
//! Their outputs differ and are kept as separate presets.

use chrono::{Duration, NaiveDate};
use rand::Rng;

use crate::models::{ForecastDay, HistoryWindow, WeatherParameter, FORECAST_DAYS, TREND_DAYS};

/// Weight of the model prediction in the day-1 blend; the anchor gets the rest
pub const MODEL_WEIGHT: f64 = 0.1;
pub const ANCHOR_WEIGHT: f64 = 0.9;

/// Trends steeper than this are clamped to [`TREND_CLAMP`]
const TREND_LIMIT: f64 = 0.5;
const TREND_CLAMP: f64 = 0.3;
/// Trends flatter than this are replaced with jitter
const FLAT_TREND: f64 = 0.05;
const FLAT_TREND_JITTER: f64 = 0.1;
/// Minimum magnitude of the trend used for extrapolation
const MIN_EFFECTIVE_TREND: f64 = 0.1;
const DEFAULT_EFFECTIVE_TREND: f64 = 0.2;
/// Per-day geometric decay of the trend contribution
const TREND_DECAY: f64 = 0.9;

const HUMIDITY_BOUNDS: (f64, f64) = (30.0, 98.0);
const WIND_BOUNDS: (f64, f64) = (0.0, 30.0);
const PRESSURE_BOUNDS: (f64, f64) = (980.0, 1040.0);

/// Compression of excursions outside a preferred range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftClamp {
    pub lower: f64,
    pub upper: f64,
    /// Fraction of the excursion that survives compression
    pub retain: f64,
}

impl SoftClamp {
    pub fn apply(&self, value: f64) -> f64 {
        if value < self.lower {
            self.lower + (value - self.lower) * self.retain
        } else if value > self.upper {
            self.upper + (value - self.upper) * self.retain
        } else {
            value
        }
    }
}

/// Tunable constants of one synthesis variant
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisParams {
    pub name: &'static str,
    /// Multiplier applied to the trend after clamping
    pub trend_amplification: f64,
    /// Angular frequency of the periodic variation, per day
    pub variation_frequency: f64,
    pub variation_amplitude: f64,
    /// Half-width of the uniform jitter added to the variation
    pub variation_jitter: f64,
    pub soft_clamp: Option<SoftClamp>,
    pub min_temperature: f64,
    pub max_temperature: f64,
}

impl SynthesisParams {
    /// Preset for the named-field forecast endpoint
    pub fn standard() -> Self {
        Self {
            name: "standard",
            trend_amplification: 1.0,
            variation_frequency: 0.8,
            variation_amplitude: 1.2,
            variation_jitter: 0.8,
            soft_clamp: Some(SoftClamp {
                lower: 22.0,
                upper: 38.0,
                retain: 0.1,
            }),
            min_temperature: 20.0,
            max_temperature: 40.0,
        }
    }

    /// Preset for the array-form endpoint
    pub fn lstm() -> Self {
        Self {
            name: "lstm",
            trend_amplification: 2.5,
            variation_frequency: 1.0,
            variation_amplitude: 0.5,
            variation_jitter: 0.5,
            soft_clamp: None,
            min_temperature: 22.0,
            max_temperature: 38.0,
        }
    }

    fn clamp_temperature(&self, value: f64) -> f64 {
        let softened = match &self.soft_clamp {
            Some(soft) => soft.apply(value),
            None => value,
        };
        softened.clamp(self.min_temperature, self.max_temperature)
    }
}

/// Trend of the recent history, before and after adjustment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendEstimate {
    /// Mean day-over-day delta of the last seven observed temperatures
    pub raw: f64,
    /// Trend after clamping, flat-trend jitter and amplification
    pub applied: f64,
}

/// Mean of successive deltas; zero for fewer than two values
pub fn mean_delta(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let sum: f64 = values.windows(2).map(|w| w[1] - w[0]).sum();
    sum / (values.len() - 1) as f64
}

/// Inputs of one synthesis run
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    /// Inverse-transformed model prediction or the fallback mean
    pub raw_model_temp: f64,
    pub anchor_temp: f64,
    pub window: &'a HistoryWindow,
    /// Day 1 is dated `start_date + 1`
    pub start_date: NaiveDate,
}

/// Days produced by the synthesizer and the trend they were built from
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedWeek {
    pub days: Vec<ForecastDay>,
    pub trend: TrendEstimate,
}

/// Parameterised seven-day synthesizer
#[derive(Debug, Clone)]
pub struct ForecastSynthesizer {
    params: SynthesisParams,
}

impl ForecastSynthesizer {
    pub fn new(params: SynthesisParams) -> Self {
        Self { params }
    }

    pub fn standard() -> Self {
        Self::new(SynthesisParams::standard())
    }

    pub fn lstm() -> Self {
        Self::new(SynthesisParams::lstm())
    }

    pub fn params(&self) -> &SynthesisParams {
        &self.params
    }

    /// Day-1 temperature before clamping
    pub fn anchored(raw_model_temp: f64, anchor_temp: f64) -> f64 {
        raw_model_temp * MODEL_WEIGHT + anchor_temp * ANCHOR_WEIGHT
    }

    /// Estimate the recent trend; draws jitter from `rng` only for flat histories
    pub fn estimate_trend<R: Rng + ?Sized>(&self, window: &HistoryWindow, rng: &mut R) -> TrendEstimate {
        let temps: Vec<f64> = window
            .recent(TREND_DAYS)
            .iter()
            .map(|d| d.value(WeatherParameter::Temperature))
            .collect();
        let raw = mean_delta(&temps);

        let adjusted = if raw.abs() > TREND_LIMIT {
            TREND_CLAMP * raw.signum()
        } else if raw.abs() < FLAT_TREND {
            rng.gen_range(-FLAT_TREND_JITTER..=FLAT_TREND_JITTER)
        } else {
            raw
        };

        TrendEstimate {
            raw,
            applied: adjusted * self.params.trend_amplification,
        }
    }

    /// Produce seven forecast days
    pub fn synthesize<R: Rng + ?Sized>(&self, input: SynthesisInput<'_>, rng: &mut R) -> SynthesizedWeek {
        let trend = self.estimate_trend(input.window, rng);
        let day1 = Self::anchored(input.raw_model_temp, input.anchor_temp);

        let effective_trend = if trend.applied.abs() > MIN_EFFECTIVE_TREND {
            trend.applied
        } else if trend.applied >= 0.0 {
            DEFAULT_EFFECTIVE_TREND
        } else {
            -DEFAULT_EFFECTIVE_TREND
        };

        let averages = RecentAverages::of(input.window);
        let mut days = Vec::with_capacity(FORECAST_DAYS);

        for d in 1..=FORECAST_DAYS as u32 {
            let predicted = if d == 1 {
                day1
            } else {
                let p = &self.params;
                let df = d as f64;
                let variation = (df * p.variation_frequency).sin() * p.variation_amplitude
                    + rng.gen_range(-p.variation_jitter..=p.variation_jitter);
                let trend_factor = effective_trend * TREND_DECAY.powi(d as i32 - 1);
                day1 + trend_factor * (df - 1.0) + variation
            };

            let date = input.start_date + Duration::days(d as i64);
            days.push(ForecastDay {
                day: d,
                date,
                temperature: self.params.clamp_temperature(predicted),
                humidity: averages.humidity_for(d, rng),
                wind_speed: averages.wind_for(rng),
                pressure: averages.pressure_for(rng),
                day_name: date.format("%A").to_string(),
            });
        }

        SynthesizedWeek { days, trend }
    }
}

/// Seven-day historical averages of the auxiliary parameters
struct RecentAverages {
    humidity: f64,
    wind_speed: f64,
    pressure: f64,
}

impl RecentAverages {
    fn of(window: &HistoryWindow) -> Self {
        let recent = window.recent(TREND_DAYS);
        let mean = |parameter: WeatherParameter| {
            if recent.is_empty() {
                return parameter.default_value();
            }
            recent.iter().map(|d| d.value(parameter)).sum::<f64>() / recent.len() as f64
        };
        Self {
            humidity: mean(WeatherParameter::Humidity),
            wind_speed: mean(WeatherParameter::WindSpeed),
            pressure: mean(WeatherParameter::Pressure),
        }
    }

    fn humidity_for<R: Rng + ?Sized>(&self, day: u32, rng: &mut R) -> f64 {
        let value = self.humidity + rng.gen_range(-5.0..=5.0) + (day as f64).sin() * 2.0;
        value.clamp(HUMIDITY_BOUNDS.0, HUMIDITY_BOUNDS.1)
    }

    fn wind_for<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        (self.wind_speed + rng.gen_range(-1.0..=1.0)).clamp(WIND_BOUNDS.0, WIND_BOUNDS.1)
    }

    fn pressure_for<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        (self.pressure + rng.gen_range(-2.0..=2.0)).clamp(PRESSURE_BOUNDS.0, PRESSURE_BOUNDS.1)
    }
}
