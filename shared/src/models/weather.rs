//! Weather observation models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, PipelineResult};

/// Number of days the sequence model looks back
pub const WINDOW_DAYS: usize = 14;

/// Number of weather parameters per day
pub const FEATURE_COUNT: usize = 10;

/// Days of history used for trend and auxiliary averages
pub const TREND_DAYS: usize = 7;

/// The ten observed weather parameters, in model feature order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherParameter {
    #[serde(rename = "T2M")]
    Temperature,
    #[serde(rename = "T2M_MIN")]
    TemperatureMin,
    #[serde(rename = "T2M_MAX")]
    TemperatureMax,
    #[serde(rename = "RH2M")]
    Humidity,
    #[serde(rename = "WS10M")]
    WindSpeed,
    #[serde(rename = "WD10M")]
    WindDirection,
    #[serde(rename = "PS")]
    Pressure,
    #[serde(rename = "PRECTOTCORR")]
    Precipitation,
    #[serde(rename = "ALLSKY_SFC_SW_DWN")]
    SolarIrradiance,
    #[serde(rename = "ALLSKY_SFC_UVA")]
    UvIndex,
}

impl WeatherParameter {
    /// All parameters in model feature order
    pub const ALL: [WeatherParameter; FEATURE_COUNT] = [
        WeatherParameter::Temperature,
        WeatherParameter::TemperatureMin,
        WeatherParameter::TemperatureMax,
        WeatherParameter::Humidity,
        WeatherParameter::WindSpeed,
        WeatherParameter::WindDirection,
        WeatherParameter::Pressure,
        WeatherParameter::Precipitation,
        WeatherParameter::SolarIrradiance,
        WeatherParameter::UvIndex,
    ];

    /// Wire name used by clients and by NASA POWER
    pub fn key(&self) -> &'static str {
        match self {
            WeatherParameter::Temperature => "T2M",
            WeatherParameter::TemperatureMin => "T2M_MIN",
            WeatherParameter::TemperatureMax => "T2M_MAX",
            WeatherParameter::Humidity => "RH2M",
            WeatherParameter::WindSpeed => "WS10M",
            WeatherParameter::WindDirection => "WD10M",
            WeatherParameter::Pressure => "PS",
            WeatherParameter::Precipitation => "PRECTOTCORR",
            WeatherParameter::SolarIrradiance => "ALLSKY_SFC_SW_DWN",
            WeatherParameter::UvIndex => "ALLSKY_SFC_UVA",
        }
    }

    /// Column index in the feature tensor
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Physical range every observation is clamped to
    pub fn range(&self) -> (f64, f64) {
        match self {
            WeatherParameter::Temperature
            | WeatherParameter::TemperatureMin
            | WeatherParameter::TemperatureMax => (-50.0, 60.0),
            WeatherParameter::Humidity => (0.0, 100.0),
            WeatherParameter::WindSpeed => (0.0, 50.0),
            WeatherParameter::WindDirection => (0.0, 360.0),
            WeatherParameter::Pressure => (800.0, 1100.0),
            WeatherParameter::Precipitation => (0.0, 500.0),
            WeatherParameter::SolarIrradiance => (0.0, 1500.0),
            WeatherParameter::UvIndex => (0.0, 20.0),
        }
    }

    /// Value substituted when a client omits the parameter
    pub fn default_value(&self) -> f64 {
        match self {
            WeatherParameter::Temperature => 28.0,
            WeatherParameter::TemperatureMin => 24.0,
            WeatherParameter::TemperatureMax => 32.0,
            WeatherParameter::Humidity => 75.0,
            WeatherParameter::WindSpeed => 3.0,
            WeatherParameter::WindDirection => 180.0,
            WeatherParameter::Pressure => 1010.0,
            WeatherParameter::Precipitation => 0.0,
            WeatherParameter::SolarIrradiance => 200.0,
            WeatherParameter::UvIndex => 5.0,
        }
    }

    /// Clamp a raw reading into the physical range, defaulting missing or non-finite values
    pub fn resolve(&self, value: Option<f64>) -> f64 {
        let (min, max) = self.range();
        match value {
            Some(v) if v.is_finite() => v.clamp(min, max),
            _ => self.default_value(),
        }
    }
}

/// One day of observed weather as sent by clients or returned by providers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherDay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "T2M", default)]
    pub t2m: Option<f64>,
    #[serde(rename = "T2M_MIN", default)]
    pub t2m_min: Option<f64>,
    #[serde(rename = "T2M_MAX", default)]
    pub t2m_max: Option<f64>,
    #[serde(rename = "RH2M", default)]
    pub rh2m: Option<f64>,
    #[serde(rename = "WS10M", default)]
    pub ws10m: Option<f64>,
    #[serde(rename = "WD10M", default)]
    pub wd10m: Option<f64>,
    #[serde(rename = "PS", default)]
    pub ps: Option<f64>,
    #[serde(rename = "PRECTOTCORR", default)]
    pub prectotcorr: Option<f64>,
    #[serde(rename = "ALLSKY_SFC_SW_DWN", default)]
    pub allsky_sfc_sw_dwn: Option<f64>,
    #[serde(rename = "ALLSKY_SFC_UVA", default)]
    pub allsky_sfc_uva: Option<f64>,
}

impl WeatherDay {
    /// Raw reading for a parameter, if present
    pub fn get(&self, parameter: WeatherParameter) -> Option<f64> {
        match parameter {
            WeatherParameter::Temperature => self.t2m,
            WeatherParameter::TemperatureMin => self.t2m_min,
            WeatherParameter::TemperatureMax => self.t2m_max,
            WeatherParameter::Humidity => self.rh2m,
            WeatherParameter::WindSpeed => self.ws10m,
            WeatherParameter::WindDirection => self.wd10m,
            WeatherParameter::Pressure => self.ps,
            WeatherParameter::Precipitation => self.prectotcorr,
            WeatherParameter::SolarIrradiance => self.allsky_sfc_sw_dwn,
            WeatherParameter::UvIndex => self.allsky_sfc_uva,
        }
    }

    pub fn set(&mut self, parameter: WeatherParameter, value: Option<f64>) {
        let slot = match parameter {
            WeatherParameter::Temperature => &mut self.t2m,
            WeatherParameter::TemperatureMin => &mut self.t2m_min,
            WeatherParameter::TemperatureMax => &mut self.t2m_max,
            WeatherParameter::Humidity => &mut self.rh2m,
            WeatherParameter::WindSpeed => &mut self.ws10m,
            WeatherParameter::WindDirection => &mut self.wd10m,
            WeatherParameter::Pressure => &mut self.ps,
            WeatherParameter::Precipitation => &mut self.prectotcorr,
            WeatherParameter::SolarIrradiance => &mut self.allsky_sfc_sw_dwn,
            WeatherParameter::UvIndex => &mut self.allsky_sfc_uva,
        };
        *slot = value;
    }

    /// Build a day from values in feature order (pressure in hPa)
    pub fn from_values(date: Option<NaiveDate>, values: &[f64; FEATURE_COUNT]) -> Self {
        let mut day = WeatherDay {
            date,
            ..Default::default()
        };
        for (parameter, value) in WeatherParameter::ALL.iter().zip(values.iter()) {
            day.set(*parameter, Some(*value));
        }
        day
    }
}

/// A weather day after clamping and defaulting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedDay {
    pub date: Option<NaiveDate>,
    /// Values in feature order, pressure still in hPa
    pub values: [f64; FEATURE_COUNT],
}

impl ObservedDay {
    pub fn from_weather_day(day: &WeatherDay) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        for (slot, parameter) in values.iter_mut().zip(WeatherParameter::ALL.iter()) {
            *slot = parameter.resolve(day.get(*parameter));
        }
        Self {
            date: day.date,
            values,
        }
    }

    pub fn value(&self, parameter: WeatherParameter) -> f64 {
        self.values[parameter.index()]
    }
}

/// Exactly fourteen observed days, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    days: Vec<ObservedDay>,
}

impl HistoryWindow {
    /// Build a window from named-field days; the length must be exactly 14
    pub fn from_days(days: &[WeatherDay]) -> PipelineResult<Self> {
        if days.len() != WINDOW_DAYS {
            return Err(ForecastError::ShapeMismatch {
                expected: WINDOW_DAYS,
                actual: days.len(),
            });
        }
        Ok(Self {
            days: days.iter().map(ObservedDay::from_weather_day).collect(),
        })
    }

    /// Build a window from array-form rows, using only the most recent 14
    pub fn from_rows(rows: &[Vec<f64>]) -> PipelineResult<Self> {
        if rows.len() < WINDOW_DAYS {
            return Err(ForecastError::ShapeMismatch {
                expected: WINDOW_DAYS,
                actual: rows.len(),
            });
        }

        let start = rows.len() - WINDOW_DAYS;
        let mut days = Vec::with_capacity(WINDOW_DAYS);
        for (offset, row) in rows[start..].iter().enumerate() {
            if row.len() != FEATURE_COUNT {
                return Err(ForecastError::FeatureCount {
                    day: start + offset,
                    expected: FEATURE_COUNT,
                    actual: row.len(),
                });
            }
            let mut day = WeatherDay::default();
            for (parameter, value) in WeatherParameter::ALL.iter().zip(row.iter()) {
                day.set(*parameter, Some(*value));
            }
            days.push(ObservedDay::from_weather_day(&day));
        }

        Ok(Self { days })
    }

    pub fn days(&self) -> &[ObservedDay] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// The most recent `n` days (or fewer if the window is shorter)
    pub fn recent(&self, n: usize) -> &[ObservedDay] {
        let start = self.days.len().saturating_sub(n);
        &self.days[start..]
    }

    /// Last observed daily mean temperature
    pub fn last_temperature(&self) -> f64 {
        self.days
            .last()
            .map(|d| d.value(WeatherParameter::Temperature))
            .unwrap_or_else(|| WeatherParameter::Temperature.default_value())
    }

    /// Date of the most recent observation, if known
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().and_then(|d| d.date)
    }
}

/// Current conditions at a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub pressure: f64,
    pub observed_at: DateTime<Utc>,
    pub source: String,
}

impl CurrentConditions {
    /// Whether the reading came from the synthetic generator
    pub fn is_synthetic(&self) -> bool {
        self.source == crate::SYNTHETIC_SOURCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(t2m: f64) -> WeatherDay {
        WeatherDay {
            t2m: Some(t2m),
            ..Default::default()
        }
    }

    #[test]
    fn test_parameter_order_matches_indices() {
        for (i, p) in WeatherParameter::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
        assert_eq!(WeatherParameter::Pressure.index(), 6);
    }

    #[test]
    fn test_resolve_clamps_and_defaults() {
        assert_eq!(WeatherParameter::Temperature.resolve(Some(75.0)), 60.0);
        assert_eq!(WeatherParameter::Humidity.resolve(Some(-3.0)), 0.0);
        assert_eq!(WeatherParameter::Pressure.resolve(None), 1010.0);
        assert_eq!(WeatherParameter::WindSpeed.resolve(Some(f64::NAN)), 3.0);
    }

    #[test]
    fn test_window_requires_exactly_fourteen_days() {
        let days: Vec<WeatherDay> = (0..10).map(|i| day(25.0 + i as f64)).collect();
        let err = HistoryWindow::from_days(&days).unwrap_err();
        assert_eq!(err, ForecastError::ShapeMismatch { expected: 14, actual: 10 });

        let days: Vec<WeatherDay> = (0..15).map(|i| day(25.0 + i as f64)).collect();
        assert!(HistoryWindow::from_days(&days).is_err());
    }

    #[test]
    fn test_array_window_uses_last_fourteen_rows() {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let mut row = vec![0.0; FEATURE_COUNT];
                row[0] = i as f64;
                row[6] = 1010.0;
                row
            })
            .collect();
        let window = HistoryWindow::from_rows(&rows).unwrap();
        assert_eq!(window.len(), 14);
        assert_eq!(window.days()[0].value(WeatherParameter::Temperature), 6.0);
        assert_eq!(window.last_temperature(), 19.0);
    }

    #[test]
    fn test_array_window_rejects_wrong_feature_count() {
        let mut rows: Vec<Vec<f64>> = vec![vec![25.0; FEATURE_COUNT]; 14];
        rows[5] = vec![25.0; 9];
        let err = HistoryWindow::from_rows(&rows).unwrap_err();
        assert_eq!(err, ForecastError::FeatureCount { day: 5, expected: 10, actual: 9 });
    }

    #[test]
    fn test_weather_day_deserializes_wire_names() {
        let json = r#"{"date":"2024-03-01","T2M":29.5,"RH2M":70,"PS":1008.2}"#;
        let parsed: WeatherDay = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.t2m, Some(29.5));
        assert_eq!(parsed.ps, Some(1008.2));
        assert_eq!(parsed.ws10m, None);
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 3, 1));
    }
}
