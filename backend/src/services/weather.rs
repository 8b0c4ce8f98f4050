//! Weather provider chain
//!
//! History is strict: providers are tried in priority order and, when all of
//! them fail, the error is surfaced. Current conditions fall back to the
//! synthetic generator.

use std::sync::Arc;
use std::time::Duration;

use shared::{CurrentConditions, GpsCoordinates, WeatherDay};

use crate::error::{AppError, AppResult};
use crate::external::{SyntheticWeatherGenerator, WeatherProvider};

/// History returned by the first provider that answered
#[derive(Debug, Clone)]
pub struct HistoryFetch {
    pub source: &'static str,
    pub days: Vec<WeatherDay>,
}

pub struct WeatherProviderChain {
    providers: Vec<Arc<dyn WeatherProvider>>,
    generator: SyntheticWeatherGenerator,
    timeout: Duration,
}

impl WeatherProviderChain {
    pub fn new(
        providers: Vec<Arc<dyn WeatherProvider>>,
        generator: SyntheticWeatherGenerator,
        timeout: Duration,
    ) -> Self {
        Self {
            providers,
            generator,
            timeout,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Exactly `days` days of history, oldest first
    pub async fn history(&self, coords: GpsCoordinates, days: u32) -> AppResult<HistoryFetch> {
        if self.providers.is_empty() {
            return Err(AppError::UpstreamProvider(
                "no weather providers configured".to_string(),
            ));
        }

        let mut failures = Vec::with_capacity(self.providers.len());
        let mut all_timed_out = true;

        for provider in &self.providers {
            let outcome = tokio::time::timeout(self.timeout, provider.fetch_history(coords, days))
                .await
                .unwrap_or_else(|_| Err(AppError::UpstreamTimeout(provider.name().to_string())))
                .and_then(|history| {
                    if history.len() == days as usize {
                        Ok(history)
                    } else {
                        Err(AppError::UpstreamProvider(format!(
                            "{}: expected {} days, got {}",
                            provider.name(),
                            days,
                            history.len()
                        )))
                    }
                });

            match outcome {
                Ok(history) => {
                    return Ok(HistoryFetch {
                        source: provider.name(),
                        days: history,
                    })
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Weather history provider failed");
                    all_timed_out &= matches!(e, AppError::UpstreamTimeout(_));
                    failures.push(e.to_string());
                }
            }
        }

        let summary = failures.join("; ");
        if all_timed_out {
            Err(AppError::UpstreamTimeout(summary))
        } else {
            Err(AppError::UpstreamProvider(summary))
        }
    }

    /// Current conditions from the first provider that answers, else generated
    pub async fn current(&self, coords: GpsCoordinates) -> CurrentConditions {
        for provider in &self.providers {
            match tokio::time::timeout(self.timeout, provider.fetch_current(coords)).await {
                Ok(Ok(conditions)) => return conditions,
                Ok(Err(e)) => {
                    tracing::debug!(provider = provider.name(), error = %e, "Current conditions unavailable")
                }
                Err(_) => {
                    tracing::warn!(provider = provider.name(), "Current conditions request timed out")
                }
            }
        }

        tracing::warn!(
            latitude = coords.latitude,
            longitude = coords.longitude,
            "No provider returned current conditions, using synthetic values"
        );
        self.generator.generate(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;

    enum Behaviour {
        Answer,
        Fail,
        Hang,
        ShortHistory,
    }

    struct StubProvider {
        name: &'static str,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch_history(&self, _coords: GpsCoordinates, days: u32) -> AppResult<Vec<WeatherDay>> {
            match self.behaviour {
                Behaviour::Answer => Ok(vec![WeatherDay::default(); days as usize]),
                Behaviour::ShortHistory => Ok(vec![WeatherDay::default(); 2]),
                Behaviour::Fail => Err(AppError::UpstreamProvider(format!("{} down", self.name))),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Vec::new())
                }
            }
        }

        async fn fetch_current(&self, _coords: GpsCoordinates) -> AppResult<CurrentConditions> {
            match self.behaviour {
                Behaviour::Answer => Ok(CurrentConditions {
                    temperature: 31.0,
                    humidity: 60.0,
                    wind_speed: 2.0,
                    pressure: 1008.0,
                    observed_at: Utc::now(),
                    source: self.name.to_string(),
                }),
                _ => Err(AppError::UpstreamProvider("unavailable".to_string())),
            }
        }
    }

    fn chain(providers: Vec<(&'static str, Behaviour)>) -> WeatherProviderChain {
        WeatherProviderChain::new(
            providers
                .into_iter()
                .map(|(name, behaviour)| Arc::new(StubProvider { name, behaviour }) as Arc<dyn WeatherProvider>)
                .collect(),
            SyntheticWeatherGenerator::seeded(1),
            Duration::from_millis(50),
        )
    }

    fn bangkok() -> GpsCoordinates {
        GpsCoordinates::new(13.75, 100.5)
    }

    #[tokio::test]
    async fn test_history_fails_over_to_next_provider() {
        let chain = chain(vec![("first", Behaviour::Fail), ("second", Behaviour::Answer)]);
        let fetch = chain.history(bangkok(), 14).await.unwrap();
        assert_eq!(fetch.source, "second");
        assert_eq!(fetch.days.len(), 14);
    }

    #[tokio::test]
    async fn test_history_never_synthesised() {
        let chain = chain(vec![("first", Behaviour::Fail), ("second", Behaviour::ShortHistory)]);
        let err = chain.history(bangkok(), 14).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamProvider(_)));
    }

    #[tokio::test]
    async fn test_history_timeout_surfaces_as_timeout() {
        let chain = chain(vec![("slow", Behaviour::Hang)]);
        let err = chain.history(bangkok(), 14).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamTimeout(_)));
    }

    #[tokio::test]
    async fn test_current_falls_back_to_synthetic() {
        let chain = chain(vec![("first", Behaviour::Fail), ("slow", Behaviour::Hang)]);
        assert!(chain.current(bangkok()).await.is_synthetic());

        let live = chain_with_live();
        assert_eq!(live.current(bangkok()).await.source, "live");
    }

    fn chain_with_live() -> WeatherProviderChain {
        chain(vec![("first", Behaviour::Fail), ("live", Behaviour::Answer)])
    }
}
