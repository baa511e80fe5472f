use std::env;
use std::str::FromStr;
use tracing::warn;

/// Severity score boundaries used to label and route triage outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityThresholds {
    /// Highest score labelled Low.
    pub low_max: u8,
    /// Highest score labelled Moderate.
    pub moderate_max: u8,
    /// Highest score labelled High. Anything above is Critical.
    pub high_max: u8,
    /// Lowest score routed to the emergency queue.
    pub emergency_threshold: u8,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            low_max: 3,
            moderate_max: 6,
            high_max: 8,
            emergency_threshold: 8,
        }
    }
}

impl SeverityThresholds {
    pub fn is_valid(&self) -> bool {
        self.low_max >= 1
            && self.low_max < self.moderate_max
            && self.moderate_max < self.high_max
            && self.high_max < 10
            && (1..=10).contains(&self.emergency_threshold)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub classifier_url: Option<String>,
    pub classifier_timeout_ms: u64,
    pub roster_timeout_ms: u64,
    pub max_symptom_length: usize,
    pub average_consultation_minutes: u32,
    pub severity: SeverityThresholds,
    pub api_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            classifier_url: None,
            classifier_timeout_ms: 2000,
            roster_timeout_ms: 1000,
            max_symptom_length: 2000,
            average_consultation_minutes: 15,
            severity: SeverityThresholds::default(),
            api_port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using in-memory persistence");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            classifier_url: env::var("CLASSIFIER_URL").ok().filter(|url| !url.is_empty()),
            classifier_timeout_ms: parse_var("CLASSIFIER_TIMEOUT_MS", defaults.classifier_timeout_ms),
            roster_timeout_ms: parse_var("ROSTER_TIMEOUT_MS", defaults.roster_timeout_ms),
            max_symptom_length: parse_var("MAX_SYMPTOM_LENGTH", defaults.max_symptom_length),
            average_consultation_minutes: parse_var(
                "AVERAGE_CONSULTATION_MINUTES",
                defaults.average_consultation_minutes,
            ),
            severity: SeverityThresholds {
                low_max: parse_var("SEVERITY_LOW_MAX", defaults.severity.low_max),
                moderate_max: parse_var("SEVERITY_MODERATE_MAX", defaults.severity.moderate_max),
                high_max: parse_var("SEVERITY_HIGH_MAX", defaults.severity.high_max),
                emergency_threshold: parse_var("EMERGENCY_THRESHOLD", defaults.severity.emergency_threshold),
            },
            api_port: parse_var("API_PORT", defaults.api_port),
        };

        if !config.severity.is_valid() {
            warn!("Severity thresholds {:?} are not monotonic, default policy will be used", config.severity);
        }

        if !config.is_persistence_configured() {
            warn!("Supabase persistence not configured - appointments will not survive restarts");
        }

        config
    }

    pub fn is_persistence_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    pub fn is_remote_classifier_configured(&self) -> bool {
        self.classifier_url.is_some()
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has unparsable value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
