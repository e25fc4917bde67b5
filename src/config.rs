use std::collections::HashMap;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::ConfigError;

pub const DEFAULT_TARGET_URL: &str = "https://annamalaiyar.hrce.tn.gov.in/ticketing/service_collection.php?tid=20343&scode=21&sscode=1&target_type=&fees_slno=3778463716&group_id=4&action=P";
pub const DEFAULT_RECIPIENT: &str = "+15555550100";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";
const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";
const DEFAULT_INTERVAL_MINUTES: u64 = 5;
const DEFAULT_RETRY_SECONDS: u64 = 60;
const DEFAULT_WAIT_SECONDS: u64 = 20;
const DEFAULT_SETTLE_SECONDS: u64 = 5;
const CHECK_SLACK_SECONDS: u64 = 60;

/// Raw `KEY=VALUE` pairs read from a dotenv-style file.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: String,
    pub whatsapp_from: String,
    pub api_base: String,
}

impl TwilioSettings {
    /// Account id with the middle hidden, for startup logging.
    pub fn masked_sid(&self) -> String {
        let sid = &self.account_sid;
        if sid.chars().count() <= 10 {
            return "***".to_string();
        }
        let head: String = sid.chars().take(6).collect();
        let tail: String = sid.chars().skip(sid.chars().count() - 4).collect();
        format!("{}...{}", head, tail)
    }
}

/// Everything the monitor needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub twilio: TwilioSettings,
    pub recipients: Vec<String>,
    pub target_url: String,
    pub webdriver_url: String,
    pub interval: Duration,
    pub retry_delay: Duration,
    pub calendar_wait: Duration,
    pub page_settle: Duration,
    /// Upper bound for loading and reading the calendar in one cycle.
    pub check_timeout: Duration,
    pub calendar_label: Option<String>,
    pub timezone: Tz,
}

impl MonitorConfig {
    /// Resolves settings with `lookup` (file values first, then environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let twilio = TwilioSettings {
            account_sid: require("TWILIO_ACCOUNT_SID")?,
            auth_token: require("TWILIO_AUTH_TOKEN")?,
            whatsapp_from: require("TWILIO_WHATSAPP_FROM")?,
            api_base: get("TWILIO_API_BASE").unwrap_or(DEFAULT_TWILIO_API_BASE.to_string()),
        };

        let recipients = parse_recipients(
            &get("NOTIFICATION_NUMBERS").unwrap_or(DEFAULT_RECIPIENT.to_string()),
        );
        if recipients.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "NOTIFICATION_NUMBERS",
                value: get("NOTIFICATION_NUMBERS").unwrap_or_default(),
            });
        }

        let timezone_name = get("MONITOR_TIMEZONE").unwrap_or(DEFAULT_TIMEZONE.to_string());
        let timezone = Tz::from_str(&timezone_name).map_err(|_| ConfigError::InvalidValue {
            key: "MONITOR_TIMEZONE",
            value: timezone_name.clone(),
        })?;

        let interval = minutes_to_duration(
            "CHECK_INTERVAL_MINUTES",
            parse_u64(&get, "CHECK_INTERVAL_MINUTES", DEFAULT_INTERVAL_MINUTES)?,
        )?;
        let retry_delay =
            Duration::from_secs(parse_u64(&get, "RETRY_DELAY_SECONDS", DEFAULT_RETRY_SECONDS)?);
        let wait_secs = parse_u64(&get, "CALENDAR_WAIT_SECONDS", DEFAULT_WAIT_SECONDS)?;
        let settle_secs = parse_u64(&get, "PAGE_SETTLE_SECONDS", DEFAULT_SETTLE_SECONDS)?;
        let check_timeout = wait_secs
            .checked_add(settle_secs)
            .and_then(|secs| secs.checked_add(CHECK_SLACK_SECONDS))
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidValue {
                key: "CALENDAR_WAIT_SECONDS",
                value: wait_secs.to_string(),
            })?;

        Ok(Self {
            twilio,
            recipients,
            target_url: get("TARGET_URL").unwrap_or(DEFAULT_TARGET_URL.to_string()),
            webdriver_url: get("WEBDRIVER_URL").unwrap_or(DEFAULT_WEBDRIVER_URL.to_string()),
            interval,
            retry_delay,
            calendar_wait: Duration::from_secs(wait_secs),
            page_settle: Duration::from_secs(settle_secs),
            check_timeout,
            calendar_label: get("CALENDAR_LABEL"),
            timezone,
        })
    }
}

/// Converts a minute count from `key` into a `Duration`, rejecting overflow.
pub fn minutes_to_duration(key: &'static str, minutes: u64) -> Result<Duration, ConfigError> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or(ConfigError::InvalidValue {
            key,
            value: minutes.to_string(),
        })
}

pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_u64<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    const CREDENTIALS: [(&str, &str); 3] = [
        ("TWILIO_ACCOUNT_SID", "AC0123456789abcdef"),
        ("TWILIO_AUTH_TOKEN", "secret"),
        ("TWILIO_WHATSAPP_FROM", "+14155238886"),
    ];

    #[test]
    fn parse_handles_comments_exports_and_quotes() {
        let config = AppConfig::parse(
            "# twilio\nexport TWILIO_AUTH_TOKEN=\"abc\"\n\nCALENDAR_LABEL='January 2025'\nA = b\n",
        )
        .unwrap();
        assert_eq!(config.get("TWILIO_AUTH_TOKEN").as_deref(), Some("abc"));
        assert_eq!(config.get("CALENDAR_LABEL").as_deref(), Some("January 2025"));
        assert_eq!(config.get("A").as_deref(), Some("b"));
        assert!(config.get("missing").is_none());
    }

    #[test]
    fn parse_rejects_lines_without_equals() {
        let err = AppConfig::parse("GOOD=1\nbroken line\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLine { line: 2, .. }));
    }

    #[test]
    fn defaults_apply_when_optional_keys_unset() {
        let config = MonitorConfig::from_lookup(lookup_from(&CREDENTIALS)).unwrap();
        assert_eq!(config.recipients, vec![DEFAULT_RECIPIENT.to_string()]);
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.retry_delay, Duration::from_secs(60));
        assert_eq!(config.calendar_wait, Duration::from_secs(20));
        assert_eq!(config.check_timeout, Duration::from_secs(85));
        assert_eq!(config.target_url, DEFAULT_TARGET_URL);
        assert_eq!(config.timezone, chrono_tz::Asia::Kolkata);
        assert!(config.calendar_label.is_none());
    }

    #[test]
    fn recipients_are_split_and_trimmed() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("NOTIFICATION_NUMBERS", " +911, +912 ,,+913"));
        let config = MonitorConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.recipients, vec!["+911", "+912", "+913"]);
    }

    #[test]
    fn missing_credentials_fail() {
        let err = MonitorConfig::from_lookup(lookup_from(&CREDENTIALS[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TWILIO_WHATSAPP_FROM")));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("CHECK_INTERVAL_MINUTES", "often"));
        let err = MonitorConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "CHECK_INTERVAL_MINUTES",
                ..
            }
        ));
    }

    #[test]
    fn overflowing_interval_is_rejected() {
        let max = u64::MAX.to_string();
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("CHECK_INTERVAL_MINUTES", max.as_str()));
        let err = MonitorConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "CHECK_INTERVAL_MINUTES",
                ..
            }
        ));
    }

    #[test]
    fn overflowing_calendar_wait_is_rejected() {
        let max = u64::MAX.to_string();
        let mut pairs = CREDENTIALS.to_vec();
        pairs.push(("CALENDAR_WAIT_SECONDS", max.as_str()));
        pairs.push(("PAGE_SETTLE_SECONDS", "5"));
        let err = MonitorConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "CALENDAR_WAIT_SECONDS",
                ..
            }
        ));
    }

    #[test]
    fn minutes_to_duration_checks_overflow() {
        assert_eq!(
            minutes_to_duration("--interval-minutes", 2).unwrap(),
            Duration::from_secs(120)
        );
        assert!(minutes_to_duration("--interval-minutes", u64::MAX).is_err());
    }

    #[test]
    fn masked_sid_hides_middle() {
        let config = MonitorConfig::from_lookup(lookup_from(&CREDENTIALS)).unwrap();
        assert_eq!(config.twilio.masked_sid(), "AC0123...cdef");
    }
}
