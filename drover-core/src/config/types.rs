//! Configuration types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::{AgentKind, Schedule};

/// Per-tenant configuration: one optional section per agent kind
///
/// A missing section means the kind is disabled for the tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub credentials: TenantCredentials,
    pub email: Option<AgentSettings>,
    pub legal: Option<AgentSettings>,
    pub financial: Option<AgentSettings>,
    pub task: Option<AgentSettings>,
    pub stablecoin: Option<AgentSettings>,
}

impl UserConfig {
    pub fn settings(&self, kind: AgentKind) -> Option<&AgentSettings> {
        match kind {
            AgentKind::Email => self.email.as_ref(),
            AgentKind::Legal => self.legal.as_ref(),
            AgentKind::Financial => self.financial.as_ref(),
            AgentKind::Task => self.task.as_ref(),
            AgentKind::Stablecoin => self.stablecoin.as_ref(),
        }
    }

    /// Replace the section for `kind`
    pub fn with_settings(mut self, kind: AgentKind, settings: AgentSettings) -> Self {
        let slot = match kind {
            AgentKind::Email => &mut self.email,
            AgentKind::Legal => &mut self.legal,
            AgentKind::Financial => &mut self.financial,
            AgentKind::Task => &mut self.task,
            AgentKind::Stablecoin => &mut self.stablecoin,
        };
        *slot = Some(settings);
        self
    }

    pub fn with_gmail_credentials(mut self) -> Self {
        self.credentials.gmail = true;
        self
    }
}

/// Which tenant-owned credentials exist (the secrets stay with the provider)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantCredentials {
    /// The tenant completed the Gmail OAuth flow
    #[serde(default)]
    pub gmail: bool,
}

/// Settings for one agent kind within a tenant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Overrides the kind's default interval
    pub interval_minutes: Option<u64>,
    /// Forces a manual schedule
    #[serde(default)]
    pub manual: bool,
    /// Executor command line, overriding the global default
    pub command: Option<Vec<String>>,
    /// Agent-specific settings passed through to the executor
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentSettings {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn every(mut self, minutes: u64) -> Self {
        self.interval_minutes = Some(minutes);
        self.manual = false;
        self
    }

    pub fn manual(mut self) -> Self {
        self.manual = true;
        self
    }

    /// Effective schedule for `kind`
    pub fn schedule(&self, kind: AgentKind) -> Schedule {
        if self.manual {
            Schedule::Manual
        } else if let Some(minutes) = self.interval_minutes {
            Schedule::Interval { minutes }
        } else {
            kind.default_schedule()
        }
    }
}

/// Process-wide provider credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub llm: Option<ApiCredential>,
    pub gmail: Option<OAuthClient>,
    pub alchemy: Option<ApiCredential>,
    /// Default executor command line per agent kind name
    #[serde(default)]
    pub commands: std::collections::BTreeMap<String, Vec<String>>,
}

impl GlobalConfig {
    pub fn has_llm(&self) -> bool {
        self.llm.as_ref().is_some_and(ApiCredential::is_present)
    }

    pub fn has_gmail_client(&self) -> bool {
        self.gmail.as_ref().is_some_and(OAuthClient::is_present)
    }

    pub fn has_alchemy(&self) -> bool {
        self.alchemy.as_ref().is_some_and(ApiCredential::is_present)
    }

    /// Default command for `kind`, if any
    pub fn command_for(&self, kind: AgentKind) -> Option<&Vec<String>> {
        self.commands.get(kind.as_str())
    }

    /// Config with every provider credential filled in (tests, demos)
    pub fn fully_provisioned() -> Self {
        Self {
            llm: Some(ApiCredential::new("llm-key")),
            gmail: Some(OAuthClient {
                client_id: "gmail-client".to_string(),
                client_secret: "gmail-secret".to_string(),
            }),
            alchemy: Some(ApiCredential::new("alchemy-key")),
            commands: Default::default(),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCredential {
    pub api_key: String,
}

impl ApiCredential {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredential")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthClient {
    pub fn is_present(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_section_means_no_settings() {
        let config = UserConfig::default();
        assert!(config.settings(AgentKind::Email).is_none());
    }

    #[test]
    fn with_settings_fills_the_right_slot() {
        let config = UserConfig::default().with_settings(AgentKind::Task, AgentSettings::enabled());
        assert!(config.settings(AgentKind::Task).is_some());
        assert!(config.settings(AgentKind::Legal).is_none());
    }

    #[test]
    fn schedule_falls_back_to_kind_default() {
        let settings = AgentSettings::enabled();
        assert_eq!(
            settings.schedule(AgentKind::Email),
            Schedule::Interval { minutes: 5 }
        );
        assert_eq!(settings.schedule(AgentKind::Legal), Schedule::Manual);
    }

    #[test]
    fn schedule_overrides_apply() {
        assert_eq!(
            AgentSettings::enabled().every(1).schedule(AgentKind::Legal),
            Schedule::Interval { minutes: 1 }
        );
        assert_eq!(
            AgentSettings::enabled().manual().schedule(AgentKind::Email),
            Schedule::Manual
        );
    }

    #[test]
    fn blank_credentials_are_not_present() {
        let global = GlobalConfig {
            llm: Some(ApiCredential::new("  ")),
            ..GlobalConfig::default()
        };
        assert!(!global.has_llm());
        assert!(GlobalConfig::fully_provisioned().has_llm());
        assert!(GlobalConfig::fully_provisioned().has_gmail_client());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let debug = format!("{:?}", GlobalConfig::fully_provisioned());
        assert!(!debug.contains("llm-key"));
        assert!(!debug.contains("gmail-secret"));
        assert!(debug.contains("gmail-client"));
    }

    #[test]
    fn settings_parse_from_toml_with_extra_keys() {
        let config: UserConfig = toml::from_str(
            r#"
            [credentials]
            gmail = true

            [stablecoin]
            enabled = true
            interval_minutes = 15
            addresses = ["0xabc"]
            "#,
        )
        .unwrap();
        assert!(config.credentials.gmail);
        let settings = config.settings(AgentKind::Stablecoin).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.interval_minutes, Some(15));
        assert_eq!(settings.extra["addresses"][0], "0xabc");
    }
}
