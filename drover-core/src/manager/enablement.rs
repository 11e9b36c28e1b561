//! Which agent kinds a tenant gets

use std::fmt;

use crate::agent::AgentKind;
use crate::config::{AgentSettings, GlobalConfig, UserConfig};

/// Why a kind was left out of a tenant's set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// No section for the kind in the tenant config
    NotConfigured,
    /// Section present with `enabled = false`
    Disabled,
    /// A tenant or global credential the kind needs is missing
    MissingCredential(&'static str),
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => f.write_str("not configured"),
            Self::Disabled => f.write_str("disabled"),
            Self::MissingCredential(what) => write!(f, "missing {what} credentials"),
        }
    }
}

/// The kind's settings if every prerequisite holds
///
/// - email: enabled, tenant Gmail credentials, global Gmail client and LLM key
/// - legal, financial, task: enabled and LLM key
/// - stablecoin: enabled, Alchemy key and LLM key
pub fn check<'a>(
    kind: AgentKind,
    user: &'a UserConfig,
    global: &GlobalConfig,
) -> Result<&'a AgentSettings, Skip> {
    let settings = user.settings(kind).ok_or(Skip::NotConfigured)?;
    if !settings.enabled {
        return Err(Skip::Disabled);
    }

    match kind {
        AgentKind::Email => {
            if !user.credentials.gmail {
                return Err(Skip::MissingCredential("tenant gmail"));
            }
            if !global.has_gmail_client() {
                return Err(Skip::MissingCredential("gmail client"));
            }
        }
        AgentKind::Stablecoin => {
            if !global.has_alchemy() {
                return Err(Skip::MissingCredential("alchemy"));
            }
        }
        AgentKind::Legal | AgentKind::Financial | AgentKind::Task => {}
    }

    if !global.has_llm() {
        return Err(Skip::MissingCredential("llm"));
    }
    Ok(settings)
}
