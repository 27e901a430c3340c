pub mod calendar;
pub mod config;
pub mod event;
pub mod member;
pub mod schedule;
pub mod watch;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use groupcal_core::{
    FileStore, FixedIdentityProvider, GroupCalConfig, Identity, IdentityProvider, ScheduleService,
};

use crate::notify::TerminalNotifier;

/// Everything a command needs: who is acting, and against which store.
pub struct Context {
    pub config: GroupCalConfig,
    pub identities: FixedIdentityProvider,
    pub identity: Identity,
    pub service: ScheduleService<FileStore>,
    pub notifier: TerminalNotifier,
}

impl Context {
    /// Open the store and register the configured identity in the user
    /// directory so others can add it by email.
    pub async fn load(config: GroupCalConfig) -> Result<Self> {
        let identities = config.identity_provider()?;
        let identity = identities.require_identity()?;
        let service = ScheduleService::new(config.open_store()?);
        service.upsert_user(&identity).await?;

        tracing::debug!(user = %identity.id, data = %config.data_path().display(), "loaded context");
        Ok(Context {
            config,
            identities,
            identity,
            service,
            notifier: TerminalNotifier,
        })
    }

    /// Re-read the config file so a removed or replaced identity signs
    /// this process out.
    pub fn refresh_identity(&self) -> Result<bool> {
        let latest = GroupCalConfig::load()?.identity().ok();
        Ok(self.identities.follow(latest))
    }

    pub fn schedule_id(&self, explicit: Option<&str>) -> Result<String> {
        Ok(self.config.schedule_or_default(explicit)?)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
