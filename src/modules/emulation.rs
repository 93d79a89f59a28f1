//! The `emulation` domain: per-context overrides.
//!
//! Every override applies to the listed browsing contexts, the listed user
//! contexts, or (both absent) globally.
//!
//! # Null Semantics
//!
//! Override values are three-state on the wire. The façade maps them so
//! that passing `None` sends an explicit `null`, which clears the override:
//!
//! | Field | `null` means |
//! |-------|--------------|
//! | `coordinates` | clear geolocation override |
//! | `locale` | restore the default locale |
//! | `timezone` | restore the host timezone |
//! | `userAgent` | restore the default user agent |
//! | `screenOrientation` | restore the real orientation |
//! | `enabled` (scripting) | re-enable scripting |
//! | `theme` | stop forcing colors |

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use tracing::debug;

use crate::codec::Nullable;
use crate::error::{Error, Result};
use crate::identifiers::{BrowsingContextId, UserContextId};
use crate::protocol::{EmptyResult, bidi_commands};

// ============================================================================
// Commands
// ============================================================================

bidi_commands! {
    /// `emulation.*` commands.
    pub enum EmulationCommand {
        SetForcedColorsModeThemeOverride(SetForcedColorsModeThemeOverrideParameters) =
            "emulation.setForcedColorsModeThemeOverride",
        SetGeolocationOverride(SetGeolocationOverrideParameters) =
            "emulation.setGeolocationOverride",
        SetLocaleOverride(SetLocaleOverrideParameters) = "emulation.setLocaleOverride",
        SetScreenOrientationOverride(SetScreenOrientationOverrideParameters) =
            "emulation.setScreenOrientationOverride",
        SetScriptingEnabled(SetScriptingEnabledParameters) = "emulation.setScriptingEnabled",
        SetTimezoneOverride(SetTimezoneOverrideParameters) = "emulation.setTimezoneOverride",
        SetUserAgentOverride(SetUserAgentOverrideParameters) = "emulation.setUserAgentOverride",
    }
}

// ============================================================================
// Targets
// ============================================================================

/// Where an override applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmulationTargets {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<BrowsingContextId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_contexts: Option<Vec<UserContextId>>,
}

impl EmulationTargets {
    /// Applies to every context.
    #[inline]
    #[must_use]
    pub fn global() -> Self {
        Self::default()
    }

    /// Applies to the given top-level contexts.
    #[inline]
    #[must_use]
    pub fn contexts(contexts: impl IntoIterator<Item = BrowsingContextId>) -> Self {
        Self {
            contexts: Some(contexts.into_iter().collect()),
            user_contexts: None,
        }
    }

    /// Applies to every context in the given user contexts.
    #[inline]
    #[must_use]
    pub fn user_contexts(user_contexts: impl IntoIterator<Item = UserContextId>) -> Self {
        Self {
            contexts: None,
            user_contexts: Some(user_contexts.into_iter().collect()),
        }
    }

    fn validated(self) -> Result<Self> {
        if self.contexts.is_some() && self.user_contexts.is_some() {
            return Err(Error::invalid_argument(
                "contexts and userContexts are mutually exclusive",
            ));
        }
        Ok(self)
    }
}

// ============================================================================
// Parameter Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ForcedColorsModeTheme {
    Light,
    Dark,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SetForcedColorsModeThemeOverrideParameters {
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub theme: Nullable<ForcedColorsModeTheme>,
    #[serde(flatten)]
    pub targets: EmulationTargets,
}

/// Emulated position. Only `latitude` and `longitude` are required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeolocationCoordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl GeolocationCoordinates {
    /// Coordinates with every optional field unset.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Self::default()
        }
    }
}

/// The geolocation override: coordinates, `null` to clear, or an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeolocationOverride {
    /// `None` sends `coordinates: null`.
    Coordinates {
        coordinates: Option<GeolocationCoordinates>,
    },
    /// Every position request fails.
    Error { error: GeolocationPositionError },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename = "positionUnavailable")]
pub struct GeolocationPositionError {}

#[derive(Debug, Clone, Serialize)]
pub struct SetGeolocationOverrideParameters {
    #[serde(flatten)]
    pub geolocation: GeolocationOverride,
    #[serde(flatten)]
    pub targets: EmulationTargets,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SetLocaleOverrideParameters {
    /// BCP 47 tag.
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub locale: Nullable<String>,
    #[serde(flatten)]
    pub targets: EmulationTargets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScreenOrientationNatural {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenOrientationType {
    PortraitPrimary,
    PortraitSecondary,
    LandscapePrimary,
    LandscapeSecondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenOrientation {
    pub natural: ScreenOrientationNatural,
    #[serde(rename = "type")]
    pub kind: ScreenOrientationType,
}

/// `screen_orientation` is always sent; `None` encodes `null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScreenOrientationOverrideParameters {
    pub screen_orientation: Option<ScreenOrientation>,
    #[serde(flatten)]
    pub targets: EmulationTargets,
}

/// `enabled` is always sent and may only be `false` or `null`.
#[derive(Debug, Clone, Serialize)]
pub struct SetScriptingEnabledParameters {
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub targets: EmulationTargets,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SetTimezoneOverrideParameters {
    /// IANA name (`Europe/Berlin`) or offset (`+01:00`).
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub timezone: Nullable<String>,
    #[serde(flatten)]
    pub targets: EmulationTargets,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetUserAgentOverrideParameters {
    #[serde(default, skip_serializing_if = "Nullable::is_absent")]
    pub user_agent: Nullable<String>,
    #[serde(flatten)]
    pub targets: EmulationTargets,
}

// ============================================================================
// EmulationModule
// ============================================================================

facade! {
    /// `emulation.*` façade.
    pub struct EmulationModule;
    commands: EmulationCommand;
}

impl EmulationModule {
    async fn apply(&self, command: EmulationCommand) -> Result<()> {
        debug!(method = command.method(), "Applying override");
        let _: EmptyResult = self.execute(command).await?;
        Ok(())
    }

    /// Forces a color theme, or stops forcing one with `None`.
    pub async fn set_forced_colors_mode_theme_override(
        &self,
        theme: Option<ForcedColorsModeTheme>,
        targets: EmulationTargets,
    ) -> Result<()> {
        let params = SetForcedColorsModeThemeOverrideParameters {
            theme: theme.into(),
            targets: targets.validated()?,
        };
        self.apply(EmulationCommand::SetForcedColorsModeThemeOverride(params))
            .await
    }

    /// Overrides or clears geolocation.
    pub async fn set_geolocation_override(
        &self,
        geolocation: GeolocationOverride,
        targets: EmulationTargets,
    ) -> Result<()> {
        let params = SetGeolocationOverrideParameters {
            geolocation,
            targets: targets.validated()?,
        };
        self.apply(EmulationCommand::SetGeolocationOverride(params))
            .await
    }

    /// Overrides the locale, or restores it with `None`.
    pub async fn set_locale_override(
        &self,
        locale: Option<&str>,
        targets: EmulationTargets,
    ) -> Result<()> {
        let params = SetLocaleOverrideParameters {
            locale: locale.map(str::to_owned).into(),
            targets: targets.validated()?,
        };
        self.apply(EmulationCommand::SetLocaleOverride(params))
            .await
    }

    /// Overrides the screen orientation, or restores it with `None`.
    pub async fn set_screen_orientation_override(
        &self,
        screen_orientation: Option<ScreenOrientation>,
        targets: EmulationTargets,
    ) -> Result<()> {
        let params = SetScreenOrientationOverrideParameters {
            screen_orientation,
            targets: targets.validated()?,
        };
        self.apply(EmulationCommand::SetScreenOrientationOverride(params))
            .await
    }

    /// Disables scripting with `Some(false)`; `None` re-enables it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for `Some(true)`, which the
    /// protocol does not accept.
    pub async fn set_scripting_enabled(
        &self,
        enabled: Option<bool>,
        targets: EmulationTargets,
    ) -> Result<()> {
        if enabled == Some(true) {
            return Err(Error::invalid_argument(
                "scripting can only be disabled (false) or reset (None)",
            ));
        }

        let params = SetScriptingEnabledParameters {
            enabled,
            targets: targets.validated()?,
        };
        self.apply(EmulationCommand::SetScriptingEnabled(params))
            .await
    }

    /// Overrides the timezone, or restores it with `None`.
    pub async fn set_timezone_override(
        &self,
        timezone: Option<&str>,
        targets: EmulationTargets,
    ) -> Result<()> {
        let params = SetTimezoneOverrideParameters {
            timezone: timezone.map(str::to_owned).into(),
            targets: targets.validated()?,
        };
        self.apply(EmulationCommand::SetTimezoneOverride(params))
            .await
    }

    /// Overrides the user agent, or restores it with `None`.
    pub async fn set_user_agent_override(
        &self,
        user_agent: Option<&str>,
        targets: EmulationTargets,
    ) -> Result<()> {
        let params = SetUserAgentOverrideParameters {
            user_agent: user_agent.map(str::to_owned).into(),
            targets: targets.validated()?,
        };
        self.apply(EmulationCommand::SetUserAgentOverride(params))
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
