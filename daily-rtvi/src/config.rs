//! Configuration types for the Daily transport.

use crate::native::NativeLogLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::OnceLock;
use std::time::Duration;

/// Label carried by every RTVI app message.
pub const RTVI_MESSAGE_LABEL: &str = "rtvi-ai";

/// Identity reported to the server so it can recognize a known client
/// library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AboutClient {
    /// Library name.
    pub library: String,
    /// Library version.
    pub version: String,
}

static ABOUT_CLIENT: OnceLock<AboutClient> = OnceLock::new();

impl Default for AboutClient {
    fn default() -> Self {
        Self { library: "daily-core-sdk".to_string(), version: "0.11.0".to_string() }
    }
}

impl AboutClient {
    /// Install the process-wide identity. Only the first call wins; later
    /// calls get their value back.
    pub fn install(about: AboutClient) -> std::result::Result<(), AboutClient> {
        ABOUT_CLIENT.set(about)
    }

    /// The process-wide identity, defaulting on first read.
    pub fn global() -> &'static AboutClient {
        ABOUT_CLIENT.get_or_init(AboutClient::default)
    }
}

/// Audio parameters of the virtual devices shared with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportParams {
    /// Sample rate of audio sent to the bot.
    pub user_audio_sample_rate: u32,
    /// Channel count of audio sent to the bot.
    pub user_audio_channels: u8,
    /// Sample rate of audio received from the bot.
    pub bot_audio_sample_rate: u32,
    /// Channel count of audio received from the bot.
    pub bot_audio_channels: u8,
}

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            user_audio_sample_rate: 16000,
            user_audio_channels: 1,
            bot_audio_sample_rate: 16000,
            bot_audio_channels: 1,
        }
    }
}

/// Configuration for a [`DailyTransport`](crate::DailyTransport).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Virtual device audio parameters.
    pub params: TransportParams,

    /// Only app messages with this label reach the message observer.
    pub message_label: String,

    /// Subscription profiles applied before joining.
    pub subscription_profiles: Value,

    /// Client settings passed to `join`.
    pub client_settings: Value,

    /// Name of the virtual speaker device.
    pub speaker_device: String,

    /// Name of the virtual microphone device.
    pub microphone_device: String,

    /// Upper bound on waiting for a native completion. `None` waits
    /// forever.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "duration_ms")]
    pub completion_timeout: Option<Duration>,

    /// Log level applied to the native engine on initialize.
    pub native_log_level: NativeLogLevel,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            params: TransportParams::default(),
            message_label: RTVI_MESSAGE_LABEL.to_string(),
            subscription_profiles: default_subscription_profiles(),
            client_settings: default_client_settings("mic"),
            speaker_device: "speaker".to_string(),
            microphone_device: "mic".to_string(),
            completion_timeout: None,
            native_log_level: NativeLogLevel::Off,
        }
    }
}

impl TransportConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the virtual device audio parameters.
    pub fn with_params(mut self, params: TransportParams) -> Self {
        self.params = params;
        self
    }

    /// Set the recognized app message label.
    pub fn with_message_label(mut self, label: impl Into<String>) -> Self {
        self.message_label = label.into();
        self
    }

    /// Replace the subscription profiles.
    pub fn with_subscription_profiles(mut self, profiles: Value) -> Self {
        self.subscription_profiles = profiles;
        self
    }

    /// Replace the join client settings.
    pub fn with_client_settings(mut self, settings: Value) -> Self {
        self.client_settings = settings;
        self
    }

    /// Rename the virtual microphone. Client settings are regenerated to
    /// point at it.
    pub fn with_microphone_device(mut self, name: impl Into<String>) -> Self {
        self.microphone_device = name.into();
        self.client_settings = default_client_settings(&self.microphone_device);
        self
    }

    /// Rename the virtual speaker.
    pub fn with_speaker_device(mut self, name: impl Into<String>) -> Self {
        self.speaker_device = name.into();
        self
    }

    /// Bound every wait on a native completion.
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout = Some(timeout);
        self
    }

    /// Set the native engine log level.
    pub fn with_native_log_level(mut self, level: NativeLogLevel) -> Self {
        self.native_log_level = level;
        self
    }
}

fn default_subscription_profiles() -> Value {
    json!({
        "base": {
            "camera": "unsubscribed",
            "microphone": "subscribed"
        }
    })
}

fn default_client_settings(microphone_device: &str) -> Value {
    json!({
        "inputs": {
            "camera": false,
            "microphone": {
                "isEnabled": true,
                "settings": {
                    "deviceId": microphone_device,
                    "customConstraints": {
                        "echoCancellation": { "exact": true }
                    }
                }
            }
        }
    })
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_u64(d.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_16khz_mono() {
        let params = TransportParams::default();
        assert_eq!(params.user_audio_sample_rate, 16000);
        assert_eq!(params.bot_audio_channels, 1);
    }

    #[test]
    fn test_microphone_rename_updates_settings() {
        let config = TransportConfig::new().with_microphone_device("headset");
        assert_eq!(
            config.client_settings["inputs"]["microphone"]["settings"]["deviceId"],
            "headset"
        );
        assert_eq!(config.client_settings["inputs"]["camera"], false);
    }

    #[test]
    fn test_config_serde_roundtrip_keeps_timeout() {
        let config = TransportConfig::new().with_completion_timeout(Duration::from_millis(1500));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["completion_timeout"], 1500);

        let parsed: TransportConfig = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.completion_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(parsed.message_label, RTVI_MESSAGE_LABEL);
    }

    #[test]
    fn test_about_client_default_identity() {
        let about = AboutClient::default();
        assert_eq!(about.library, "daily-core-sdk");
        assert_eq!(about.version, "0.11.0");
    }
}
