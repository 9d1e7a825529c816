use std::env;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use crate::codec::VideoCodec;
use crate::format::ts::psi::Profile;
use crate::{Result, TsError};

/// Upper bound accepted for the video frame rate.
pub const MAX_FPS: u32 = 240;

/// Default interval between PAT/PMT repetitions.
pub const DEFAULT_PSI_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConfig {
    pub codec: VideoCodec,
    pub fps: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            fps: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub sample_size_bits: u16,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            sample_size_bits: 16,
            channels: 2,
        }
    }
}

/// Muxer configuration: which streams are present and how often PSI repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxConfig {
    pub video: Option<VideoConfig>,
    pub audio: Option<AudioConfig>,
    pub psi_interval: Duration,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            video: Some(VideoConfig::default()),
            audio: Some(AudioConfig::default()),
            psi_interval: DEFAULT_PSI_INTERVAL,
        }
    }
}

impl MuxConfig {
    pub fn video_only(codec: VideoCodec, fps: u32) -> Self {
        Self {
            video: Some(VideoConfig { codec, fps }),
            audio: None,
            ..Default::default()
        }
    }

    pub fn audio_only(sample_rate: u32, channels: u16) -> Self {
        Self {
            video: None,
            audio: Some(AudioConfig {
                sample_rate,
                channels,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn with_psi_interval(mut self, interval: Duration) -> Self {
        self.psi_interval = interval;
        self
    }

    /// Positional form: a zero `sample_rate` means no audio, a zero `fps`
    /// means no video.
    pub fn from_params(sample_rate: u32, sample_size_bits: u16, channels: u16, fps: u32) -> Result<Self> {
        let config = Self {
            video: (fps > 0).then_some(VideoConfig {
                codec: VideoCodec::H264,
                fps,
            }),
            audio: (sample_rate > 0).then_some(AudioConfig {
                sample_rate,
                sample_size_bits,
                channels,
            }),
            psi_interval: DEFAULT_PSI_INTERVAL,
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from `TSMUX_*` environment variables, falling
    /// back to the defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`MuxConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut video = config.video.unwrap_or_default();
        let mut audio = config.audio.unwrap_or_default();

        if let Some(codec) = lookup("TSMUX_VIDEO_CODEC") {
            video.codec = codec.trim().parse()?;
        }
        if let Some(fps) = parse_var(&lookup, "TSMUX_FPS")? {
            video.fps = fps;
        }
        if let Some(rate) = parse_var(&lookup, "TSMUX_SAMPLE_RATE")? {
            audio.sample_rate = rate;
        }
        if let Some(channels) = parse_var(&lookup, "TSMUX_CHANNELS")? {
            audio.channels = channels;
        }
        if let Some(bits) = parse_var(&lookup, "TSMUX_SAMPLE_SIZE_BITS")? {
            audio.sample_size_bits = bits;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "TSMUX_PSI_INTERVAL_MS")? {
            config.psi_interval = Duration::from_millis(ms);
        }

        // an explicit zero disables that stream, as in from_params
        config.video = (video.fps > 0).then_some(video);
        config.audio = (audio.sample_rate > 0).then_some(audio);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.video.is_none() && self.audio.is_none() {
            return Err(TsError::InvalidConfig("no video or audio stream configured".into()));
        }
        if let Some(video) = &self.video {
            if video.fps == 0 || video.fps > MAX_FPS {
                return Err(TsError::InvalidConfig(format!(
                    "fps must be in 1..={}, got {}",
                    MAX_FPS, video.fps
                )));
            }
        }
        if let Some(audio) = &self.audio {
            if audio.sample_rate == 0 {
                return Err(TsError::InvalidConfig("sample rate must be positive".into()));
            }
            if audio.channels == 0 {
                return Err(TsError::InvalidConfig("channel count must be positive".into()));
            }
            if audio.sample_size_bits == 0 {
                return Err(TsError::InvalidConfig("sample size must be positive".into()));
            }
        }
        if self.psi_interval.is_zero() {
            return Err(TsError::InvalidConfig("PSI interval must be positive".into()));
        }
        Ok(())
    }

    /// Stream layout implied by the configured streams.
    pub fn profile(&self) -> Result<Profile> {
        match (self.video.is_some(), self.audio.is_some()) {
            (true, true) => Ok(Profile::Mixed),
            (true, false) => Ok(Profile::Video),
            (false, true) => Ok(Profile::Audio),
            (false, false) => Err(TsError::InvalidConfig(
                "no video or audio stream configured".into(),
            )),
        }
    }

    pub fn video_codec(&self) -> VideoCodec {
        self.video.map(|v| v.codec).unwrap_or_default()
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr<Err = ParseIntError>,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    let parsed = value.trim().parse().map_err(|e| {
        log::warn!("{}={:?} is not a valid number", key, value);
        e
    })?;
    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MuxConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MuxConfig::default());
        assert_eq!(config.profile().unwrap(), Profile::Mixed);
        assert_eq!(config.psi_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_env_overrides() {
        let config = MuxConfig::from_lookup(lookup(&[
            ("TSMUX_VIDEO_CODEC", "hevc"),
            ("TSMUX_FPS", "60"),
            ("TSMUX_SAMPLE_RATE", "0"),
            ("TSMUX_PSI_INTERVAL_MS", "500"),
        ]))
        .unwrap();
        assert_eq!(
            config.video,
            Some(VideoConfig {
                codec: VideoCodec::H265,
                fps: 60
            })
        );
        assert_eq!(config.audio, None);
        assert_eq!(config.profile().unwrap(), Profile::Video);
        assert_eq!(config.psi_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_env_errors() {
        assert!(matches!(
            MuxConfig::from_lookup(lookup(&[("TSMUX_FPS", "fast")])),
            Err(TsError::ParseInt(_))
        ));
        assert!(matches!(
            MuxConfig::from_lookup(lookup(&[("TSMUX_CHANNELS", "70000")])),
            Err(TsError::ParseInt(_))
        ));
        assert!(MuxConfig::from_lookup(lookup(&[("TSMUX_VIDEO_CODEC", "mpeg2")])).is_err());
        assert!(MuxConfig::from_lookup(lookup(&[("TSMUX_FPS", "0"), ("TSMUX_SAMPLE_RATE", "0")])).is_err());
    }

    #[test]
    fn test_from_params() {
        let config = MuxConfig::from_params(48_000, 16, 1, 0).unwrap();
        assert_eq!(config.profile().unwrap(), Profile::Audio);
        let config = MuxConfig::from_params(0, 0, 0, 25).unwrap();
        assert_eq!(config.profile().unwrap(), Profile::Video);
        assert!(MuxConfig::from_params(0, 16, 2, 0).is_err());
        assert!(MuxConfig::from_params(44_100, 16, 0, 30).is_err());
        assert!(MuxConfig::from_params(44_100, 0, 2, 30).is_err());
        assert!(MuxConfig::from_params(44_100, 16, 2, 500).is_err());
    }

    #[test]
    fn test_validate() {
        let config = MuxConfig::default().with_psi_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let empty = MuxConfig {
            video: None,
            audio: None,
            ..Default::default()
        };
        assert!(empty.validate().is_err());
        assert!(empty.profile().is_err());

        assert!(MuxConfig::video_only(VideoCodec::H264, 30).validate().is_ok());
        assert!(MuxConfig::audio_only(48_000, 2).validate().is_ok());
    }
}
