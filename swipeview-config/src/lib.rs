//! Configuration of the swipeview overview engine.
//!
//! The configuration is a KDL document. Every section and every value in it is optional and an
//! empty document gives the same settings as [`Config::default`].

use std::path::Path;

use miette::{Context, IntoDiagnostic};

pub mod animations;
pub mod gestures;
pub mod layout;
pub mod utils;

pub use crate::animations::Animations;
pub use crate::gestures::{Gestures, Watchdog};
pub use crate::layout::Layout;
pub use crate::utils::FloatOrInt;

#[derive(knuffel::Decode, Debug, Default, Clone, PartialEq)]
pub struct Config {
    #[knuffel(child, default)]
    pub animations: Animations,
    #[knuffel(child, default)]
    pub gestures: Gestures,
    #[knuffel(child, default)]
    pub layout: Layout,
    #[knuffel(child, default)]
    pub watchdog: Watchdog,
    #[knuffel(child, default)]
    pub debug: DebugConfig,
}

#[derive(knuffel::Decode, Debug, Default, Clone, PartialEq)]
pub struct DebugConfig {
    /// File receiving fault reports in addition to the log.
    #[knuffel(child, unwrap(argument))]
    pub log_file: Option<String>,
    /// Keep the panels fully visible during the overview.
    #[knuffel(child)]
    pub keep_panels: bool,
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let config = Self::parse(
            path.file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("config.kdl"),
            &contents,
        )
        .context("error parsing")?;
        tracing::debug!("loaded config from {path:?}");
        Ok(config)
    }

    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        let _span = tracing::debug_span!("parse config file").entered();
        knuffel::parse(filename, text)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[track_caller]
    fn do_parse(text: &str) -> Config {
        Config::parse("test.kdl", text)
            .map_err(miette::Report::new)
            .unwrap()
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(do_parse(""), Config::default());
    }

    #[test]
    fn parse() {
        let parsed = do_parse(
            r#"
            animations {
                frame-rate 60
                controlled-tau-ms 20
                released-tau-ms 48.5
            }

            gestures {
                window-switch
                reveal-gain 4000
                switch-latch 150000
                focus-drop-reveal 30000
            }

            layout {
                workspace-margin 64
                window-slot-fraction 0.8
                window-switch-shift -240
                backdrop-dim 0.25
            }

            watchdog {
                off
            }

            debug {
                log-file "/tmp/swipeview.log"
            }
            "#,
        );

        assert_eq!(
            parsed,
            Config {
                animations: Animations {
                    frame_rate: 60,
                    controlled_tau_ms: FloatOrInt(20.),
                    released_tau_ms: FloatOrInt(48.5),
                    ..Animations::default()
                },
                gestures: Gestures {
                    window_switch: true,
                    reveal_gain: FloatOrInt(4000.),
                    switch_latch: FloatOrInt(150000.),
                    focus_drop_reveal: FloatOrInt(30000.),
                    ..Gestures::default()
                },
                layout: Layout {
                    workspace_margin: FloatOrInt(64.),
                    window_slot_fraction: FloatOrInt(0.8),
                    window_switch_shift: FloatOrInt(-240.),
                    backdrop_dim: FloatOrInt(0.25),
                    ..Layout::default()
                },
                watchdog: Watchdog {
                    off: true,
                    ..Watchdog::default()
                },
                debug: DebugConfig {
                    log_file: Some(String::from("/tmp/swipeview.log")),
                    keep_panels: false,
                },
            }
        );
    }

    #[test]
    fn slopes_follow_time_constants() {
        let animations = Animations::default();
        assert_eq!(animations.controlled_slope(), 1. / 32.);
        assert_eq!(animations.released_slope(), 1. / 64.);
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert!(Config::parse("test.kdl", "layout { window-slot-fraction 2.5; }").is_err());
        assert!(Config::parse("test.kdl", "animations { released-tau-ms 0; }").is_err());
        assert!(Config::parse("test.kdl", "layout { rubber-band 0; }").is_err());
    }

    #[test]
    fn unknown_nodes_are_rejected() {
        assert!(Config::parse("test.kdl", "animations { bouncy; }").is_err());
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(Config::load(Path::new("/nonexistent/swipeview.kdl")).is_err());
    }
}
